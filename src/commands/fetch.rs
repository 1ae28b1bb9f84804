use anyhow::Result;
use futures_util::{pin_mut, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::{
    cli::FetchArgs,
    services::{AuthService, DeliveryService, IssueSender},
    settings::DEFAULT_OUTPUT_DIR,
    ux::progress::TextProgressBar,
    AppCtx,
};

use kiosk_api::client::{download::DownloadProgress, issue::Attachment, KioskWebClient};

/// What a fetch run left behind.
#[derive(Debug, Default, PartialEq)]
pub struct FetchReport {
    /// Issues written during this run
    pub downloaded: Vec<PathBuf>,
    /// Issues that were already on disk
    pub skipped: Vec<PathBuf>,
    pub mailed: Vec<PathBuf>,
}

#[cfg(not(tarpaulin_include))]
pub async fn handle(args: FetchArgs, ctx: &AppCtx) -> Result<()> {
    let settings = ctx.settings()?;

    // Check the mail setup before logging in, so a typo does not cost a download.
    let delivery = if args.send_email {
        Some(DeliveryService::from_settings(&settings, args.emails)?)
    } else {
        None
    };

    let auth_service = AuthService::with_defaults(&settings);
    let Some(client) = auth_service.login().await? else {
        return Ok(());
    };

    let output_dir = args
        .output_dir
        .or_else(|| settings.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    let report = fetch_issues(&client, &output_dir, delivery.as_ref()).await?;
    if delivery.is_none() && !report.downloaded.is_empty() {
        info!("Use `--sendemail` to mail the issue to your recipients");
    }

    Ok(())
}

/// Download every issue listed on the account page, then hand the new ones to `sender`.
///
/// Issues already on disk are never sent again.
pub async fn fetch_issues<S: IssueSender>(
    client: &KioskWebClient,
    output_dir: &Path,
    sender: Option<&S>,
) -> Result<FetchReport> {
    let mut report = FetchReport::default();

    let attachments = client.get_attachments().await?;
    if attachments.is_empty() {
        warn!("No issue found on the account page");
        return Ok(report);
    }

    for attachment in &attachments {
        info!("PDF found {} {}", attachment.file_name, attachment.url);
        match download(client, attachment, output_dir).await? {
            Some(DownloadProgress::Completed(path)) => report.downloaded.push(path),
            Some(DownloadProgress::Skipped(path)) => report.skipped.push(path),
            _ => {}
        }
    }

    if let Some(sender) = sender {
        if report.downloaded.is_empty() {
            info!("Nothing new to send");
        }
        for path in &report.downloaded {
            sender.deliver(path).await?;
            report.mailed.push(path.clone());
        }
    }

    Ok(report)
}

/// Run one download to its end, drawing its progress.
///
/// Returns the last event, `Completed` or `Skipped`.
async fn download(
    client: &KioskWebClient,
    attachment: &Attachment,
    output_dir: &Path,
) -> Result<Option<DownloadProgress>> {
    let bar = TextProgressBar::new(30);
    let stream = client.download_attachment(attachment, output_dir);
    pin_mut!(stream);

    let mut last = None;
    while let Some(progress) = stream.next().await {
        let progress = progress?;
        match &progress {
            DownloadProgress::Started { .. } => {}
            DownloadProgress::Chunk { downloaded, total } => {
                bar.render(*downloaded, *total, &progress.description());
            }
            DownloadProgress::Skipped(path) => {
                info!("file already exists {}", path.display());
            }
            DownloadProgress::Completed(path) => {
                bar.finish();
                info!("downloaded file {} ✅", path.display());
            }
        }
        last = Some(progress);
    }

    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::cell::RefCell;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct FakeSender {
        sent: RefCell<Vec<PathBuf>>,
        fail: bool,
    }
    impl IssueSender for FakeSender {
        async fn deliver(&self, file: &Path) -> Result<()> {
            if self.fail {
                bail!("relay refused {}", file.display());
            }
            self.sent.borrow_mut().push(file.to_path_buf());
            Ok(())
        }
    }

    const TWO_ISSUES: &str = r#"<html><body>
        <div class="attachment-list">
            <a href="/downloads/1/file">Download</a>
            <span>brandeins_2024_04.pdf</span>
        </div>
        <div class="attachment-list">
            <a href="/downloads/2/file">Download</a>
            <span>brandeins_2024_05.pdf</span>
        </div>
    </body></html>"#;

    async fn kiosk(account_page: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/account/show"))
            .respond_with(ResponseTemplate::new(200).set_body_string(account_page))
            .mount(&server)
            .await;
        for id in ["1", "2"] {
            Mock::given(method("GET"))
                .and(path(format!("/downloads/{id}/file")))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF".to_vec()))
                .mount(&server)
                .await;
        }
        server
    }

    #[tokio::test]
    async fn test_only_new_issues_are_mailed() {
        let server = kiosk(TWO_ISSUES).await;
        let dir = TempDir::new().unwrap();
        let old_issue = dir.path().join("brandeins_2024_04.pdf");
        std::fs::write(&old_issue, b"read already").unwrap();

        let client = KioskWebClient::with_base_url(&server.uri()).unwrap();
        let sender = FakeSender::default();
        let report = fetch_issues(&client, dir.path(), Some(&sender))
            .await
            .unwrap();

        let new_issue = dir.path().join("brandeins_2024_05.pdf");
        assert_eq!(report.skipped, vec![old_issue]);
        assert_eq!(report.downloaded, vec![new_issue.clone()]);
        assert_eq!(report.mailed, vec![new_issue.clone()]);
        assert_eq!(*sender.sent.borrow(), vec![new_issue]);
    }

    #[tokio::test]
    async fn test_nothing_mailed_without_sender() {
        let server = kiosk(TWO_ISSUES).await;
        let dir = TempDir::new().unwrap();

        let client = KioskWebClient::with_base_url(&server.uri()).unwrap();
        let report = fetch_issues::<FakeSender>(&client, dir.path(), None)
            .await
            .unwrap();

        assert_eq!(report.downloaded.len(), 2);
        assert!(report.mailed.is_empty());
    }

    #[tokio::test]
    async fn test_skipped_issues_are_not_mailed() {
        let server = kiosk(TWO_ISSUES).await;
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("brandeins_2024_04.pdf"), b"").unwrap();
        std::fs::write(dir.path().join("brandeins_2024_05.pdf"), b"").unwrap();

        let client = KioskWebClient::with_base_url(&server.uri()).unwrap();
        let sender = FakeSender::default();
        let report = fetch_issues(&client, dir.path(), Some(&sender))
            .await
            .unwrap();

        assert_eq!(report.skipped.len(), 2);
        assert!(report.downloaded.is_empty());
        assert!(sender.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_no_issue_on_account_page() {
        let server = kiosk("<html><body><p>Kein Abo</p></body></html>").await;
        let dir = TempDir::new().unwrap();
        let output_dir = dir.path().join("issues");

        let client = KioskWebClient::with_base_url(&server.uri()).unwrap();
        let sender = FakeSender::default();
        let report = fetch_issues(&client, &output_dir, Some(&sender))
            .await
            .unwrap();

        assert_eq!(report, FetchReport::default());
        assert!(sender.sent.borrow().is_empty());
        assert!(!output_dir.exists());
    }

    #[tokio::test]
    async fn test_failed_delivery_is_reported() {
        let server = kiosk(TWO_ISSUES).await;
        let dir = TempDir::new().unwrap();

        let client = KioskWebClient::with_base_url(&server.uri()).unwrap();
        let sender = FakeSender {
            fail: true,
            ..Default::default()
        };
        let err = fetch_issues(&client, dir.path(), Some(&sender))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("relay refused"));
        assert!(dir.path().join("brandeins_2024_04.pdf").exists());
    }
}
