use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use futures_util::{stream::Stream, StreamExt};
use reqwest::header::CONTENT_DISPOSITION;
use tokio::{
    fs::{self, File},
    io::{AsyncWriteExt, BufWriter},
};
use tracing::{debug, info, warn};

use super::{error::ClientError, issue::Attachment, KioskWebClient};

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadProgress {
    /// The kiosk answered, `total` is the announced size in bytes if any.
    Started { total: Option<u64> },
    /// Bytes written so far.
    Chunk { downloaded: u64, total: Option<u64> },
    /// The issue is already on disk, nothing was fetched.
    Skipped(PathBuf),
    /// The issue was written to the given path.
    Completed(PathBuf),
}

impl DownloadProgress {
    pub fn description(&self) -> String {
        match self {
            DownloadProgress::Started { .. } => "Starting download".to_string(),
            DownloadProgress::Chunk { downloaded, .. } => {
                format!("{} KiB downloaded", downloaded / 1024)
            }
            DownloadProgress::Skipped(path) => format!("{} already exists", path.display()),
            DownloadProgress::Completed(path) => format!("Downloaded {}", path.display()),
        }
    }
}

impl KioskWebClient {
    #[cfg(not(tarpaulin_include))]
    async fn fetch_attachment(&self, attachment: &Attachment) -> Result<reqwest::Response> {
        let res = self
            .client
            .get(attachment.url.clone())
            .headers(self.get_headers())
            .send()
            .await
            .with_context(|| format!("Failed to download {}", attachment.url))?;

        let status = res.status();
        if !status.is_success() {
            bail!(ClientError::UnexpectedStatus {
                url: attachment.url.to_string(),
                status,
            });
        }

        Ok(res)
    }

    /// Download an attachment into `output_dir`, yielding progress updates.
    ///
    /// Nothing is fetched when a file named after the attachment already exists, and the
    /// body is not read when the file named by `Content-Disposition` already exists.
    /// The body is streamed into a hidden `.part` file which is renamed once complete,
    /// after the `Content-Disposition` file name when the kiosk sends one.
    ///
    /// # Returns
    ///
    /// A stream ending with either `Skipped` or `Completed`, or with the first error.
    pub fn download_attachment<'a>(
        &'a self,
        attachment: &'a Attachment,
        output_dir: &'a Path,
    ) -> impl Stream<Item = Result<DownloadProgress>> + 'a {
        async_stream::stream! {
            let target = output_dir.join(&attachment.file_name);
            if is_file(&target).await {
                info!("File already exists {}", target.display());
                yield Ok(DownloadProgress::Skipped(target));
                return;
            }

            if let Err(e) = fs::create_dir_all(output_dir).await {
                yield Err(anyhow::Error::new(e).context(format!(
                    "Failed to create output directory {}",
                    output_dir.display()
                )));
                return;
            }

            let res = match self.fetch_attachment(attachment).await {
                Ok(res) => res,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let total = res.content_length();
            let header_name = res
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok())
                .and_then(parse_content_disposition)
                .map(|name| sanitize_filename(&name));

            // The kiosk may serve the issue under another name than the account page shows.
            if let Some(name) = header_name.as_deref() {
                let served = output_dir.join(name);
                if name != attachment.file_name && is_file(&served).await {
                    info!("File already exists {}", served.display());
                    yield Ok(DownloadProgress::Skipped(served));
                    return;
                }
            }
            yield Ok(DownloadProgress::Started { total });

            let part_path = output_dir.join(format!(".{}.part", attachment.file_name));
            let file = match File::create(&part_path).await {
                Ok(file) => file,
                Err(e) => {
                    yield Err(anyhow::Error::new(e)
                        .context(format!("Failed to create {}", part_path.display())));
                    return;
                }
            };

            let mut writer = BufWriter::new(file);
            let mut body = res.bytes_stream();
            let mut downloaded: u64 = 0;

            while let Some(chunk) = body.next().await {
                let written = match chunk {
                    Ok(chunk) => writer
                        .write_all(&chunk)
                        .await
                        .map(|_| chunk.len() as u64)
                        .with_context(|| format!("Failed to write {}", part_path.display())),
                    Err(e) => Err(anyhow::Error::new(e)
                        .context(format!("Download of {} interrupted", attachment.url))),
                };

                match written {
                    Ok(len) => {
                        downloaded += len;
                        yield Ok(DownloadProgress::Chunk { downloaded, total });
                    }
                    Err(e) => {
                        discard(&part_path).await;
                        yield Err(e);
                        return;
                    }
                }
            }

            if let Err(e) = writer.flush().await {
                discard(&part_path).await;
                yield Err(anyhow::Error::new(e)
                    .context(format!("Failed to flush {}", part_path.display())));
                return;
            }
            drop(writer);

            let file_name = header_name.unwrap_or_else(|| attachment.file_name.clone());
            let final_path = output_dir.join(&file_name);
            if let Err(e) = fs::rename(&part_path, &final_path).await {
                discard(&part_path).await;
                yield Err(anyhow::Error::new(e)
                    .context(format!("Failed to move download to {}", final_path.display())));
                return;
            }

            info!("Downloaded file {} ({} bytes)", final_path.display(), downloaded);
            yield Ok(DownloadProgress::Completed(final_path));
        }
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_file())
        .unwrap_or(false)
}

async fn discard(part_path: &Path) {
    if let Err(e) = fs::remove_file(part_path).await {
        warn!("Could not remove partial download {}: {}", part_path.display(), e);
    }
}

/// Parse the file name out of a `Content-Disposition` header value.
///
/// Handles `filename*=UTF-8''...` (RFC 5987) first, then quoted and unquoted `filename=`.
pub fn parse_content_disposition(header: &str) -> Option<String> {
    if let Some(pos) = header.find("filename*=") {
        let value = header[pos + "filename*=".len()..].trim();
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded = encoded[..end].trim().trim_matches('"');
            match urlencoding::decode(encoded) {
                Ok(decoded) if !decoded.is_empty() => return Some(decoded.into_owned()),
                Ok(_) => {}
                Err(e) => debug!("Could not decode {}: {}", encoded, e),
            }
        }
    }

    let pos = header.find("filename=")?;
    let value = header[pos + "filename=".len()..].trim();
    let name = match value.strip_prefix('"') {
        Some(quoted) => &quoted[..quoted.find('"')?],
        None => value[..value.find(';').unwrap_or(value.len())].trim(),
    };

    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Make a file name safe to join onto the output directory.
///
/// Any directory part is dropped and characters rejected by common filesystems are
/// replaced with `_`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let sanitized: String = base
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match sanitized.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => sanitized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_disposition_quoted() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="brandeins_2024_05.pdf""#),
            Some("brandeins_2024_05.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_unquoted() {
        assert_eq!(
            parse_content_disposition("attachment; filename=issue.pdf; size=1024"),
            Some("issue.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_extended_wins() {
        assert_eq!(
            parse_content_disposition(
                r#"attachment; filename="Ausgabe.pdf"; filename*=UTF-8''brand%20eins%20M%C3%A4rz.pdf"#
            ),
            Some("brand eins März.pdf".to_string())
        );
    }

    #[test]
    fn test_parse_content_disposition_without_name() {
        assert_eq!(parse_content_disposition("inline"), None);
        assert_eq!(parse_content_disposition(r#"attachment; filename="""#), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(r"C:\issues\mai.pdf"), "mai.pdf");
        assert_eq!(sanitize_filename("brand: eins?.pdf"), "brand_ eins_.pdf");
        assert_eq!(sanitize_filename(".."), "_");
        assert_eq!(sanitize_filename(""), "_");
    }

    #[test]
    fn test_progress_description() {
        let progress = DownloadProgress::Chunk {
            downloaded: 4096,
            total: None,
        };
        assert_eq!(progress.description(), "4 KiB downloaded");
    }
}
