use anyhow::{bail, Context, Result};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use super::{download::sanitize_filename, error::ClientError, KioskWebClient};
use crate::constants::{ACCOUNT_PATH, ATTACHMENT_LIST_CLASS, PDF_NAME_PATTERN, SIGN_IN_PATH};

lazy_static::lazy_static! {
    static ref ATTACHMENT_LIST_SELECTOR: Selector =
        Selector::parse(&format!("div.{ATTACHMENT_LIST_CLASS}"))
            .expect("Failed to compile attachment list selector");
    static ref LINK_SELECTOR: Selector =
        Selector::parse("a[href]").expect("Failed to compile link selector");
    static ref PDF_NAME_REGEX: Regex =
        Regex::new(PDF_NAME_PATTERN).expect("Failed to compile pdf name regex");
}

/// A downloadable issue listed on the account page
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    /// File name shown next to the link, used as the local file name
    pub file_name: String,
    /// Absolute download link
    pub url: Url,
}

impl KioskWebClient {
    /// Get the issues attached to the account page.
    ///
    /// # Returns
    ///
    /// Every attachment found, possibly none. Fails with `ClientError::NotLoggedIn`
    /// when the kiosk sends us back to the sign-in page.
    #[cfg(not(tarpaulin_include))]
    pub async fn get_attachments(&self) -> Result<Vec<Attachment>> {
        let url = self.url(ACCOUNT_PATH)?;
        let res = self
            .client
            .get(url.clone())
            .headers(self.get_headers())
            .send()
            .await
            .with_context(|| format!("Failed to load account page {url}"))?;

        if res.url().path() == SIGN_IN_PATH {
            bail!(ClientError::NotLoggedIn);
        }

        let status = res.status();
        if !status.is_success() {
            bail!(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }

        let page_url = res.url().clone();
        let body = res.text().await?;
        let attachments = extract_attachments(&body, &page_url);
        info!("Found {} attachment(s) on the account page", attachments.len());

        Ok(attachments)
    }
}

/// Extract the PDF attachments from the account page.
///
/// Every attachment list whose text mentions a pdf yields one attachment: the file name
/// is the text up to the last `pdf` of the first line mentioning it, the link is the first
/// anchor of the list, resolved against `page_url`.
pub fn extract_attachments(res: &str, page_url: &Url) -> Vec<Attachment> {
    let document = Html::parse_document(res);

    document
        .select(&ATTACHMENT_LIST_SELECTOR)
        .filter_map(|list| extract_attachment(list, page_url))
        .collect()
}

fn extract_attachment(list: ElementRef<'_>, page_url: &Url) -> Option<Attachment> {
    let text = list.text().collect::<String>();
    if !text.contains("pdf") {
        return None;
    }

    let file_name = PDF_NAME_REGEX
        .find(&text)
        .map(|m| m.as_str().trim())
        .filter(|name| !name.is_empty())
        .map(sanitize_filename);
    let Some(file_name) = file_name else {
        warn!("Attachment list mentions a pdf but no file name could be read");
        return None;
    };

    let href = list
        .select(&LINK_SELECTOR)
        .next()
        .and_then(|link| link.value().attr("href"));
    let Some(href) = href else {
        warn!("No download link found for {}", file_name);
        return None;
    };

    match page_url.join(href.trim()) {
        Ok(url) => {
            debug!("PDF found {} {}", file_name, url);
            Some(Attachment { file_name, url })
        }
        Err(e) => {
            warn!("Invalid download link {} for {}: {}", href, file_name, e);
            None
        }
    }
}
