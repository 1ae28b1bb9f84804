//! Delivery of downloaded issues by email.
//!
//! One message per recipient is sent through a plain SMTP relay: no authentication,
//! STARTTLS when the server offers it, certificates accepted as is.

use std::{fmt, path::Path};

use anyhow::{anyhow, Context, Result};
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::client::{Tls, TlsParameters},
    Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tokio::fs;
use tracing::{debug, info};

use crate::{
    constants::{
        DEFAULT_MAIL_SUBJECT, DEFAULT_SMTP_PORT, PDF_CONTENT_TYPE, REQUEST_TIMEOUT, SMTPS_PORT,
    },
    types::Recipients,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MailerConfig {
    /// SMTP relay host name
    pub server: String,
    pub port: u16,
    pub sender: Mailbox,
    pub subject: String,
    /// Accept self-signed or mismatching certificates when upgrading to TLS
    pub accept_invalid_certs: bool,
}

impl MailerConfig {
    pub fn new(server: &str, sender: &str) -> Result<Self> {
        let server = server.trim();
        if server.is_empty() {
            return Err(anyhow!("No email server configured"));
        }
        let sender = sender
            .trim()
            .parse::<Mailbox>()
            .with_context(|| format!("Invalid sender address: {sender}"))?;

        Ok(Self {
            server: server.to_string(),
            port: DEFAULT_SMTP_PORT,
            sender,
            subject: DEFAULT_MAIL_SUBJECT.to_string(),
            accept_invalid_certs: true,
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_subject(mut self, subject: &str) -> Self {
        self.subject = subject.to_string();
        self
    }
}

/// Build the message carrying an issue to a single recipient.
///
/// # Arguments
///
/// * `config` - Sender and subject of the message.
/// * `recipient` - The only `To` address.
/// * `file` - Path of the issue, its file name is used in the body and for the attachment.
/// * `content` - The issue bytes.
pub fn build_issue_message(
    config: &MailerConfig,
    recipient: &Address,
    file: &Path,
    content: Vec<u8>,
) -> Result<Message> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("Not a file: {}", file.display()))?;

    let content_type = ContentType::parse(PDF_CONTENT_TYPE)
        .map_err(|e| anyhow!("Invalid attachment content type: {e}"))?;
    let body = format!("Hier das brand eins Magazin {file_name}");

    Message::builder()
        .from(config.sender.clone())
        .to(Mailbox::new(None, recipient.clone()))
        .subject(config.subject.clone())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::html(body))
                .singlepart(Attachment::new(file_name).body(content, content_type)),
        )
        .context("Failed to build email")
}

/// Sends issues through `T`, an SMTP relay unless a test swaps it out.
pub struct Mailer<T = AsyncSmtpTransport<Tokio1Executor>> {
    config: MailerConfig,
    transport: T,
}

impl Mailer {
    pub fn new(config: MailerConfig) -> Result<Self> {
        let tls = TlsParameters::builder(config.server.clone())
            .dangerous_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to set up TLS parameters")?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
            .port(config.port)
            .tls(tls_mode(config.port, tls))
            .timeout(Some(REQUEST_TIMEOUT))
            .build();

        Ok(Self { config, transport })
    }
}

impl<T> Mailer<T>
where
    T: AsyncTransport + Sync,
    T::Ok: fmt::Debug,
    T::Error: std::error::Error + Send + Sync + 'static,
{
    pub fn with_transport(config: MailerConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Send the issue at `file` to every recipient, one message each.
    ///
    /// Stops at the first failed delivery.
    ///
    /// # Returns
    ///
    /// The number of messages sent.
    pub async fn send_issue(&self, file: &Path, recipients: &Recipients) -> Result<usize> {
        let content = fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;

        let mut sent = 0;
        for recipient in recipients.iter() {
            info!("Sending email to {}", recipient);
            let message = build_issue_message(&self.config, recipient, file, content.clone())?;
            let response = self
                .transport
                .send(message)
                .await
                .with_context(|| format!("Failed to send email to {recipient}"))?;
            debug!("SMTP server answered {:?}", response);
            sent += 1;
        }

        Ok(sent)
    }
}

/// Port 465 speaks TLS from the first byte, anything else upgrades with STARTTLS if offered.
fn tls_mode(port: u16, tls: TlsParameters) -> Tls {
    if port == SMTPS_PORT {
        Tls::Wrapper(tls)
    } else {
        Tls::Opportunistic(tls)
    }
}
