use anyhow::{anyhow, Context, Result};
use std::{future::Future, path::Path};
use tracing::info;

use crate::settings::Settings;
use kiosk_api::{
    mail::{Mailer, MailerConfig},
    types::Recipients,
};

/// Mails downloaded issues to the configured recipients.
pub struct DeliveryService {
    mailer: Mailer,
    recipients: Recipients,
}

impl DeliveryService {
    /// Build from the settings, `recipients` given on the command line win over the stored list.
    pub fn from_settings(settings: &Settings, recipients: Option<Recipients>) -> Result<Self> {
        let config = mailer_config(settings)?;
        let recipients = resolve_recipients(settings, recipients)?;
        Ok(Self {
            mailer: Mailer::new(config)?,
            recipients,
        })
    }

    pub fn recipients(&self) -> &Recipients {
        &self.recipients
    }
}

/// Something that hands a downloaded issue over to its readers.
pub trait IssueSender {
    fn deliver(&self, file: &Path) -> impl Future<Output = Result<()>>;
}

impl IssueSender for DeliveryService {
    async fn deliver(&self, file: &Path) -> Result<()> {
        let config = self.mailer.config();
        info!(
            "Sending {} through {}:{} to {} recipient(s)",
            file.display(),
            config.server,
            config.port,
            self.recipients.len()
        );
        let sent = self.mailer.send_issue(file, &self.recipients).await?;
        info!("{} email(s) sent ✅", sent);
        Ok(())
    }
}

fn mailer_config(settings: &Settings) -> Result<MailerConfig> {
    let server = settings.email_server.as_deref().ok_or_else(|| {
        anyhow!("No email server configured, set BRAND_EMAIL_SERVER or run `kiosk config --email-server <HOST>`")
    })?;
    let sender = settings.email_sender.as_deref().ok_or_else(|| {
        anyhow!("No email sender configured, set BRAND_EMAIL_SENDER or run `kiosk config --email-sender <ADDRESS>`")
    })?;

    let config = MailerConfig::new(server, sender)?;
    Ok(match settings.email_port {
        Some(port) => config.with_port(port),
        None => config,
    })
}

fn resolve_recipients(settings: &Settings, recipients: Option<Recipients>) -> Result<Recipients> {
    if let Some(recipients) = recipients {
        return Ok(recipients);
    }
    let stored = settings.emails.as_deref().ok_or_else(|| {
        anyhow!("No recipients given, use `--emails a@example.org,b@example.org` or set BRAND_EMAILS")
    })?;
    Recipients::new(stored).context("Invalid recipient list in settings")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings {
            email_server: Some("mail.example.org".to_string()),
            email_sender: Some("kiosk@example.org".to_string()),
            emails: Some("a@example.org, b@example.org".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_mailer_config_from_settings() {
        let config = mailer_config(&settings()).unwrap();
        assert_eq!(config.server, "mail.example.org");
        assert_eq!(config.port, 25);

        let config = mailer_config(&Settings {
            email_port: Some(587),
            ..settings()
        })
        .unwrap();
        assert_eq!(config.port, 587);
    }

    #[test]
    fn test_mailer_config_requires_server_and_sender() {
        assert!(mailer_config(&Settings {
            email_server: None,
            ..settings()
        })
        .is_err());
        assert!(mailer_config(&Settings {
            email_sender: None,
            ..settings()
        })
        .is_err());
    }

    #[test]
    fn test_command_line_recipients_win() {
        let given: Recipients = "c@example.org".parse().unwrap();
        let recipients = resolve_recipients(&settings(), Some(given.clone())).unwrap();
        assert_eq!(recipients, given);

        let recipients = resolve_recipients(&settings(), None).unwrap();
        assert_eq!(recipients.to_string(), "a@example.org,b@example.org");
    }

    #[test]
    fn test_recipients_required() {
        let settings = Settings {
            emails: None,
            ..settings()
        };
        assert!(resolve_recipients(&settings, None).is_err());
    }

    #[tokio::test]
    async fn test_delivery_service_from_settings() {
        let service = DeliveryService::from_settings(&settings(), None).unwrap();
        assert_eq!(service.recipients().len(), 2);
    }
}
