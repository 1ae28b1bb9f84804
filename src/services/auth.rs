use anyhow::Result;
use std::io::{stdout, Write};
use tracing::{info, warn};

use crate::settings::Settings;
use kiosk_api::{
    client::KioskWebClient,
    types::{Login, Password},
};

pub trait CredentialsProvider {
    fn read_password(&self) -> Result<Password>;
}
pub struct StdinCredentialsProvider;
impl CredentialsProvider for StdinCredentialsProvider {
    fn read_password(&self) -> Result<Password> {
        print!("\nEnter your kiosk password (hidden): ");
        let _ = stdout().flush();
        let password = Password::new(&rpassword::read_password()?)?;
        println!();
        Ok(password)
    }
}

pub trait ClientFactory {
    fn new_client(&self, kiosk_url: Option<&str>) -> Result<KioskWebClient>;
}
pub struct DefaultClientFactory;
impl ClientFactory for DefaultClientFactory {
    fn new_client(&self, kiosk_url: Option<&str>) -> Result<KioskWebClient> {
        match kiosk_url {
            Some(url) => KioskWebClient::with_base_url(url),
            None => kiosk_api::get_client(),
        }
    }
}

pub struct AuthService<'a> {
    settings: &'a Settings,
    credentials_provider: Box<dyn CredentialsProvider>,
    client_factory: Box<dyn ClientFactory>,
}

impl<'a> AuthService<'a> {
    pub fn new(
        settings: &'a Settings,
        credentials_provider: Box<dyn CredentialsProvider>,
        client_factory: Box<dyn ClientFactory>,
    ) -> Self {
        Self {
            settings,
            credentials_provider,
            client_factory,
        }
    }

    pub fn with_defaults(settings: &'a Settings) -> Self {
        Self::new(
            settings,
            Box::new(StdinCredentialsProvider),
            Box::new(DefaultClientFactory),
        )
    }

    /// Resolve the login and password to use.
    ///
    /// Returns `None` when no login is configured. A missing password is asked for.
    pub fn credentials(&self) -> Result<Option<(Login, Password)>> {
        let Some(login) = self.settings.login.as_deref() else {
            warn!("No login found in settings or BRAND_LOGIN, please run `kiosk config --login <LOGIN>` to set it");
            return Ok(None);
        };
        let login = Login::new(login)?;

        let password = match self.settings.password.as_deref() {
            Some(password) => Password::new(password)?,
            None => {
                info!("We'll need your password to log you in. It will not be stored.");
                self.credentials_provider.read_password()?
            }
        };

        Ok(Some((login, password)))
    }

    #[cfg(not(tarpaulin_include))]
    pub async fn login(&self) -> Result<Option<KioskWebClient>> {
        let Some((login, password)) = self.credentials()? else {
            return Ok(None);
        };

        info!("We'll try to log you in as {}", login.as_str());

        let mut client = self
            .client_factory
            .new_client(self.settings.kiosk_url.as_deref())?;
        client.login(login.as_ref(), password.as_ref()).await?;
        info!("Login successful ✅");

        Ok(Some(client))
    }
}
