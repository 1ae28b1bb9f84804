pub mod download;
pub mod error;
pub mod issue;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, LOCATION, USER_AGENT},
    redirect::Policy,
    StatusCode, Url,
};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};
use scraper::{Html, Selector};
use tracing::{debug, error, info};

use error::ClientError;

use crate::constants::{
    AUTHENTICITY_TOKEN_FIELD, BASE_URL, LOGIN_FIELD, PASSWORD_FIELD, REQUEST_TIMEOUT,
    SIGN_IN_PATH, USER_AGENT as USER_AGENT_VALUE,
};

lazy_static::lazy_static! {
    static ref TOKEN_INPUT_SELECTOR: Selector =
        Selector::parse(&format!(r#"input[name="{AUTHENTICITY_TOKEN_FIELD}"]"#))
            .expect("Failed to compile authenticity token selector");
}

pub struct KioskWebClient {
    /// Client used for page and file fetches, follows redirects.
    client: reqwest::Client,
    /// Client used to submit the login form. Redirects are disabled because the kiosk
    /// acknowledges a valid login with a `302 Found` that we need to inspect.
    form_client: reqwest::Client,
    /// Cookie store shared by both clients so the session set during sign-in is replayed.
    cookie_store: Arc<CookieStoreMutex>,
    /// Root of the kiosk website.
    base_url: Url,
    logged_in: bool,
}

impl KioskWebClient {
    pub fn new() -> Result<KioskWebClient> {
        Self::with_base_url(BASE_URL)
    }

    /// Build a client talking to another kiosk root, e.g. a local mock server.
    pub fn with_base_url(base_url: &str) -> Result<KioskWebClient> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid kiosk url: {base_url}"))?;

        let cookie_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookie_store))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        let form_client = reqwest::Client::builder()
            .redirect(Policy::none())
            .cookie_provider(Arc::clone(&cookie_store))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP form client")?;

        Ok(KioskWebClient {
            client,
            form_client,
            cookie_store,
            base_url,
            logged_in: false,
        })
    }

    /// Get the headers sent along every request made to the kiosk.
    fn get_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("de-DE,de;q=0.9"));
        headers
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid kiosk path: {path}"))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Number of cookies currently held for the kiosk session.
    pub fn session_cookie_count(&self) -> usize {
        match self.cookie_store.lock() {
            Ok(store) => store.iter_unexpired().count(),
            Err(_) => 0,
        }
    }

    /// Fetch the sign-in page and read the authenticity token of its login form.
    ///
    /// The token is bound to the session cookie set by the same response, so it must be
    /// submitted by this client.
    #[cfg(not(tarpaulin_include))]
    pub async fn load_login_form(&self) -> Result<String> {
        let url = self.url(SIGN_IN_PATH)?;
        let res = self
            .client
            .get(url.clone())
            .headers(self.get_headers())
            .send()
            .await
            .with_context(|| format!("Failed to load login form from {url}"))?;

        let status = res.status();
        if !status.is_success() {
            bail!(ClientError::UnexpectedStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = res.text().await?;
        let token = extract_authenticity_token(&body)?;
        debug!("Found authenticity token on {}", url);

        Ok(token)
    }

    /// Login to the kiosk.
    ///
    /// # Arguments
    ///
    /// * `login` - The account login, usually an email address.
    /// * `password` - The password in plaintext.
    ///
    /// # Returns
    ///
    /// Nothing if the login was successful, an error otherwise.
    #[cfg(not(tarpaulin_include))]
    pub async fn login(&mut self, login: &str, password: &str) -> Result<()> {
        let token = self.load_login_form().await?;

        let params = [
            (AUTHENTICITY_TOKEN_FIELD, token.as_str()),
            (LOGIN_FIELD, login),
            (PASSWORD_FIELD, password),
        ];

        let res = self
            .form_client
            .post(self.url(SIGN_IN_PATH)?)
            .form(&params)
            .headers(self.get_headers())
            .send()
            .await
            .context("Failed to submit login form")?;

        let status = res.status();
        if status != StatusCode::FOUND {
            let text = res.text().await.unwrap_or_default();
            debug!("{}", text);
            error!("Login form rejected with status {}", status);
            bail!(ClientError::InvalidCredentials(status));
        }

        let location = res
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if location.contains(SIGN_IN_PATH) {
            debug!("Login redirected back to {}", location);
            bail!(ClientError::InvalidCredentials(status));
        }

        self.logged_in = true;
        debug!("{} session cookie(s) stored", self.session_cookie_count());
        info!("🔓 You are now logged in as {}", login);

        Ok(())
    }
}

/// Extract the value of the `authenticity_token` hidden input, usually from the sign-in page.
///
/// When the page carries several login forms, the last token wins.
fn extract_authenticity_token(res: &str) -> Result<String> {
    let document = Html::parse_document(res);
    let token = document
        .select(&TOKEN_INPUT_SELECTOR)
        .filter_map(|input| input.value().attr("value"))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .last()
        .map(str::to_string);

    match token {
        Some(token) => Ok(token),
        None => {
            debug!("{}", res);
            bail!(ClientError::TokenNotFound)
        }
    }
}
