use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("No authenticity token found on the sign-in page")]
    TokenNotFound,
    #[error("Invalid credentials, the kiosk answered the login form with status {0}")]
    InvalidCredentials(StatusCode),
    #[error("Not logged in, the kiosk redirected to the sign-in page")]
    NotLoggedIn,
    #[error("Unexpected status {status} for {url}")]
    UnexpectedStatus { url: String, status: StatusCode },
}
