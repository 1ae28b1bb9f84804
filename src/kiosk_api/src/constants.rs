use std::time::Duration;

pub const BASE_URL: &str = "https://kiosk.brandeins.de";
pub const SIGN_IN_PATH: &str = "/users/sign_in";
pub const ACCOUNT_PATH: &str = "/account/show";

pub const AUTHENTICITY_TOKEN_FIELD: &str = "authenticity_token";
pub const LOGIN_FIELD: &str = "user[login]";
pub const PASSWORD_FIELD: &str = "user[password]";

pub const ATTACHMENT_LIST_CLASS: &str = "attachment-list";
pub const PDF_NAME_PATTERN: &str = r".*pdf";

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/141.0.0.0 Safari/537.36";

pub const DEFAULT_SMTP_PORT: u16 = 25;
/// SMTP over implicit TLS
pub const SMTPS_PORT: u16 = 465;
pub const DEFAULT_MAIL_SUBJECT: &str = "Brand Magazine";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
