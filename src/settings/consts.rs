pub const APP_QUALIFIER: &str = "de";
pub const APP_ORGANIZATION: &str = "brandeins";
pub const APP_NAME: &str = "kiosk-cli";

pub const SETTINGS_FILE: &str = "settings.json";
pub const LOG_FILE: &str = "kiosk.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const VERBOSE_LOG_LEVEL: &str = "debug";

pub const DEFAULT_OUTPUT_DIR: &str = ".";

pub const ENV_LOGIN: &str = "BRAND_LOGIN";
pub const ENV_PASSWORD: &str = "BRAND_PWD";
pub const ENV_EMAIL_SERVER: &str = "BRAND_EMAIL_SERVER";
pub const ENV_EMAIL_PORT: &str = "BRAND_EMAIL_PORT";
pub const ENV_EMAIL_SENDER: &str = "BRAND_EMAIL_SENDER";
pub const ENV_EMAILS: &str = "BRAND_EMAILS";
