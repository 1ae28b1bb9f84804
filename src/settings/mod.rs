mod consts;
mod logging;
mod store;

pub use consts::DEFAULT_OUTPUT_DIR;
pub use logging::init_logger;
pub use store::{FileSettingsStore, JsonFileSettingsStore, Settings, SettingsStore};
