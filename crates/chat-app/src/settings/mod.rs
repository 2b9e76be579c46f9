pub mod state;

pub use state::{LiveSettings, SettingsError, SettingsStore};
