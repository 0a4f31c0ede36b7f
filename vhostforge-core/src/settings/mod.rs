//! Runtime settings for the engine

mod loader;
mod types;

pub use loader::SettingsLoader;
pub use types::Settings;
