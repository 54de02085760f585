mod config_store;
#[allow(clippy::module_inception)]
mod settings;

pub use config_store::ConfigStore;
pub use settings::{fields, Settings};
