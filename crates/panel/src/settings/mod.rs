pub mod config;
pub mod store;

pub use config::PanelSettings;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, PreferenceError, PreferenceResult};
