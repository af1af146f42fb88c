/// Local upload storage
pub mod files;
/// In-process session and settings stores
pub mod memory;
/// JSON file settings store
pub mod settings_file;
/// Flat message catalogs
pub mod translations;

pub use files::LocalFileResolver;
pub use memory::{MemorySession, MemorySettingsStore};
pub use settings_file::JsonFileSettingsStore;
pub use translations::CatalogTranslator;
