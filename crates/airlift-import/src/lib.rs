pub mod import;

pub use import::{import_module, BundleImporter, FunctionImporter, ImportOptions};
