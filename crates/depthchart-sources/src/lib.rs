// External roster sources: the Sleeper league API and CSV depth chart files.

pub mod csv_import;
pub mod sleeper;

pub use csv_import::{CsvImportError, CsvSource};
pub use sleeper::{SleeperOptions, SleeperSource};
