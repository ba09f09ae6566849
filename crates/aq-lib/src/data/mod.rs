//! Dataset loading and tabular containers

mod loader;
pub mod synthetic;
mod table;

pub use loader::{load_readings, DataLoader, LoadReport, LoadedData, LoaderConfig};
pub use synthetic::{generate_readings, write_uci_csv, SyntheticConfig};
pub use table::{FeatureTable, ReadingTable, Table};
