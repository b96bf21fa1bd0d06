//! Utility helpers: dataset loading and summaries

pub mod data_loader;

pub use data_loader::{load_sonar_csv, DatasetSummary};
