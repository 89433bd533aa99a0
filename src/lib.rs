pub mod cache;
pub mod config;
pub mod derive;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod output;
pub mod record;
pub mod views;

pub use derive::{Derivation, derive};
pub use error::{Result, SeriesError};
pub use record::{DerivedRecord, Granularity, RawRecord};
