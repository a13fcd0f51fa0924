//! Price sources and ticker registries feeding the engine.

pub mod csv_source;
pub mod provider;
pub mod synthetic;

pub use csv_source::CsvPriceSource;
pub use provider::{PriceSource, SourceError, StaticPriceSource, TickerRegistry};
pub use synthetic::SyntheticPriceSource;
