//! Data module - CSV loading, typed records and metric derivation

mod loader;
mod processor;
mod record;

pub use loader::{parse_date, DataLoader, DataSource, LoaderError, LoaderOptions};
pub use processor::{
    DerivedRecord, DerivedTable, MetricDeriver, ProcessorError, YearMonth, DEFAULT_CAMPAIGN_COST,
};
pub use record::{EventRecord, Table, REQUIRED_COLUMNS};
