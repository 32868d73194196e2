//! Firewall log attempt report with multi-provider geolocation.
//!
//! [`pipeline::scan_log_file`] aggregates `SRC=`/`DPT=` attempts per source
//! address; [`pipeline::write_report`] geolocates the busiest sources through
//! every configured provider and writes a CSV or JSON table.

pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{ProviderSpec, ResolverConfig, ResponseShape};
pub use error::{ConfigError, ProviderError, ReportError};
pub use geo::{GeoResolver, GeoResult, ProviderOutcome};
pub use pipeline::{scan_log_file, write_report, RunOptions};
pub use report::OutputFormat;
pub use stats::Aggregator;
