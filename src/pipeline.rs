use crate::error::ReportError;
use crate::geo::GeoResolver;
use crate::parser::Attempts;
use crate::report::{OutputFormat, ReportRow, ReportWriter};
use crate::stats::Aggregator;
use futures::stream::{self, StreamExt};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_TOP: usize = 20;
pub const DEFAULT_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub top_n: usize,
    /// Source addresses resolved at once; clamped to at least 1.
    pub concurrency: usize,
    pub format: OutputFormat,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP,
            concurrency: DEFAULT_CONCURRENCY,
            format: OutputFormat::Csv,
        }
    }
}

/// Read a log file end to end and aggregate its attempts.
pub fn scan_log_file(path: &Path) -> Result<Aggregator, ReportError> {
    let file = File::open(path).map_err(|source| ReportError::OpenLog {
        path: path.to_path_buf(),
        source,
    })?;

    scan(BufReader::new(file)).map_err(|source| ReportError::ReadLog {
        path: path.to_path_buf(),
        source,
    })
}

pub fn scan<R: BufRead>(reader: R) -> std::io::Result<Aggregator> {
    let mut attempts = Attempts::new(reader);
    let aggregator = Aggregator::from_attempts(attempts.by_ref())?;

    info!(
        lines = attempts.lines_read(),
        matched = attempts.lines_matched(),
        sources = aggregator.distinct_sources(),
        "log scanned"
    );
    Ok(aggregator)
}

/// Geolocate the busiest sources and write the report to `out`.
///
/// Lookups for up to `concurrency` addresses overlap, but rows are written in
/// ranking order. Returns the number of rows written.
pub async fn write_report<W: Write>(
    aggregator: &Aggregator,
    resolver: &GeoResolver,
    options: &RunOptions,
    out: W,
) -> Result<usize, ReportError> {
    let top = aggregator.top_sources(options.top_n);
    debug!(selected = top.len(), "resolving top sources");

    let mut writer = ReportWriter::new(options.format, out, resolver.providers())?;
    let mut rows = stream::iter(top)
        .map(|(source_ip, record)| async move {
            let geo = resolver.resolve(source_ip).await;
            ReportRow::new(source_ip, record, geo)
        })
        .buffered(options.concurrency.max(1));

    let mut written = 0;
    while let Some(row) = rows.next().await {
        writer.write_row(row)?;
        written += 1;
    }
    writer.finish()?;

    info!(rows = written, "report written");
    Ok(written)
}
