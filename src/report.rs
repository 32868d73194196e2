use crate::config::ProviderSpec;
use crate::error::ReportError;
use crate::geo::GeoResult;
use crate::stats::{join_ports, AttemptRecord, Port};
use clap::ValueEnum;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

/// One enriched line of the final table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub source_ip: String,
    pub geo: Vec<GeoResult>,
    pub attempts: u64,
    pub ports: Vec<Port>,
}

impl ReportRow {
    pub fn new(source_ip: &str, record: &AttemptRecord, geo: Vec<GeoResult>) -> Self {
        Self {
            source_ip: source_ip.to_string(),
            geo,
            attempts: record.attempts,
            ports: record.ports.iter().cloned().collect(),
        }
    }

    pub fn port_list(&self) -> String {
        join_ports(&self.ports)
    }
}

pub fn header(providers: &[ProviderSpec]) -> Vec<String> {
    let mut header = vec!["Source IP".to_string()];
    for provider in providers {
        header.push(format!("{}_Country", provider.label));
        header.push(format!("{}_City", provider.label));
    }
    header.push("Attempts".to_string());
    header.push("Ports".to_string());
    header
}

#[derive(Serialize)]
struct JsonGeo<'a> {
    provider: &'a str,
    country: Option<&'a str>,
    city: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonRow<'a> {
    source_ip: &'a str,
    attempts: u64,
    ports: &'a [Port],
    geo: Vec<JsonGeo<'a>>,
}

/// Writes rows as they arrive. CSV rows are flushed one by one; JSON is
/// buffered until [`finish`](ReportWriter::finish) because it is a single
/// array.
pub enum ReportWriter<W: Write> {
    Csv(csv::Writer<W>),
    Json {
        out: W,
        labels: Vec<String>,
        rows: Vec<ReportRow>,
    },
}

impl<W: Write> ReportWriter<W> {
    pub fn new(
        format: OutputFormat,
        out: W,
        providers: &[ProviderSpec],
    ) -> Result<Self, ReportError> {
        match format {
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(out);
                writer.write_record(header(providers))?;
                writer.flush()?;
                Ok(Self::Csv(writer))
            }
            OutputFormat::Json => Ok(Self::Json {
                out,
                labels: providers.iter().map(|p| p.label.clone()).collect(),
                rows: Vec::new(),
            }),
        }
    }

    pub fn write_row(&mut self, row: ReportRow) -> Result<(), ReportError> {
        match self {
            Self::Csv(writer) => {
                let mut record = Vec::with_capacity(row.geo.len() * 2 + 3);
                record.push(row.source_ip.clone());
                for geo in &row.geo {
                    record.push(geo.country.clone().unwrap_or_default());
                    record.push(geo.city.clone().unwrap_or_default());
                }
                record.push(row.attempts.to_string());
                record.push(row.port_list());
                writer.write_record(&record)?;
                writer.flush()?;
            }
            Self::Json { rows, .. } => rows.push(row),
        }
        Ok(())
    }

    pub fn finish(self) -> Result<(), ReportError> {
        match self {
            Self::Csv(mut writer) => writer.flush()?,
            Self::Json {
                mut out,
                labels,
                rows,
            } => {
                let json: Vec<JsonRow> = rows
                    .iter()
                    .map(|row| JsonRow {
                        source_ip: &row.source_ip,
                        attempts: row.attempts,
                        ports: &row.ports,
                        geo: labels
                            .iter()
                            .zip(&row.geo)
                            .map(|(label, geo)| JsonGeo {
                                provider: label,
                                country: geo.country.as_deref(),
                                city: geo.city.as_deref(),
                            })
                            .collect(),
                    })
                    .collect();
                serde_json::to_writer_pretty(&mut out, &json)?;
                writeln!(out)?;
                out.flush()?;
            }
        }
        Ok(())
    }
}
