use crate::parser::Attempt;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::io;

/// Destination port kept exactly as written in the log.
///
/// Ordered by numeric value; strings with equal value (`22` and `022`) fall
/// back to lexical order so the set keeps both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Port(String);

impl Port {
    pub fn new(port: impl Into<String>) -> Self {
        Self(port.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for Port {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_numeric(&self.0, &other.0).then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for Port {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compare two ASCII digit strings by value without parsing, so arbitrarily
/// long inputs cannot overflow.
fn cmp_numeric(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Order dotted addresses part by part, numerically where both parts are
/// digits.
fn cmp_address(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => {
                let numeric = x.bytes().all(|c| c.is_ascii_digit())
                    && y.bytes().all(|c| c.is_ascii_digit());
                let ord = if numeric { cmp_numeric(x, y) } else { x.cmp(y) };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempts: u64,
    pub ports: BTreeSet<Port>,
}

impl AttemptRecord {
    /// Ports in ascending numeric order, comma-joined.
    pub fn port_list(&self) -> String {
        join_ports(&self.ports)
    }
}

pub fn join_ports<'a>(ports: impl IntoIterator<Item = &'a Port>) -> String {
    ports
        .into_iter()
        .map(Port::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Per-source attempt counts and the distinct ports each source targeted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregator {
    records: HashMap<String, AttemptRecord>,
    total_attempts: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain a parser stream, stopping at the first read error.
    pub fn from_attempts<I>(attempts: I) -> io::Result<Self>
    where
        I: IntoIterator<Item = io::Result<Attempt>>,
    {
        let mut aggregator = Self::new();
        for attempt in attempts {
            aggregator.record(attempt?);
        }
        Ok(aggregator)
    }

    pub fn record(&mut self, attempt: Attempt) {
        let entry = self.records.entry(attempt.source_ip).or_default();
        entry.attempts += 1;
        entry.ports.insert(Port::new(attempt.dest_port));
        self.total_attempts += 1;
    }

    pub fn get(&self, source_ip: &str) -> Option<&AttemptRecord> {
        self.records.get(source_ip)
    }

    pub fn records(&self) -> &HashMap<String, AttemptRecord> {
        &self.records
    }

    pub fn distinct_sources(&self) -> usize {
        self.records.len()
    }

    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    /// The `top_n` busiest sources, most attempts first.
    ///
    /// Equal counts are ordered by ascending address so repeated runs over
    /// the same log produce the same table.
    pub fn top_sources(&self, top_n: usize) -> Vec<(&str, &AttemptRecord)> {
        let mut ranked: Vec<_> = self
            .records
            .iter()
            .map(|(ip, record)| (ip.as_str(), record))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.attempts
                .cmp(&a.1.attempts)
                .then_with(|| cmp_address(a.0, b.0))
        });
        ranked.truncate(top_n);
        ranked
    }
}
