use regex::Regex;
use std::io::{self, BufRead};
use std::sync::OnceLock;

/// One connection attempt pulled out of a log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub source_ip: String,
    pub dest_port: String,
}

fn attempt_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"SRC=(?P<src>[0-9]+\.[0-9]+\.[0-9]+\.[0-9]+).*DPT=(?P<dpt>[0-9]+)")
            .expect("attempt pattern is valid")
    })
}

/// Extract the source address and destination port from a single line.
///
/// Returns `None` for anything that does not carry `SRC=` followed later by
/// `DPT=`. The address is not range-checked.
pub fn parse_line(line: &str) -> Option<Attempt> {
    let caps = attempt_pattern().captures(line)?;
    Some(Attempt {
        source_ip: caps["src"].to_string(),
        dest_port: caps["dpt"].to_string(),
    })
}

/// Lazy, single-pass iterator over the attempts in a log stream.
///
/// Lines are read as raw bytes so that stray non-UTF-8 content in kernel
/// logs never aborts a scan. An I/O error is yielded once and ends iteration.
pub struct Attempts<R> {
    reader: R,
    buf: Vec<u8>,
    lines_read: u64,
    lines_matched: u64,
    done: bool,
}

impl<R: BufRead> Attempts<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            lines_read: 0,
            lines_matched: 0,
            done: false,
        }
    }

    pub fn lines_read(&self) -> u64 {
        self.lines_read
    }

    pub fn lines_matched(&self) -> u64 {
        self.lines_matched
    }
}

impl<R: BufRead> Iterator for Attempts<R> {
    type Item = io::Result<Attempt>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.lines_read += 1;
                    let line = String::from_utf8_lossy(&self.buf);
                    let line = line.trim_end_matches(['\n', '\r']);

                    // Skip lines that aren't connection attempts
                    if let Some(attempt) = parse_line(line) {
                        self.lines_matched += 1;
                        return Some(Ok(attempt));
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
