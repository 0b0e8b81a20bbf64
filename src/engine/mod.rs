use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::parser::{parse_command, Command};
use crate::storage::{EntryStore, Filter};

/// Response to an add command.
pub const NO_OUTPUT: &str = "No output";

/// Counters collected while interpreting a batch of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub lines_read: usize,
    pub lines_written: usize,
    pub entries_added: usize,
    pub malformed_adds: usize,
    pub queries: usize,
    pub unrecognized_lines: usize,
}

/// Executes commands against an [`EntryStore`] it owns.
///
/// Each recognized command yields exactly one output line; unrecognized
/// lines yield none.
pub struct Interpreter {
    store: EntryStore,
    stats: RunStats,
}

impl Interpreter {
    pub fn new(store: EntryStore) -> Self {
        Self {
            store,
            stats: RunStats::default(),
        }
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn execute(&mut self, command: &Command) -> Result<String> {
        let line = match command {
            Command::Add(entry) => {
                self.store.append(entry)?;
                self.stats.entries_added += 1;
                NO_OUTPUT.to_string()
            }
            Command::MalformedAdd(payload) => {
                warn!(payload = ?payload, "skipping add without timestamp, type and severity");
                self.stats.malformed_adds += 1;
                NO_OUTPUT.to_string()
            }
            Command::MeanByType(log_type) => {
                let mean = match log_type {
                    Some(log_type) => self.store.mean_severity(&Filter::Type(log_type))?,
                    None => 0.0,
                };
                self.stats.queries += 1;
                format_mean_line(mean)
            }
            Command::MeanInRange { direction, pivot } => {
                let filter = Filter::Range {
                    direction: *direction,
                    pivot: *pivot,
                };
                let mean = self.store.mean_severity(&filter)?;
                self.stats.queries += 1;
                format_mean_line(mean)
            }
            Command::MeanInRangeByType {
                direction,
                log_type,
                pivot,
            } => {
                let mean = match log_type {
                    Some(log_type) => self.store.mean_severity(&Filter::RangeAndType {
                        direction: *direction,
                        pivot: *pivot,
                        log_type,
                    })?,
                    None => 0.0,
                };
                self.stats.queries += 1;
                format_mean_line(mean)
            }
        };

        debug!(?command, output = %line, "executed command");
        Ok(line)
    }

    pub fn process_line(&mut self, line: &str) -> Result<Option<String>> {
        self.stats.lines_read += 1;

        let Some(command) = parse_command(line) else {
            debug!(line, "ignoring unrecognized line");
            self.stats.unrecognized_lines += 1;
            return Ok(None);
        };

        let output = self.execute(&command)?;
        self.stats.lines_written += 1;
        Ok(Some(output))
    }

    /// Run every line in order and collect the output lines.
    pub fn process<I, S>(&mut self, lines: I) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut output = Vec::new();
        for line in lines {
            if let Some(out) = self.process_line(line.as_ref())? {
                output.push(out);
            }
        }
        Ok(output)
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(EntryStore::default())
    }
}

/// Magnitude from which fixed-point output gives way to exponent form.
const EXPONENT_THRESHOLD: f64 = 1e21;

/// Six fixed decimals. Negative zero prints as zero; infinities print as
/// `Infinity` / `-Infinity`. Magnitudes of `1e21` and above print in
/// shortest exponent form with an explicit sign (`2.5e+21`).
pub fn format_mean(mean: f64) -> String {
    if mean.is_infinite() {
        let text = if mean > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }
    if mean.abs() >= EXPONENT_THRESHOLD {
        return format!("{:e}", mean).replacen('e', "e+", 1);
    }
    // -0.0 + 0.0 == +0.0
    format!("{:.6}", mean + 0.0)
}

fn format_mean_line(mean: f64) -> String {
    format!("Mean: {}", format_mean(mean))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Direction, LogEntry, Timestamp};

    #[test]
    fn test_format_mean() {
        assert_eq!(format_mean(0.0), "0.000000");
        assert_eq!(format_mean(-0.0), "0.000000");
        assert_eq!(format_mean(6.0), "6.000000");
        assert_eq!(format_mean(1.0 / 3.0), "0.333333");
        assert_eq!(format_mean(2.0 / 3.0), "0.666667");
        assert_eq!(format_mean(-1.25), "-1.250000");
        assert_eq!(format_mean(f64::NAN), "NaN");
        assert_eq!(format_mean(f64::INFINITY), "Infinity");
        assert_eq!(format_mean(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_format_mean_exponent_form() {
        assert_eq!(format_mean(1e21), "1e+21");
        assert_eq!(format_mean(-2.5e21), "-2.5e+21");
        assert_eq!(format_mean(1.2345e300), "1.2345e+300");
        assert_eq!(format_mean(1e20), "100000000000000000000.000000");
    }

    #[test]
    fn test_execute_add_and_query() {
        let mut interpreter = Interpreter::default();

        let add = Command::Add(LogEntry::new(5, "db", 3.0));
        assert_eq!(interpreter.execute(&add).unwrap(), "No output");
        assert_eq!(interpreter.store().len(), 1);

        let query = Command::MeanInRangeByType {
            direction: Direction::After,
            log_type: Some("db".to_string()),
            pivot: Timestamp::At(4.0),
        };
        assert_eq!(interpreter.execute(&query).unwrap(), "Mean: 3.000000");
    }

    #[test]
    fn test_malformed_add_stores_nothing() {
        let mut interpreter = Interpreter::default();

        let output = interpreter.process(["1 100;error", "1", "2 error"]).unwrap();
        assert_eq!(output, vec!["No output", "No output", "Mean: 0.000000"]);
        assert!(interpreter.store().is_empty());
        assert_eq!(interpreter.stats().malformed_adds, 2);
    }

    #[test]
    fn test_missing_type_matches_nothing() {
        let mut interpreter = Interpreter::default();

        let output = interpreter
            .process(["1 1;;4.0", "2", "4 BEFORE", "2 "])
            .unwrap();
        assert_eq!(
            output,
            vec!["No output", "Mean: 0.000000", "Mean: 0.000000", "Mean: 4.000000"]
        );
    }

    #[test]
    fn test_stats_track_every_line() {
        let mut interpreter = Interpreter::default();

        interpreter
            .process(["1 1;a;1", "bogus", "2 a", "", "3 AFTER 0"])
            .unwrap();

        assert_eq!(
            interpreter.stats(),
            &RunStats {
                lines_read: 5,
                lines_written: 3,
                entries_added: 1,
                malformed_adds: 0,
                queries: 2,
                unrecognized_lines: 2,
            }
        );
    }
}
