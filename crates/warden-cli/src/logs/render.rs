use std::io::{self, Write};

use super::query::LogQueryOutcome;

/// Writes a query outcome for an operator.
pub(crate) fn render_outcome<W: Write>(outcome: &LogQueryOutcome, stdout: &mut W) -> io::Result<()> {
    match outcome {
        LogQueryOutcome::Missing { path } => {
            writeln!(stdout, "no log yet: {} does not exist", path.display())?;
            writeln!(stdout, "start the service with 'warden start' to capture output")?;
        }
        LogQueryOutcome::Empty => writeln!(stdout, "log file is empty")?,
        LogQueryOutcome::NoMatches => writeln!(stdout, "no matching log entries found")?,
        LogQueryOutcome::Records(records) => {
            for record in records {
                writeln!(stdout, "{}", record.text)?;
            }
            let noun = if records.len() == 1 { "line" } else { "lines" };
            writeln!(stdout)?;
            writeln!(stdout, "--- {} {noun} shown ---", records.len())?;
        }
    }
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logs::query::LogRecord;
    use std::path::PathBuf;

    fn render(outcome: &LogQueryOutcome) -> String {
        let mut buffer = Vec::new();
        render_outcome(outcome, &mut buffer).expect("render");
        String::from_utf8(buffer).expect("utf8")
    }

    #[test]
    fn records_are_followed_by_a_summary() {
        let outcome = LogQueryOutcome::Records(vec![
            LogRecord {
                line_number: 7,
                text: String::from("fail: boom"),
            },
            LogRecord {
                line_number: 9,
                text: String::from("fail: again"),
            },
        ]);
        assert_eq!(
            render(&outcome),
            "fail: boom\nfail: again\n\n--- 2 lines shown ---\n"
        );
    }

    #[test]
    fn single_record_summary_is_singular() {
        let outcome = LogQueryOutcome::Records(vec![LogRecord {
            line_number: 1,
            text: String::from("ready"),
        }]);
        assert!(render(&outcome).ends_with("ready\n\n--- 1 line shown ---\n"));
    }

    #[test]
    fn missing_log_points_at_start() {
        let outcome = LogQueryOutcome::Missing {
            path: PathBuf::from(".warden/service.log"),
        };
        let text = render(&outcome);
        assert!(text.contains(".warden/service.log"));
        assert!(text.contains("warden start"));
    }

    #[test]
    fn empty_and_no_match_messages_differ() {
        assert_eq!(render(&LogQueryOutcome::Empty), "log file is empty\n");
        assert_eq!(
            render(&LogQueryOutcome::NoMatches),
            "no matching log entries found\n"
        );
    }
}
