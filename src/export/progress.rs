//! Progress reporting for export runs.
//!
//! The exporter emits a [`Progress`] value before reading each event and
//! calls [`ProgressSink::on_finished`] once the run completes.

use crate::export::ExportReport;
use std::io::Write;
use std::time::Duration;

/// Progress of an export run at the event currently being read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// `100 * id / total_expected_events`, rounded to 2 decimals
    pub percent_done: f64,
    /// Estimated minutes remaining, `None` until some progress is made
    pub eta_minutes: Option<f64>,
    /// Event id about to be read
    pub current_id: u64,
}

impl Progress {
    /// Compute progress for event `id` after `elapsed` wall-clock time.
    ///
    /// The fraction complete is taken from the event id relative to the
    /// configured total, not from the number of events handled so far.
    pub fn compute(id: u64, total_expected_events: u64, elapsed: Duration) -> Self {
        if total_expected_events == 0 {
            return Self {
                percent_done: 0.0,
                eta_minutes: None,
                current_id: id,
            };
        }

        let fraction = id as f64 / total_expected_events as f64;
        let percent_done = (100.0 * fraction * 100.0).round() / 100.0;

        let eta_minutes = if fraction > 0.0 {
            let elapsed = elapsed.as_secs_f64();
            let remaining = (elapsed / fraction - elapsed).max(0.0);
            Some(remaining / 60.0)
        } else {
            None
        };

        Self {
            percent_done,
            eta_minutes,
            current_id: id,
        }
    }
}

/// Receives progress updates from the exporter.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &Progress);

    fn on_finished(&mut self, _report: &ExportReport) {}
}

impl<F> ProgressSink for F
where
    F: FnMut(&Progress),
{
    fn on_progress(&mut self, progress: &Progress) {
        self(progress)
    }
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&mut self, _progress: &Progress) {}
}

/// Single overwritten terminal line, followed by `FINISHED`.
pub struct ConsoleProgress<W: Write> {
    out: W,
}

impl ConsoleProgress<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleProgress<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Text of the progress line, without the leading carriage return.
    pub fn format_line(progress: &Progress) -> String {
        let eta = progress
            .eta_minutes
            .map(|m| format!("{m:.1}"))
            .unwrap_or_else(|| "--".to_string());
        format!(
            "{:>6.2}% done | ~{} min remaining | reading event {}",
            progress.percent_done, eta, progress.current_id
        )
    }
}

impl<W: Write> ProgressSink for ConsoleProgress<W> {
    fn on_progress(&mut self, progress: &Progress) {
        // Console write failures never abort the export.
        let _ = write!(self.out, "\r{:<72}", Self::format_line(progress));
        let _ = self.out.flush();
    }

    fn on_finished(&mut self, _report: &ExportReport) {
        let _ = writeln!(self.out);
        let _ = writeln!(self.out, "FINISHED");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_percent_uses_configured_total() {
        let progress = Progress::compute(1, 3, Duration::from_secs(0));
        assert_eq!(progress.percent_done, 33.33);
        assert_eq!(progress.current_id, 1);

        let progress = Progress::compute(2, 3, Duration::from_secs(0));
        assert_eq!(progress.percent_done, 66.67);
    }

    #[test]
    fn test_eta_from_elapsed_and_fraction() {
        // A quarter done after 60s: 240s total, 180s (3 min) left.
        let progress = Progress::compute(25, 100, Duration::from_secs(60));
        assert_eq!(progress.percent_done, 25.0);
        let eta = progress.eta_minutes.unwrap();
        assert!((eta - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_eta_unknown_at_zero() {
        let progress = Progress::compute(0, 100, Duration::from_secs(5));
        assert_eq!(progress.percent_done, 0.0);
        assert!(progress.eta_minutes.is_none());

        let progress = Progress::compute(5, 0, Duration::from_secs(5));
        assert!(progress.eta_minutes.is_none());
    }

    #[test]
    fn test_eta_never_negative_past_total() {
        let progress = Progress::compute(150, 100, Duration::from_secs(60));
        assert_eq!(progress.percent_done, 150.0);
        assert_eq!(progress.eta_minutes, Some(0.0));
    }

    #[test]
    fn test_console_line_and_finish_marker() {
        let mut console = ConsoleProgress::new(Vec::new());
        console.on_progress(&Progress {
            percent_done: 12.5,
            eta_minutes: Some(4.25),
            current_id: 42,
        });
        console.on_finished(&ExportReport {
            output_dir: PathBuf::from("out"),
            files: Vec::new(),
            skipped: 0,
            elapsed: Duration::from_secs(1),
        });

        let text = String::from_utf8(console.into_inner()).unwrap();
        assert!(text.starts_with('\r'));
        assert!(text.contains(" 12.50% done"));
        assert!(text.contains("~4.2 min remaining") || text.contains("~4.3 min remaining"));
        assert!(text.contains("reading event 42"));
        assert!(text.trim_end().ends_with("FINISHED"));
    }

    #[test]
    fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: &Progress| seen.push(p.current_id);
            sink.on_progress(&Progress::compute(1, 10, Duration::ZERO));
            sink.on_progress(&Progress::compute(2, 10, Duration::ZERO));
        }
        assert_eq!(seen, vec![1, 2]);
    }
}
