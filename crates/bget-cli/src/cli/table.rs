//! Fixed-width results table plus the batch summary.

use std::fmt::Write;

use bget_core::outcome::{JobOutcome, Timed};

/// Renders the per-job table (ordered by job number) and the totals.
/// Totals count collected outcomes only; jobs never run don't appear.
pub fn render(results: &Timed<Vec<Timed<JobOutcome>>>) -> String {
    let mut out = String::new();
    if results.value.is_empty() {
        let _ = writeln!(out, "No downloads were completed.");
        let _ = writeln!(out, "Total elapsed time: {} ms", results.elapsed_ms());
        return out;
    }

    let mut rows: Vec<&Timed<JobOutcome>> = results.value.iter().collect();
    rows.sort_by_key(|timed| timed.value.number());

    let _ = writeln!(
        out,
        "{:<5} {:<8} {:>14} {:>12}  {}",
        "#", "STATUS", "BYTES", "TIME (ms)", "URL"
    );
    let mut total_bytes = 0u64;
    for timed in rows {
        let outcome = &timed.value;
        total_bytes += outcome.bytes_saved();
        let status = if outcome.is_success() { "ok" } else { "failed" };
        let _ = writeln!(
            out,
            "{:<5} {:<8} {:>14} {:>12}  {}",
            outcome.number(),
            status,
            outcome.bytes_saved(),
            timed.elapsed_ms(),
            outcome.url()
        );
        if let JobOutcome::Failed { error, .. } = outcome {
            let _ = writeln!(out, "{:<5} {:<8} cause: {}", "", "", error);
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Total saved bytes: {}", total_bytes);
    let _ = writeln!(out, "Total elapsed time: {} ms", results.elapsed_ms());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bget_core::fetch::FetchError;
    use std::time::Duration;

    #[test]
    fn totals_count_successes_only_and_failures_show_their_cause() {
        let results = Timed::new(
            vec![
                Timed::new(
                    JobOutcome::Failed {
                        number: 2,
                        url: "http://host/b".into(),
                        error: FetchError::Status(500),
                    },
                    Duration::from_millis(5),
                ),
                Timed::new(
                    JobOutcome::Success {
                        number: 1,
                        url: "http://host/a".into(),
                        bytes_saved: 2048,
                    },
                    Duration::from_millis(120),
                ),
            ],
            Duration::from_millis(500),
        );

        let text = render(&results);
        assert!(text.contains("Total saved bytes: 2048"));
        assert!(text.contains("Total elapsed time: 500 ms"));
        assert!(text.contains("unexpected response status 500"));
        // Job 1 is listed before job 2 despite finishing later.
        let pos_a = text.find("http://host/a").unwrap();
        let pos_b = text.find("http://host/b").unwrap();
        assert!(pos_a < pos_b);
    }

    #[test]
    fn empty_batch_renders_the_summary_only() {
        let results: Timed<Vec<Timed<JobOutcome>>> =
            Timed::new(Vec::new(), Duration::from_millis(7));
        let text = render(&results);
        assert!(text.contains("No downloads were completed."));
        assert!(text.contains("Total elapsed time: 7 ms"));
    }
}
