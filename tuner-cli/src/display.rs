//! Text rendering of pipeline reports.

use guitar_tuner_core::{Direction, PipelineReport, TuningState};

/// Instruction shown for a displayed state.
pub fn advice(state: TuningState) -> &'static str {
    match state {
        TuningState::Idle => "waiting for a note",
        TuningState::Tuned => "in tune",
        TuningState::Near(Direction::Sharp) => "slightly sharp, loosen a little",
        TuningState::Near(Direction::Flat) => "slightly flat, tighten a little",
        TuningState::Far(Direction::Sharp) => "sharp, loosen",
        TuningState::Far(Direction::Flat) => "flat, tighten",
    }
}

/// One human-readable line per report.
pub fn format_report(report: &PipelineReport) -> String {
    match (&report.target, report.frequency, report.deviation_cents) {
        (Some(target), Some(frequency), Some(cents)) => format!(
            "{:<4} {:>8.2} Hz  target {:>7.2} Hz  {:+4} cents  {}",
            target.name,
            frequency,
            target.frequency,
            cents,
            advice(report.state)
        ),
        _ => format!("{:<4} {:>8} Hz  {}", "--", "--", advice(report.state)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guitar_tuner_core::TuningTarget;

    #[test]
    fn formats_matched_report() {
        let report = PipelineReport {
            frequency: Some(111.0),
            raw_frequency: Some(111.2),
            target: Some(TuningTarget::new("A2", 110.0)),
            deviation_cents: Some(16),
            state: TuningState::Far(Direction::Sharp),
        };
        let line = format_report(&report);
        assert!(line.starts_with("A2"));
        assert!(line.contains("111.00 Hz"));
        assert!(line.contains("+16 cents"));
        assert!(line.ends_with("sharp, loosen"));
    }

    #[test]
    fn formats_idle_report() {
        let report = PipelineReport {
            frequency: None,
            raw_frequency: None,
            target: None,
            deviation_cents: None,
            state: TuningState::Idle,
        };
        assert!(format_report(&report).ends_with("waiting for a note"));
    }
}
