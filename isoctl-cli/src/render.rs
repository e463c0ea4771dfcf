//! Terminal and JSON rendering of scenario reports.

use anyhow::{Context, Result};
use isoctl_core::{RunReport, ScenarioReport};

const RULE: &str = "________________________________________________________";

pub fn print_scenarios(reports: &[ScenarioReport], json: bool) -> Result<()> {
    if json {
        let out = serde_json::to_string_pretty(reports).context("Failed to serialize reports")?;
        println!("{}", out);
        return Ok(());
    }

    for report in reports {
        println!("\n== {} ==", report.anomaly);
        for (i, run) in report.runs.iter().enumerate() {
            if i > 0 {
                println!("{}", RULE);
            }
            for line in run_lines(run) {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

fn run_lines(run: &RunReport) -> Vec<String> {
    let mut lines = vec![format!("\n[{}] {} ({} ms)", run.level, run.anomaly, run.elapsed_ms)];

    if let Some(observation) = &run.observation {
        lines.extend(observation.lines().into_iter().map(|l| format!("  {}", l)));
    }
    if let Some(e) = &run.writer_error {
        lines.push(format!("  [ERROR] Tx1: {}", e));
    }
    if let Some(e) = &run.reader_error {
        lines.push(format!("  [ERROR] Tx2: {}", e));
    }

    let verdict = match run.anomaly_observed() {
        Some(true) => format!("{} observed", run.anomaly),
        Some(false) => format!("no {}", run.anomaly),
        None => "no verdict".to_string(),
    };
    let expectation = if run.anomaly_permitted() {
        "permitted"
    } else {
        "prevented"
    };
    lines.push(format!(
        "  => {} ({} at {})",
        verdict, expectation, run.level
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use isoctl_core::report::PhantomReadObservation;
    use isoctl_core::{Anomaly, IsolationLevel, Observation};
    use uuid::Uuid;

    fn phantom_run(level: IsolationLevel, sum: f64) -> RunReport {
        RunReport {
            run_id: Uuid::nil(),
            anomaly: Anomaly::PhantomRead,
            level,
            started_at: Utc::now(),
            elapsed_ms: 7,
            observation: Some(Observation::PhantomRead(PhantomReadObservation {
                count: 2,
                sum,
                average: sum / 2.0,
                expected_sum: 1500.0,
                writer_blocked: false,
            })),
            writer_error: None,
            reader_error: None,
        }
    }

    #[test]
    fn run_lines_show_values_and_verdict() {
        let lines = run_lines(&phantom_run(IsolationLevel::ReadCommitted, 2100.0));
        assert!(lines[0].contains("READ COMMITTED"));
        assert!(lines.iter().any(|l| l.contains("AVERAGE: 1050.00")));
        assert_eq!(
            lines.last().unwrap(),
            "  => phantom read observed (permitted at READ COMMITTED)"
        );
    }

    #[test]
    fn run_lines_report_errors_without_verdict() {
        let mut run = phantom_run(IsolationLevel::Serializable, 1500.0);
        run.observation = None;
        run.reader_error = Some("accounts table is empty".into());

        let lines = run_lines(&run);
        assert!(lines.iter().any(|l| l == "  [ERROR] Tx2: accounts table is empty"));
        assert!(lines.last().unwrap().contains("no verdict"));
    }
}
