//! `isoctl levels` - list isolation levels and the anomalies each permits.

use anyhow::Result;
use isoctl_core::{Anomaly, IsolationLevel};

pub fn run_levels(json: bool) -> Result<()> {
    if json {
        let rows: Vec<_> = IsolationLevel::ALL
            .iter()
            .map(|level| {
                serde_json::json!({
                    "level": level.as_sql(),
                    "permits": permitted(*level)
                        .iter()
                        .map(|a| a.name())
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    for level in IsolationLevel::ALL {
        let names: Vec<_> = permitted(level).iter().map(|a| a.name()).collect();
        let permits = if names.is_empty() {
            "none".to_string()
        } else {
            names.join(", ")
        };
        println!("{:<17} permits: {}", level.as_sql(), permits);
    }
    Ok(())
}

fn permitted(level: IsolationLevel) -> Vec<Anomaly> {
    Anomaly::ALL
        .into_iter()
        .filter(|anomaly| level.permits(*anomaly))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializable_permits_nothing() {
        assert!(permitted(IsolationLevel::Serializable).is_empty());
        assert_eq!(permitted(IsolationLevel::ReadUncommitted).len(), 3);
    }
}
