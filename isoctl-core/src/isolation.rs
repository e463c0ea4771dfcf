//! SQL transaction isolation levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::IsoError;

/// The four ANSI isolation levels, ordered weakest to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub const ALL: [IsolationLevel; 4] = [
        IsolationLevel::ReadUncommitted,
        IsolationLevel::ReadCommitted,
        IsolationLevel::RepeatableRead,
        IsolationLevel::Serializable,
    ];

    /// Keyword form used in `SET SESSION TRANSACTION ISOLATION LEVEL ...`
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }

    /// Statement that applies this level to the rest of the session.
    pub fn set_session_statement(&self) -> String {
        format!("SET SESSION TRANSACTION ISOLATION LEVEL {}", self.as_sql())
    }

    /// Anomalies the standard still permits at this level.
    pub fn permits(&self, anomaly: crate::scenarios::Anomaly) -> bool {
        use crate::scenarios::Anomaly;
        match anomaly {
            Anomaly::DirtyRead => *self == IsolationLevel::ReadUncommitted,
            Anomaly::NonRepeatableRead => *self <= IsolationLevel::ReadCommitted,
            Anomaly::PhantomRead => *self <= IsolationLevel::RepeatableRead,
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl FromStr for IsolationLevel {
    type Err = IsoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .trim_end_matches(';')
            .replace(['_', '-'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_uppercase();

        IsolationLevel::ALL
            .into_iter()
            .find(|level| level.as_sql() == normalized)
            .ok_or_else(|| IsoError::UnsupportedIsolationLevel(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::Anomaly;

    #[test]
    fn parses_sql_and_cli_spellings() {
        assert_eq!(
            "READ UNCOMMITTED".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadUncommitted
        );
        assert_eq!(
            "read-committed".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::ReadCommitted
        );
        assert_eq!(
            "repeatable_read".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::RepeatableRead
        );
        assert_eq!(
            "  serializable ".parse::<IsolationLevel>().unwrap(),
            IsolationLevel::Serializable
        );
    }

    #[test]
    fn rejects_unknown_levels() {
        let err = "SNAPSHOT".parse::<IsolationLevel>().unwrap_err();
        assert!(matches!(err, IsoError::UnsupportedIsolationLevel(ref s) if s == "SNAPSHOT"));
        assert!("READ".parse::<IsolationLevel>().is_err());
        assert!("".parse::<IsolationLevel>().is_err());
    }

    #[test]
    fn display_round_trips_through_from_str() {
        for level in IsolationLevel::ALL {
            assert_eq!(level.to_string().parse::<IsolationLevel>().unwrap(), level);
        }
    }

    #[test]
    fn set_session_statement_uses_keyword_form() {
        assert_eq!(
            IsolationLevel::RepeatableRead.set_session_statement(),
            "SET SESSION TRANSACTION ISOLATION LEVEL REPEATABLE READ"
        );
    }

    #[test]
    fn levels_order_by_strictness() {
        assert!(IsolationLevel::ReadUncommitted < IsolationLevel::ReadCommitted);
        assert!(IsolationLevel::RepeatableRead < IsolationLevel::Serializable);
    }

    #[test]
    fn permitted_anomalies_follow_the_ansi_table() {
        assert!(IsolationLevel::ReadUncommitted.permits(Anomaly::DirtyRead));
        assert!(!IsolationLevel::ReadCommitted.permits(Anomaly::DirtyRead));
        assert!(IsolationLevel::ReadCommitted.permits(Anomaly::NonRepeatableRead));
        assert!(!IsolationLevel::RepeatableRead.permits(Anomaly::NonRepeatableRead));
        assert!(IsolationLevel::RepeatableRead.permits(Anomaly::PhantomRead));
        assert!(!IsolationLevel::Serializable.permits(Anomaly::PhantomRead));
    }
}
