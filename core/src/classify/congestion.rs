use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CongestionLevel {
    Clear,
    Congested,
    Critical,
}

impl CongestionLevel {
    /// Operator-facing label shown on the dashboard.
    pub fn label(&self) -> &'static str {
        match self {
            CongestionLevel::Clear => "원활",
            CongestionLevel::Congested => "혼잡",
            CongestionLevel::Critical => "매우 혼잡",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CongestionLevel::Clear => "clear",
            CongestionLevel::Congested => "congested",
            CongestionLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for CongestionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct CongestionClassifier;

impl CongestionClassifier {
    /// Maps the share of empty slots onto a congestion level.
    ///
    /// `empty/total <= 0.2` is critical and `<= 0.5` congested; ties land in the
    /// more severe bucket. Compared by cross-multiplication so the 0.2 and 0.5
    /// boundaries are exact. No configured slots is `Clear`.
    pub fn classify(empty: usize, total: usize) -> CongestionLevel {
        if total == 0 {
            return CongestionLevel::Clear;
        }
        let empty = empty as u128;
        let total = total as u128;
        if empty * 5 <= total {
            CongestionLevel::Critical
        } else if empty * 2 <= total {
            CongestionLevel::Congested
        } else {
            CongestionLevel::Clear
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_table() {
        assert_eq!(CongestionClassifier::classify(0, 10), CongestionLevel::Critical);
        assert_eq!(CongestionClassifier::classify(2, 10), CongestionLevel::Critical);
        assert_eq!(CongestionClassifier::classify(3, 10), CongestionLevel::Congested);
        assert_eq!(CongestionClassifier::classify(5, 10), CongestionLevel::Congested);
        assert_eq!(CongestionClassifier::classify(6, 10), CongestionLevel::Clear);
        assert_eq!(CongestionClassifier::classify(10, 10), CongestionLevel::Clear);
    }

    #[test]
    fn no_slots_is_clear() {
        assert_eq!(CongestionClassifier::classify(0, 0), CongestionLevel::Clear);
    }

    #[test]
    fn boundaries_hold_where_float_division_is_inexact() {
        // 0.2 and 0.5 ties at sizes where the float ratio rounds.
        assert_eq!(CongestionClassifier::classify(1, 5), CongestionLevel::Critical);
        assert_eq!(CongestionClassifier::classify(41, 205), CongestionLevel::Critical);
        assert_eq!(CongestionClassifier::classify(42, 205), CongestionLevel::Congested);
        assert_eq!(CongestionClassifier::classify(1, 2), CongestionLevel::Congested);
        assert_eq!(CongestionClassifier::classify(102, 203), CongestionLevel::Clear);
    }

    #[test]
    fn labels_match_dashboard_wording() {
        assert_eq!(CongestionLevel::Clear.to_string(), "원활");
        assert_eq!(CongestionLevel::Congested.label(), "혼잡");
        assert_eq!(CongestionLevel::Critical.label(), "매우 혼잡");
    }
}
