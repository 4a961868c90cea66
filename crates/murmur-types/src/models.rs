use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a report points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportTarget {
    User,
    Post,
}

impl ReportTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportTarget::User => "User",
            ReportTarget::Post => "Post",
        }
    }
}

impl FromStr for ReportTarget {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" => Ok(ReportTarget::User),
            "Post" => Ok(ReportTarget::Post),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ReportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state of a report. Any status may follow any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "Pending",
            ReportStatus::Reviewed => "Reviewed",
            ReportStatus::Resolved => "Resolved",
        }
    }
}

impl FromStr for ReportStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ReportStatus::Pending),
            "Reviewed" => Ok(ReportStatus::Reviewed),
            "Resolved" => Ok(ReportStatus::Resolved),
            other => Err(UnknownVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant(pub String);

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown variant '{}'", self.0)
    }
}

impl std::error::Error for UnknownVariant {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_target_parses_exact_names_only() {
        assert_eq!("Post".parse::<ReportTarget>(), Ok(ReportTarget::Post));
        assert_eq!("User".parse::<ReportTarget>(), Ok(ReportTarget::User));
        assert!("post".parse::<ReportTarget>().is_err());
        assert!("Comment".parse::<ReportTarget>().is_err());
    }

    #[test]
    fn report_status_defaults_to_pending() {
        assert_eq!(ReportStatus::default(), ReportStatus::Pending);
        assert_eq!("Resolved".parse::<ReportStatus>(), Ok(ReportStatus::Resolved));
        assert!("Closed".parse::<ReportStatus>().is_err());
    }
}
