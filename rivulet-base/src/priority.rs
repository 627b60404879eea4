use serde::{Deserialize, Serialize};

/// Priority band for download scheduling. The derived ordering puts more
/// urgent bands first, so a queue sorted ascending dispatches critical work
/// before anything else. `Unknown` is assigned to identifiers that did not
/// match the manifest and sorts after every real band.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl Priority {
    /// Parse a manifest priority string. Returns `None` for unrecognized
    /// values so the caller can log and pick a default.
    pub fn parse(value: &str) -> Option<Priority> {
        match value.to_ascii_lowercase().as_str() {
            "critical" => Some(Priority::Critical),
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
            Priority::Unknown => "unknown",
        };
        name.fmt(f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn ordering_puts_critical_first() {
        assert!(Priority::Critical < Priority::High);
        assert!(Priority::High < Priority::Medium);
        assert!(Priority::Medium < Priority::Low);
        assert!(Priority::Low < Priority::Unknown);
    }

    #[test]
    fn parse_known_bands() {
        assert_eq!(Priority::parse("critical"), Some(Priority::Critical));
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse("medium"), Some(Priority::Medium));
        assert_eq!(Priority::parse("low"), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
    }
}
