//! Confidentiality-aware masking of values that end up in logs.

use std::fmt;

const MASK: &str = "***";
const VISIBLE_PREFIX: usize = 4;

/// How much of a sensitive value may appear in logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidentiality {
    /// Values are logged verbatim
    Low,
    /// A short prefix is logged
    Medium,
    /// Values are fully masked
    #[default]
    High,
}

impl Confidentiality {
    /// Mask `value` according to this tolerance.
    #[must_use]
    pub fn mask(self, value: &str) -> String {
        match self {
            Self::Low => value.to_string(),
            Self::Medium => {
                // short values would be mostly revealed by the prefix
                if value.chars().count() <= VISIBLE_PREFIX * 2 {
                    MASK.to_string()
                } else {
                    let prefix: String = value.chars().take(VISIBLE_PREFIX).collect();
                    format!("{prefix}{MASK}")
                }
            }
            Self::High => MASK.to_string(),
        }
    }
}

impl fmt::Display for Confidentiality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        })
    }
}

impl std::str::FromStr for Confidentiality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown confidentiality level {other:?}")),
        }
    }
}
