use std::fmt;

use tracing::{info, warn};

/// How many confirmed records must match the tracked hashes.
pub const EXPECTED_MATCHES: usize = 2;

/// Terminal outcome of a probe run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Both tracked transactions appeared in confirmed history.
    Success { matched: usize },
    /// Any other match count: 0, 1, or more than two.
    Failure { matched: usize },
    /// The configured wait elapsed before enough blocks arrived. Distinct
    /// from a confirmation mismatch.
    TimedOut { blocks_seen: u32 },
}

impl Verdict {
    #[must_use]
    pub const fn from_matches(matched: usize) -> Self {
        if matched == EXPECTED_MATCHES {
            Self::Success { matched }
        } else {
            Self::Failure { matched }
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Match count, when the run got as far as evaluating history.
    #[must_use]
    pub const fn matched(&self) -> Option<usize> {
        match self {
            Self::Success { matched } | Self::Failure { matched } => Some(*matched),
            Self::TimedOut { .. } => None,
        }
    }

    /// Emits the user-visible pass/fail line, always with the match count.
    pub fn report(&self) {
        match self {
            Self::Success { matched } => {
                info!(confirmed_count = matched, "probe result SUCCESS: both transactions confirmed");
            }
            Self::Failure { matched } => {
                warn!(
                    confirmed_count = matched,
                    "probe result FAILURE: expected both transactions to confirm"
                );
            }
            Self::TimedOut { blocks_seen } => {
                warn!(blocks_seen, "probe result TIMED OUT before enough blocks arrived");
            }
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success { .. } => f.write_str("SUCCESS"),
            Self::Failure { .. } => f.write_str("FAILURE"),
            Self::TimedOut { .. } => f.write_str("TIMED_OUT"),
        }
    }
}
