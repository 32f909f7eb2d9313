use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Genesis timestamp of the probed network in milliseconds since the Unix
/// epoch. All deadlines are expressed relative to this offset.
pub const EPOCH_OFFSET_MILLIS: u64 = 1_459_468_800_000;

/// Window applied when no explicit duration is requested.
pub const DEFAULT_DEADLINE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Window used by the static deadline variant.
pub const STATIC_DEADLINE_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Network-relative expiry timestamp attached to a transaction.
///
/// The node rejects a transaction whose deadline does not exceed its current
/// network time, so both construction strategies must stay ahead of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Deadline(u64);

impl Deadline {
    /// Computes `window + (now - epoch)` exactly, without rounding. Falls
    /// back to [`DEFAULT_DEADLINE_WINDOW`] when no window is given.
    #[must_use]
    pub fn at(now_millis: u64, window: Option<Duration>) -> Self {
        let window = window.unwrap_or(DEFAULT_DEADLINE_WINDOW);
        Self(window.as_millis() as u64 + network_time_millis(now_millis))
    }

    /// Deadline computed at call time with the default window; the dynamic
    /// strategy of the probe.
    #[must_use]
    pub fn dynamic() -> Self {
        Self::at(wall_clock_millis(), None)
    }

    /// Deadline computed once from a fixed window; the static strategy.
    #[must_use]
    pub fn from_window(window: Duration) -> Self {
        Self::at(wall_clock_millis(), Some(window))
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// Which construction strategy produced a transaction's deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeadlineVariant {
    Dynamic,
    Static,
}

impl DeadlineVariant {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Dynamic => "dynamic-deadline",
            Self::Static => "static-deadline",
        }
    }
}

/// Wall-clock milliseconds converted to network-relative time.
#[must_use]
pub const fn network_time_millis(now_millis: u64) -> u64 {
    now_millis.saturating_sub(EPOCH_OFFSET_MILLIS)
}

fn wall_clock_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}
