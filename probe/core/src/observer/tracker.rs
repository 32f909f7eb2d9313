/// Blocks that must elapse before confirmations are checked.
pub const BLOCK_THRESHOLD: u32 = 3;

/// Lifecycle of a single observation run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObserverState {
    Init,
    Subscribed,
    Counting,
    Evaluating,
    Closed,
}

/// Outcome of feeding one block event to the tracker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerStep {
    /// Below the threshold; keep counting.
    Counting { blocks: u32 },
    /// This event reached the threshold. Emitted at most once per run.
    ThresholdReached { blocks: u32 },
    /// Arrived after the threshold; counted nothing.
    Ignored,
}

/// Pure counting core of the confirmation observer: an ordered height log
/// and a block counter, mutated only from the event funnel.
#[derive(Debug)]
pub struct BlockTracker {
    threshold: u32,
    heights: Vec<u64>,
    blocks: u32,
    threshold_reached: bool,
}

impl BlockTracker {
    #[must_use]
    pub const fn new(threshold: u32) -> Self {
        Self {
            threshold,
            heights: Vec::new(),
            blocks: 0,
            threshold_reached: false,
        }
    }

    /// Records one block arrival. Once the threshold has been reached every
    /// later call is ignored, so a racing late event cannot re-trigger
    /// evaluation.
    pub fn record(&mut self, height: u64) -> TrackerStep {
        if self.threshold_reached {
            return TrackerStep::Ignored;
        }

        self.heights.push(height);
        self.blocks += 1;

        if self.blocks >= self.threshold {
            self.threshold_reached = true;
            TrackerStep::ThresholdReached {
                blocks: self.blocks,
            }
        } else {
            TrackerStep::Counting {
                blocks: self.blocks,
            }
        }
    }

    #[must_use]
    pub const fn blocks(&self) -> u32 {
        self.blocks
    }

    #[must_use]
    pub fn heights(&self) -> &[u64] {
        &self.heights
    }

    #[must_use]
    pub fn into_heights(self) -> Vec<u64> {
        self.heights
    }
}

impl Default for BlockTracker {
    fn default() -> Self {
        Self::new(BLOCK_THRESHOLD)
    }
}
