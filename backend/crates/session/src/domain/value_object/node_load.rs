//! Node Load
//!
//! Load of a serving node on a 0..=100 scale.

/// Load at which a node is saturated and refuses secondary-hop sessions
pub const DEFAULT_REJECT_LOAD: u8 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeLoad(u8);

impl NodeLoad {
    pub const MAX: u8 = 100;

    pub fn new(percent: u8) -> Option<Self> {
        (percent <= Self::MAX).then_some(Self(percent))
    }

    /// Clamp a telemetry reading into range; NaN counts as saturated
    pub fn from_reading(reading: f64) -> Self {
        if reading.is_nan() {
            return Self(Self::MAX);
        }
        Self(reading.clamp(0.0, Self::MAX as f64).round() as u8)
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    pub fn is_below(&self, threshold: u8) -> bool {
        self.0 < threshold
    }
}
