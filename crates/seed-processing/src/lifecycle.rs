//! Product lifecycle stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered lifecycle stage of a seed product.
///
/// The derived `Ord` follows declaration order, which is the order a product
/// is expected to move through over successive sales years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStage {
    Introduction,
    Established,
    Expansion,
    Phaseout,
}

impl LifecycleStage {
    /// All stages in lifecycle order.
    pub const ALL: [LifecycleStage; 4] = [
        LifecycleStage::Introduction,
        LifecycleStage::Established,
        LifecycleStage::Expansion,
        LifecycleStage::Phaseout,
    ];

    /// Position of the stage in lifecycle order, starting at 0.
    pub fn code(self) -> i64 {
        match self {
            LifecycleStage::Introduction => 0,
            LifecycleStage::Established => 1,
            LifecycleStage::Expansion => 2,
            LifecycleStage::Phaseout => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStage::Introduction => "INTRODUCTION",
            LifecycleStage::Established => "ESTABLISHED",
            LifecycleStage::Expansion => "EXPANSION",
            LifecycleStage::Phaseout => "PHASEOUT",
        }
    }

    /// Code for a raw label, `None` if the label is not a known stage.
    pub fn code_of(label: &str) -> Option<i64> {
        label.parse::<LifecycleStage>().ok().map(LifecycleStage::code)
    }
}

impl fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a label is not a lifecycle stage.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown lifecycle stage '{0}'")]
pub struct UnknownLifecycleStage(pub String);

impl FromStr for LifecycleStage {
    type Err = UnknownLifecycleStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LifecycleStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| UnknownLifecycleStage(s.to_string()))
    }
}
