//! Distribution policies for publishers with several subscribers.

use crate::error::MsgError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Rule selecting which subscriber(s) receive a pushed message.
///
/// With a single subscriber every policy degenerates to direct delivery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Every subscriber gets its own copy of every message.
    #[default]
    Same,
    /// Each message goes to one uniformly random subscriber.
    Rand,
    /// Each message goes to the next subscriber in round-robin order.
    Each,
    /// Each message goes to the first subscriber currently blocked in a
    /// consume call, falling back to [`Distribution::Rand`].
    #[serde(rename = "wait_fst")]
    WaitFirst,
}

impl Distribution {
    /// Returns the policy for a numeric code (`0..=3`, declaration order).
    ///
    /// # Errors
    /// Returns [`MsgError::BadUse`] for an unknown code.
    pub fn from_code(code: u8) -> Result<Self, MsgError> {
        match code {
            0 => Ok(Self::Same),
            1 => Ok(Self::Rand),
            2 => Ok(Self::Each),
            3 => Ok(Self::WaitFirst),
            other => Err(MsgError::bad_use(format!(
                "[Pub] unknown distribution code: {other}"
            ))),
        }
    }

    /// Returns the short name used in configuration files.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Same => "same",
            Self::Rand => "rand",
            Self::Each => "each",
            Self::WaitFirst => "wait_fst",
        }
    }

    /// Returns true if this policy draws from a random generator.
    #[must_use]
    pub(crate) fn is_random(self) -> bool {
        matches!(self, Self::Rand | Self::WaitFirst)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Distribution {
    type Err = MsgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "same" => Ok(Self::Same),
            "rand" => Ok(Self::Rand),
            "each" => Ok(Self::Each),
            "wait_fst" => Ok(Self::WaitFirst),
            other => Err(MsgError::bad_use(format!(
                "[Pub] unknown distribution: \"{other}\""
            ))),
        }
    }
}
