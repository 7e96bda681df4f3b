//! Task I/O descriptions.
//!
//! A task declares named I/O slots, each naming the channel it reads from or
//! writes to. The helpers here turn a slot into a bound [`Publisher`] or
//! [`Subscriber`]; the channel layer itself knows nothing about tasks.

use crate::error::TaskError;
use ironmsg_channel::{Distribution, Publisher, Registry, Subscriber};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Channel used by one task I/O slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskIoInfo {
    /// Channel name.
    pub channel: String,
}

/// Stored description of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Whether the task is enabled.
    #[serde(default)]
    pub enable: bool,
    /// I/O slots by name.
    #[serde(default)]
    pub io: BTreeMap<String, TaskIoInfo>,
    /// Task arguments by name.
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl TaskInfo {
    /// Parses a task description from JSON.
    ///
    /// # Errors
    /// Returns [`TaskError::Json`] if `json` is not a valid task object.
    pub fn from_json(json: &str) -> Result<Self, TaskError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialises this task description to JSON.
    ///
    /// # Errors
    /// Returns [`TaskError::Json`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, TaskError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Returns the channel name of I/O slot `slot`.
    ///
    /// # Errors
    /// Returns [`TaskError::MissingIo`] if the slot is not declared.
    pub fn channel(&self, slot: &str) -> Result<&str, TaskError> {
        self.io
            .get(slot)
            .map(|io| io.channel.as_str())
            .ok_or_else(|| TaskError::MissingIo {
                slot: slot.to_owned(),
            })
    }

    /// Creates a publisher bound to the channel of `slot`.
    ///
    /// # Errors
    /// Returns [`TaskError::MissingIo`] for an undeclared slot and
    /// [`TaskError::Msg`] if registration fails.
    pub fn publisher<T>(
        &self,
        registry: &Registry<T>,
        slot: &str,
        policy: Distribution,
    ) -> Result<Publisher<T>, TaskError> {
        let channel = self.channel(slot)?;
        Ok(Publisher::new(registry, channel, policy)?)
    }

    /// Creates a subscriber on the channel of `slot`.
    ///
    /// # Errors
    /// Returns [`TaskError::MissingIo`] for an undeclared slot and
    /// [`TaskError::Msg`] if registration fails.
    pub fn subscriber<T>(
        &self,
        registry: &Registry<T>,
        slot: &str,
        max_size: usize,
    ) -> Result<Subscriber<T>, TaskError> {
        let channel = self.channel(slot)?;
        Ok(Subscriber::with_queue_size(registry, channel, max_size)?)
    }
}
