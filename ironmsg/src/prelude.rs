//! Prelude module for convenient imports.
//!
//! ```ignore
//! use ironmsg::prelude::*;
//! ```

// Channel types
pub use ironmsg_channel::{
    BoundedQueue, DelayError, DelayQueue, Distribution, ErrorKind, MsgError, Publisher, Registry,
    RegistryConfig, Subscriber,
};

// Task I/O
pub use crate::error::TaskError;
pub use crate::task::{TaskInfo, TaskIoInfo};
