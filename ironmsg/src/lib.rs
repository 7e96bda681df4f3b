//! # IronMsg
//!
//! In-process messaging for wiring independent worker units together.
//!
//! ## Features
//!
//! - **One publisher, many subscribers** - Named channels per message type
//! - **Fan-out policies** - `same`, `rand`, `each` and `wait_fst`
//! - **Drop-oldest backpressure** - Producers never block on slow consumers
//! - **Poison propagation** - Tearing down any endpoint breaks the whole
//!   channel and wakes every blocked consumer
//! - **Task wiring** - Build endpoints straight from JSON task descriptions
//!
//! ## Quick Start
//!
//! ```
//! use ironmsg::prelude::*;
//!
//! let registry = Registry::<u64>::new();
//! let subscriber = Subscriber::new(&registry, "ticks")?;
//! let publisher = Publisher::new(&registry, "ticks", Distribution::Same)?;
//! publisher.lock(true)?;
//! publisher.push(1)?;
//! assert_eq!(subscriber.consume()?, 1);
//! # Ok::<(), MsgError>(())
//! ```
//!
//! ## Crate Organization
//!
//! - [`channel`] - Registry, publisher, subscriber and delay queue
//! - [`task`] - Task I/O descriptions and endpoint construction

pub mod error;
pub mod prelude;
pub mod task;

/// Channel implementation.
pub mod channel {
    pub use ironmsg_channel::*;
}

pub use error::TaskError;
pub use ironmsg_channel::{Distribution, MsgError, Publisher, Registry, Subscriber};
pub use task::{TaskInfo, TaskIoInfo};
