//! Push notification fan-out.
//!
//! - `token` - the user -> push token registry
//! - `fanout` - one broadcast to every registered destination
//! - `queue` - bounded announcement queue drained by a worker pool

pub mod fanout;
pub mod queue;
pub mod token;

pub use fanout::{BroadcastReport, FanoutEngine, FanoutSettings};
pub use queue::{spawn_workers, Announcement, Notifier, NotifyWorkers};
pub use token::{is_push_token, MemoryTokenRegistry, PushDestination, TokenRegistry};
