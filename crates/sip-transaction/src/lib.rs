//! RFC 3261 §17 transaction layer: the four client/server state machines,
//! their timers, and the registry that matches inbound messages to a live
//! transaction (spec §4.D).

pub mod error;
pub mod event;
pub mod key;
pub mod manager;
pub mod state;
pub mod timer;
pub mod transaction;

pub use error::{Error, Result};
pub use event::TransactionEvent;
pub use key::TransactionKey;
pub use manager::TransactionManager;
pub use state::{Kind, Role, State};
pub use timer::TimerName;
pub use transaction::{Effect, Transaction};
