//! Event contracts and pub/sub mechanics.
//!
//! Authorization code publishes facts (role changed, impersonation started)
//! here; transports and consumers live elsewhere.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
