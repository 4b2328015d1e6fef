//! Domain ports
//!
//! Capabilities the core consumes from its collaborators: who is calling,
//! and how to reach a customer.

pub mod identity;
pub mod notifier;

pub use identity::{Caller, Role};
pub use notifier::{Notification, Notifier, NotifyError};
