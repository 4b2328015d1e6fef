//! Notifier implementations

pub mod delivery_log;
pub mod event_bus;

pub use delivery_log::run_delivery_log;
pub use event_bus::{
    create_event_bus, EventBus, EventBusNotifier, EventSubscriber, NotificationMessage,
    SharedEventBus,
};
