pub mod model;
pub mod repository;

pub use model::{IntentStatus, NewPaymentIntent, PaymentIntent};
pub use repository::PaymentIntentRepository;
