//! Pickup access token aggregate ("QR code")

pub mod model;
pub mod payload;
pub mod repository;

pub use model::{PickupToken, TokenStatus};
pub use payload::{ParsedPayload, TokenCodec};
pub use repository::PickupTokenRepository;
