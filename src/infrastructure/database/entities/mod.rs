//! Database entities module

pub mod handover;
pub mod payment;
pub mod payment_intent;
pub mod pickup_token;
pub mod rental;
pub mod reservation;
pub mod vehicle;
pub mod vehicle_status_change;
pub mod wallet;

pub use handover::Entity as Handover;
pub use payment::Entity as Payment;
pub use payment_intent::Entity as PaymentIntent;
pub use pickup_token::Entity as PickupToken;
pub use rental::Entity as Rental;
pub use reservation::Entity as Reservation;
pub use vehicle::Entity as Vehicle;
pub use vehicle_status_change::Entity as VehicleStatusChange;
pub use wallet::Entity as Wallet;
