//! Vehicle aggregate
//!
//! The shared availability status every other component reads and writes.

pub mod model;
pub mod repository;

pub use model::{ConditionUpdate, NewVehicle, Vehicle, VehicleStatus, VehicleStatusChange};
pub use repository::VehicleRepository;
