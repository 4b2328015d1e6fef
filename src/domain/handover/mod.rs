//! Handover aggregate

pub mod model;
pub mod repository;

pub use model::{
    Condition, Damage, FeeBreakdown, FeeInputs, Handover, HandoverType, NewHandover,
};
pub use repository::HandoverRepository;
