//! Fee and wallet ledger aggregate

pub mod model;
pub mod repository;

pub use model::{
    FeeType, LedgerEntry, MethodType, NewLedgerEntry, PaymentStatus, TransactionType, Wallet,
};
pub use repository::{LedgerRepository, WalletRepository};
