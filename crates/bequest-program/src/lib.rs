//! # bequest-program
//! The inheritance state machine and every instruction handler, executed
//! against an injected [`AccountStore`](bequest_core::store::AccountStore).

pub mod admin;
pub mod context;
pub mod execution;
pub mod owner;
pub mod processor;
pub mod query;

pub use execution::{inheritance_state, InheritanceState};
pub use processor::process_transaction;
pub use query::{decode_eligible, is_eligible};
