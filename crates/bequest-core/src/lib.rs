//! # bequest-core
//! Account model, activity tracking, distribution arithmetic and trait seams
//! for the Bequest inheritance engine.

pub mod accounts;
pub mod activity;
pub mod address;
pub mod constants;
pub mod crypto;
pub mod distribution;
pub mod error;
pub mod instruction;
pub mod store;
pub mod traits;
pub mod types;
