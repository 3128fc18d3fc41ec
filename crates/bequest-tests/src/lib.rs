//! Cross-crate test suite for Bequest.
//!
//! Integration tests live in `tests/`; [`helpers`] builds ledgers, funded
//! owners and keepers for them.

pub mod helpers;
