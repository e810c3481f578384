//! # gradelog-contracts
//!
//! Shared types and error definitions for the gradelog workspace.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate — only data definitions and error types.

pub mod env;
pub mod error;
pub mod event;
pub mod session;
