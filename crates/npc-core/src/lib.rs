//! Core types and trait definitions for the npc companion store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod achievement;
pub mod chat;
pub mod checkin;
pub mod error;
pub mod goal;
pub mod museum;
pub mod parent;
pub mod store;
pub mod user;
pub mod world;

pub use error::{Error, Result};
