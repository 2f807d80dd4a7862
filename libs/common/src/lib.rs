//! Common library for the chirp backend
//!
//! This crate provides shared infrastructure used by the chirp services:
//! PostgreSQL connectivity and the store-level error types.

pub mod database;
pub mod error;
