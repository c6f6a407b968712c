//! Quantum Tasks — durable, retrying execution of submitted quantum circuits.

pub mod config;
pub mod error;
pub mod executor;
pub mod store;
pub mod tasks;
pub mod worker;
