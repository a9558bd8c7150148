//! justdoit-api: HTTP client for the todo backend

pub mod client;
pub mod wire;

pub use client::{DEFAULT_BASE_URL, HttpApi};
