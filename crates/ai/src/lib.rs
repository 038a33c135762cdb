//! Text-generation client.
//!
//! The [`TextOracle`] trait is the seam the pipeline depends on;
//! [`ChatClient`] is the production implementation over HTTP.

mod client;

pub use client::{ChatClient, ChatMessage, ChatRequest, OracleError, TextOracle};
