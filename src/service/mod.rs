//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by patient-assist:
//! - HTTP serving (e.g., axum)
//! - LLM services (e.g., OpenAI)
//! - Record storage (e.g., flat files)
//!
//! The LLM and storage services define both generic traits and concrete implementations,
//! allowing for extensibility and easy testing.

pub mod http;
pub mod llm;
pub mod store;
