//! Core components, types, and utilities for patient-assist.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - System prompts for LLM interactions.
//! - The parser for directives embedded in assistant replies.
//! - Common types and result handling.

pub mod config;
pub mod directive;
pub mod prompts;
pub mod types;
