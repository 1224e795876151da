//! Request handling and user interactions for patient-assist.
//!
//! This module provides the flows behind each exchange:
//! - Matching a message to a patient record
//! - Answering chat messages with shaped replies
//! - Storing submitted forms as new records

pub mod chat;
pub mod form;
pub mod relevance;
