//! Library root for `patient-assist`.
//!
//! Patient-assist is an OpenAI-powered assistant for a healthcare patient portal designed to:
//! - Answer patient questions, using a matching patient record as context when one exists
//! - Ask for structured information through forms embedded in its replies
//! - Point patients to other parts of the portal with action buttons
//! - Offer short follow-up questions
//! - Store submitted forms as new patient records
//!
//! The service speaks JSON over HTTP, stores records as flat files, and uses OpenAI for
//! responses. The architecture is built around extensible traits that allow for different
//! implementations of each service.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the patient-assist runtime:
/// - Creates the runtime context with the record store and LLM client
/// - Serves the HTTP API until shutdown
pub async fn start(config: Config) -> Void {
    info!("Starting patient-assist ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config)?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
