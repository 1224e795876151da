//! This module handles the storage of submitted forms.

use chrono::Local;
use tracing::instrument;

use crate::{
    base::types::{FormSubmissionRequest, FormSubmissionResponse, Res},
    service::store::RecordStore,
};

/// Message returned to the client after a successful submission.
pub const FORM_SAVED_MESSAGE: &str = "Form data saved successfully";

/// Handles a form submission.
///
/// The submission becomes a new record listed in the index, so later chat messages can match it.
#[instrument(skip_all)]
pub async fn handle_form_submission(request: FormSubmissionRequest, store: &RecordStore) -> Res<FormSubmissionResponse> {
    store.append_submission(&request.form_data, &request.context, Local::now()).await?;

    Ok(FormSubmissionResponse {
        success: true,
        message: FORM_SAVED_MESSAGE.to_string(),
    })
}
