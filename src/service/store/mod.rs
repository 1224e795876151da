//! Storage for patient records and the index that catalogs them.
//!
//! Records are plain text documents addressed by filename. The index is the ordered list of
//! filenames the relevance agent is allowed to choose from.

pub mod file;

use std::{collections::BTreeMap, ops::Deref, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use tracing::{info, instrument};

use crate::base::types::{Res, Void};

/// Timestamp layout used in submission filenames and record headers.
pub const SUBMISSION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// Traits.

/// Generic record store trait that stores must implement.
///
/// Implementing this trait allows the flat-file layout to be swapped for another backend
/// without touching the chat flow.
#[async_trait]
pub trait GenericRecordStore: Send + Sync + 'static {
    /// Load the record index; a missing index is an empty one.
    async fn load_index(&self) -> Res<Vec<String>>;

    /// Append a filename to the record index.
    ///
    /// Duplicates are not rejected.
    async fn append_index(&self, filename: &str) -> Void;

    /// Read a record; a missing record is `None`.
    async fn read_record(&self, filename: &str) -> Res<Option<String>>;

    /// Write a record, replacing any existing record with the same name.
    async fn write_record(&self, filename: &str, contents: &str) -> Void;
}

// Structs.

/// Record store for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<dyn GenericRecordStore>,
}

impl Deref for RecordStore {
    type Target = dyn GenericRecordStore;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl RecordStore {
    pub fn new(inner: Arc<dyn GenericRecordStore>) -> Self {
        Self { inner }
    }

    /// Persist a form submission as a new record and register it in the index.
    ///
    /// Returns the new record's filename. Two submissions within the same second share a
    /// filename, and the later one wins.
    #[instrument(skip_all)]
    pub async fn append_submission(&self, form_data: &BTreeMap<String, String>, context: &str, now: DateTime<Local>) -> Res<String> {
        let timestamp = now.format(SUBMISSION_TIMESTAMP_FORMAT).to_string();
        let filename = submission_filename(&timestamp);

        self.write_record(&filename, &render_submission(&timestamp, form_data, context)).await?;
        self.append_index(&filename).await?;

        info!("Stored form submission as `{filename}`.");

        Ok(filename)
    }
}

// Helpers.

/// Filename for a submission taken at `timestamp`.
pub fn submission_filename(timestamp: &str) -> String {
    format!("form_submission_{timestamp}.txt")
}

/// Render a submission as a plain text record.
pub fn render_submission(timestamp: &str, form_data: &BTreeMap<String, String>, context: &str) -> String {
    let mut record = format!("Timestamp: {timestamp}\nContext: {context}\nForm Data:\n");

    for (field, value) in form_data {
        record.push_str(&format!("{field}: {value}\n"));
    }

    record
}

// Tests.

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_render_submission_lists_fields_in_name_order() {
        let form_data = BTreeMap::from([("zip".to_string(), "94110".to_string()), ("street".to_string(), "1 Main St".to_string())]);

        let record = render_submission("20240102_030405", &form_data, "Address change");

        assert_eq!(record, "Timestamp: 20240102_030405\nContext: Address change\nForm Data:\nstreet: 1 Main St\nzip: 94110\n");
    }

    #[test]
    fn test_submission_filename_uses_timestamp_format() {
        let now = Local.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();

        let filename = submission_filename(&now.format(SUBMISSION_TIMESTAMP_FORMAT).to_string());

        assert_eq!(filename, "form_submission_20240102_030405.txt");
    }
}
