//! Flat-file implementation of [`GenericRecordStore`].
//!
//! Layout under the data directory:
//! - `index.json`: JSON array of record filenames, rewritten wholesale on every append.
//! - one text file per record.

use std::{io::ErrorKind, path::Path, sync::Arc};

use async_trait::async_trait;
use strict_path::{PathBoundary, StrictPath};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::base::types::{Res, Void};

use super::{GenericRecordStore, RecordStore};

/// Name of the index file inside the data directory.
pub const INDEX_FILE_NAME: &str = "index.json";

/// Marker for paths inside the patient data directory.
#[derive(Clone)]
pub struct PatientData;

// Extra methods on `RecordStore` applied by the flat-file implementation.

impl RecordStore {
    /// Creates a flat-file record store rooted at `data_dir`, creating the directory if needed.
    pub fn file(data_dir: impl AsRef<Path>) -> Res<Self> {
        let store = FileRecordStore::new(data_dir)?;
        Ok(Self { inner: Arc::new(store) })
    }
}

/// Flat-file record store.
pub struct FileRecordStore {
    root: PathBoundary<PatientData>,
    /// Serialises index rewrites within this process.
    index_lock: Mutex<()>,
}

impl FileRecordStore {
    /// Create a new flat-file store rooted at `data_dir`.
    #[instrument(name = "FileRecordStore::new", skip_all)]
    pub fn new(data_dir: impl AsRef<Path>) -> Res<Self> {
        let root = PathBoundary::try_new_create(data_dir)?;

        debug!("Patient data directory: {}", root.strictpath_display());

        Ok(Self { root, index_lock: Mutex::new(()) })
    }

    /// Resolve a record name inside the data directory, rejecting names that escape it.
    fn record_path(&self, filename: &str) -> Res<StrictPath<PatientData>> {
        if filename.is_empty() || filename == INDEX_FILE_NAME {
            return Err(anyhow::anyhow!("Invalid record name: `{filename}`."));
        }

        Ok(self.root.strict_join(filename)?)
    }

    async fn read_index(&self) -> Res<Vec<String>> {
        let path = self.root.strict_join(INDEX_FILE_NAME)?;

        match tokio::fs::read_to_string(path.interop_path()).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Index file not found; treating it as empty.");
                Ok(Vec::new())
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl GenericRecordStore for FileRecordStore {
    #[instrument(skip(self))]
    async fn load_index(&self) -> Res<Vec<String>> {
        self.read_index().await
    }

    #[instrument(skip(self))]
    async fn append_index(&self, filename: &str) -> Void {
        let _guard = self.index_lock.lock().await;

        let mut index = self.read_index().await?;
        index.push(filename.to_string());

        // Write a sibling file and rename it over the index so readers never see a partial write.
        let index_path = self.root.strict_join(INDEX_FILE_NAME)?;
        let staging_path = self.root.strict_join(format!("{INDEX_FILE_NAME}.tmp"))?;

        tokio::fs::write(staging_path.interop_path(), serde_json::to_vec(&index)?).await?;
        tokio::fs::rename(staging_path.interop_path(), index_path.interop_path()).await?;

        debug!("Index now lists {} records.", index.len());

        Ok(())
    }

    #[instrument(skip(self))]
    async fn read_record(&self, filename: &str) -> Res<Option<String>> {
        let path = self.record_path(filename)?;

        match tokio::fs::read_to_string(path.interop_path()).await {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!("Record `{filename}` is listed but missing.");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self, contents))]
    async fn write_record(&self, filename: &str, contents: &str) -> Void {
        let path = self.record_path(filename)?;

        tokio::fs::write(path.interop_path(), contents).await?;

        Ok(())
    }
}

// Tests.
