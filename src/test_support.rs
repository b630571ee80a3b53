//! Test doubles shared by unit and HTTP tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::files::FileStore;

/// In-memory [`FileStore`] that records every removal attempt.
#[derive(Default)]
pub struct RecordingFileStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
    removals: Mutex<Vec<String>>,
    fail_saves: AtomicBool,
    fail_removals: AtomicBool,
    counter: AtomicU64,
}

impl RecordingFileStore {
    /// Filenames passed to `remove`, in call order.
    pub fn removals(&self) -> Vec<String> {
        self.removals.lock().unwrap().clone()
    }

    pub fn stored_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Drop a file behind the store's back.
    pub fn forget(&self, filename: &str) {
        self.files.lock().unwrap().remove(filename);
    }

    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    pub fn fail_removals(&self) {
        self.fail_removals.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileStore for RecordingFileStore {
    fn backend_tag(&self) -> &'static str {
        "recording"
    }

    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::Storage("disk full".to_string()));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let filename = format!("{}-{}", n, original_name);
        self.files
            .lock()
            .unwrap()
            .insert(filename.clone(), bytes.to_vec());
        Ok(filename)
    }

    async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>, AppError> {
        Ok(self.files.lock().unwrap().get(filename).cloned())
    }

    async fn remove(&self, filename: &str) -> Result<(), AppError> {
        self.removals.lock().unwrap().push(filename.to_string());
        if self.fail_removals.load(Ordering::SeqCst) {
            return Err(AppError::Storage("permission denied".to_string()));
        }
        self.files.lock().unwrap().remove(filename);
        Ok(())
    }
}
