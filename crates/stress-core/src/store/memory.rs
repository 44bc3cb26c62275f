use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{RecordStore, StoreError};
use crate::contracts::StressRecord;

/// Process-local store for development runs and tests
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<HashMap<String, StressRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<StressRecord> {
        self.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All records, ordered by id
    pub fn records(&self) -> Vec<StressRecord> {
        let mut records: Vec<_> = self.lock().values().cloned().collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StressRecord>> {
        // A poisoned map is still consistent: inserts are single operations
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn put_new(&self, record: &StressRecord) -> Result<(), StoreError> {
        let mut records = self.lock();
        if records.contains_key(&record.id) {
            return Err(StoreError::Conflict(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }
}
