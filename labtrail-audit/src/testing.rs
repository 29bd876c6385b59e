//! Test doubles shared by the audit unit tests

use async_trait::async_trait;
use labtrail_client::{ClientError, RegistryClient, Result};
use serde_json::Value;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Registry fake that records every call and can be told to fail
#[derive(Default)]
pub struct RecordingRegistry {
    pub reads: Mutex<Vec<(String, Value, Option<u32>)>>,
    pub saves: Mutex<Vec<(String, Value)>>,
    save_attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let registry = Self::default();
        registry.set_failing(true);
        registry
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn saves(&self) -> Vec<(String, Value)> {
        self.saves.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    /// Save calls made, including failed ones
    pub fn save_attempts(&self) -> usize {
        self.save_attempts.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ClientError::api_error(503, "registry unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for RecordingRegistry {
    async fn read(
        &self,
        endpoint: &str,
        filter: &Value,
        max_results: Option<u32>,
    ) -> Result<Vec<Value>> {
        self.check()?;
        self.reads
            .lock()
            .unwrap()
            .push((endpoint.to_string(), filter.clone(), max_results));
        Ok(vec![filter.clone()])
    }

    async fn save(&self, endpoint: &str, record: &Value) -> Result<Vec<Value>> {
        self.save_attempts.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.saves
            .lock()
            .unwrap()
            .push((endpoint.to_string(), record.clone()));
        Ok(vec![record.clone()])
    }
}
