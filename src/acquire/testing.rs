use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::LookupError;
use crate::fetch::{LookupResult, RecordSource};
use crate::records::StreamerRecord;

/// Record source driven by per-identifier outcome scripts. Identifiers without
/// a script (or with an exhausted one) succeed.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    outcomes: Mutex<HashMap<String, VecDeque<bool>>>,
    latency: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    panic_on: Option<String>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `failures` times, then succeed.
    pub fn failing(self, identifier: &str, failures: usize) -> Self {
        let script = std::iter::repeat(false)
            .take(failures)
            .chain(std::iter::once(true))
            .collect();
        self.outcomes
            .lock()
            .unwrap()
            .insert(identifier.to_string(), script);
        self
    }

    pub fn always_failing(self, identifier: &str) -> Self {
        self.failing(identifier, 16)
    }

    pub fn with_latency(mut self, identifier: &str, millis: u64) -> Self {
        self.latency
            .insert(identifier.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn panicking_on(mut self, identifier: &str) -> Self {
        self.panic_on = Some(identifier.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(String, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, identifier: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == identifier)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

pub(crate) fn record_for(identifier: &str) -> StreamerRecord {
    let mut record = StreamerRecord::new(identifier);
    record.display_name = Some(identifier.to_string());
    record
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn fetch_record(&self, identifier: &str) -> LookupResult {
        if self.panic_on.as_deref() == Some(identifier) {
            panic!("scripted panic for {identifier}");
        }

        self.calls
            .lock()
            .unwrap()
            .push((identifier.to_string(), Instant::now()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(latency) = self.latency.get(identifier) {
            tokio::time::sleep(*latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let succeed = self
            .outcomes
            .lock()
            .unwrap()
            .get_mut(identifier)
            .and_then(|script| script.pop_front())
            .unwrap_or(true);

        if succeed {
            Ok(record_for(identifier))
        } else {
            Err(LookupError::Status {
                identifier: identifier.to_string(),
                status: reqwest::StatusCode::TOO_MANY_REQUESTS,
            })
        }
    }
}
