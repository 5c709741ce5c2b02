use async_trait::async_trait;
use std::sync::Mutex;
use tracing::warn;

/// Recoverable-warning channel. Header misses, unmatched locations and merge
/// anomalies go here; reporting never blocks or fails the pipeline.
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn report(&self, message: &str);
}

/// Production sink: structured warning log.
pub struct TracingSink;

#[async_trait]
impl DiagnosticsSink for TracingSink {
    async fn report(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Collects messages in memory; used by tests and for end-of-run summaries.
#[derive(Default)]
pub struct CollectingSink {
    messages: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl DiagnosticsSink for CollectingSink {
    async fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
