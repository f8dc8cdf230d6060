//! Mock summarizer for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use canvass_core::summary::{Summarizer, SummaryRequest};

/// A mock summarizer for exercising the engine without real API calls.
pub struct MockSummarizer {
    reply: String,
    call_count: AtomicU32,
    last_request: Mutex<Option<SummaryRequest>>,
}

impl MockSummarizer {
    /// Create a mock that always returns the same insight.
    pub fn with_fixed_reply(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Get the number of calls made to this summarizer.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this summarizer.
    pub fn last_request(&self) -> Option<SummaryRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn summarize(&self, request: &SummaryRequest) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());
        Ok(self.reply.clone())
    }
}
