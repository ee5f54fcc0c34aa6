use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::events::{EventDetails, Stage};

/// Per invocation state: who asked, and how long we are allowed to run.
#[derive(Clone, Debug)]
pub struct InvocationContext {
    request_id: String,
    stack_id: String,
    logical_resource_id: String,
    request_type: String,
    deadline: Instant,
    cancellation_token: CancellationToken,
}

impl InvocationContext {
    pub fn new(
        request_id: String,
        stack_id: String,
        logical_resource_id: String,
        request_type: String,
        timeout: Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        InvocationContext {
            request_id,
            stack_id,
            logical_resource_id,
            request_type,
            deadline: Instant::now() + timeout,
            cancellation_token,
        }
    }

    pub fn request_id(&self) -> &str {
        self.request_id.as_str()
    }

    pub fn stack_id(&self) -> &str {
        self.stack_id.as_str()
    }

    pub fn logical_resource_id(&self) -> &str {
        self.logical_resource_id.as_str()
    }

    pub fn request_type(&self) -> &str {
        self.request_type.as_str()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn remaining_time(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn get_event_details(&self, stage: Stage) -> EventDetails {
        EventDetails::new(
            self.request_id.clone(),
            self.stack_id.clone(),
            self.logical_resource_id.clone(),
            self.request_type.clone(),
            stage,
        )
    }

    #[cfg(test)]
    pub fn for_tests(timeout: Duration) -> Self {
        InvocationContext::new(
            "request-id".to_string(),
            "stack-id".to_string(),
            "logical-id".to_string(),
            "Create".to_string(),
            timeout,
            CancellationToken::new(),
        )
    }
}
