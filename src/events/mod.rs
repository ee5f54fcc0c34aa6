use crate::errors::ProviderError;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone)]
/// ProviderEvent: represents an event happening while handling an invocation.
pub enum ProviderEvent {
    /// Debug: represents a debug message event.
    Debug(EventDetails, EventMessage),
    /// Info: represents an info message event.
    Info(EventDetails, EventMessage),
    /// Warning: represents a warning message event.
    Warning(EventDetails, EventMessage),
    /// Error: represents an error event.
    Error(EventDetails, ProviderError),
}

impl ProviderEvent {
    /// Returns event details.
    pub fn get_details(&self) -> &EventDetails {
        match self {
            ProviderEvent::Debug(details, _message) => details,
            ProviderEvent::Info(details, _message) => details,
            ProviderEvent::Warning(details, _message) => details,
            ProviderEvent::Error(details, _error) => details,
        }
    }

    /// Returns event message.
    pub fn message(&self) -> String {
        match self {
            ProviderEvent::Debug(_details, message) => message.message(),
            ProviderEvent::Info(_details, message) => message.message(),
            ProviderEvent::Warning(_details, message) => message.message(),
            ProviderEvent::Error(_details, error) => format!("{} ({})", error, error.tag()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// EventMessage: represents an event message.
pub struct EventMessage {
    message: String,
    // raw tool output, kept apart so it can be filtered out
    details: Option<String>,
}

impl EventMessage {
    pub fn new(message: String, details: Option<String>) -> Self {
        EventMessage { message, details }
    }

    pub fn new_from_safe(message: String) -> Self {
        EventMessage { message, details: None }
    }

    pub fn message(&self) -> String {
        match &self.details {
            None => self.message.to_string(),
            Some(details) => format!("{} / Full details: {}", self.message, details),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Stage: which step of the invocation emitted the event.
pub enum Stage {
    Dispatch,
    Validate,
    Credentials,
    FetchSource,
    PushTarget,
    DeleteTarget,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Stage::Dispatch => "dispatch",
            Stage::Validate => "validate",
            Stage::Credentials => "credentials",
            Stage::FetchSource => "fetch-source",
            Stage::PushTarget => "push-target",
            Stage::DeleteTarget => "delete-target",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// EventDetails: the invocation an event belongs to.
pub struct EventDetails {
    request_id: String,
    stack_id: String,
    logical_resource_id: String,
    request_type: String,
    stage: Stage,
}

impl EventDetails {
    pub fn new(
        request_id: String,
        stack_id: String,
        logical_resource_id: String,
        request_type: String,
        stage: Stage,
    ) -> Self {
        EventDetails {
            request_id,
            stack_id,
            logical_resource_id,
            request_type,
            stage,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    pub fn logical_resource_id(&self) -> &str {
        &self.logical_resource_id
    }

    pub fn request_type(&self) -> &str {
        &self.request_type
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }
}
