use crate::events::ProviderEvent;
use tracing;

pub trait Logger: Send + Sync {
    fn log(&self, event: ProviderEvent);
    fn clone_dyn(&self) -> Box<dyn Logger>;
}

impl Clone for Box<dyn Logger> {
    fn clone(&self) -> Self {
        self.clone_dyn()
    }
}

#[derive(Clone)]
pub struct StdIoLogger {}

impl StdIoLogger {
    pub fn new() -> StdIoLogger {
        StdIoLogger {}
    }
}

impl Default for StdIoLogger {
    fn default() -> Self {
        StdIoLogger::new()
    }
}

impl Logger for StdIoLogger {
    fn log(&self, event: ProviderEvent) {
        let event_details = event.get_details();

        tracing::span!(
            tracing::Level::INFO,
            "std_io_logger",
            request_id = event_details.request_id(),
            stack_id = event_details.stack_id(),
            logical_resource_id = event_details.logical_resource_id(),
            request_type = event_details.request_type(),
            stage = event_details.stage().to_string().as_str(),
        )
        .in_scope(|| {
            match &event {
                ProviderEvent::Debug(..) => debug!("{}", event.message()),
                ProviderEvent::Info(..) => info!("{}", event.message()),
                ProviderEvent::Warning(..) => warn!("{}", event.message()),
                ProviderEvent::Error(_, err) => error!(tag = %err.tag(), "{}", event.message()),
            };
        });
    }

    fn clone_dyn(&self) -> Box<dyn Logger> {
        Box::new(self.clone())
    }
}
