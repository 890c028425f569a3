//! Request logging behavior.

use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{Behavior, Next};
use crate::error::DispatchError;
use crate::message::{BoxedResponse, Envelope};

/// Logs every request on the way in and its outcome on the way out.
///
/// Never alters the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBehavior;

impl LoggingBehavior {
    /// Creates a new logging behavior.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Behavior for LoggingBehavior {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn handle(&self, envelope: Envelope, next: Next) -> Result<BoxedResponse, DispatchError> {
        let name = envelope.name();
        let kind = envelope.kind();
        let started = Instant::now();

        info!(request = name, kind = %kind, "Handling request");

        let result = next.run(envelope).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!(request = name, elapsed_ms, "Request handled"),
            Err(e) => warn!(
                request = name,
                elapsed_ms,
                error_kind = ?e.kind(),
                error = %e,
                "Request failed"
            ),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BoxError, ErrorKind};
    use crate::handler::{BoxedHandler, command_handler, handler_fn};
    use crate::message::{Command, MessageMeta, Request};
    use crate::pipeline::{BoxedBehavior, assemble};
    use std::io;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct Restock {
        units: u32,
    }

    impl Request for Restock {
        type Response = u32;
        const NAME: &'static str = "Restock";
    }

    impl Command for Restock {}

    async fn dispatch(handler: BoxedHandler, units: u32) -> Result<BoxedResponse, DispatchError> {
        let behaviors: Vec<BoxedBehavior> = vec![Arc::new(LoggingBehavior::new())];
        assemble(handler, &behaviors, &MessageMeta::command::<Restock>())
            .oneshot(Envelope::command(Restock { units }, CancellationToken::new()))
            .await
    }

    #[tokio::test]
    async fn test_success_passes_through_unchanged() {
        let handler = command_handler::<Restock, _>(handler_fn(
            |restock: Restock, _: CancellationToken| async move {
                Ok::<_, BoxError>(restock.units * 2)
            },
        ));

        let response = dispatch(handler, 21).await.unwrap();
        assert_eq!(*response.downcast::<u32>().unwrap(), 42);
    }

    #[tokio::test]
    async fn test_failure_passes_through_unchanged() {
        let handler = command_handler::<Restock, _>(handler_fn(
            |_: Restock, _: CancellationToken| async move {
                Err::<u32, BoxError>(io::Error::other("warehouse offline").into())
            },
        ));

        let err = dispatch(handler, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Handler);
        assert_eq!(err.to_string(), "warehouse offline");
        assert!(err.handler_error::<io::Error>().is_some());
    }
}
