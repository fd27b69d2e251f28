//! Socket Mode session loop.
//!
//! A session lasts from `open` until the server closes the stream or the
//! transport fails. Envelopes are acknowledged before they are handed to the
//! dispatcher, each on its own task; a session only ends once its tasks have
//! finished.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::events::{EventContext, EventDispatcher, HandlerResult, SlackEnvelope};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("could not open socket mode session: {0}")]
    Open(String),
    #[error("socket mode receive failed: {0}")]
    Receive(String),
    #[error("envelope `{envelope_id}` could not be acknowledged: {reason}")]
    Acknowledge { envelope_id: String, reason: String },
}

/// Exponential delay between reconnects. `max_retries` bounds consecutive
/// failed sessions; a session that delivered envelopes starts the count over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnecting after `failures` consecutive failed sessions.
    fn delay(&self, failures: u32) -> Duration {
        let factor = 2_u32.saturating_pow(failures.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn open(&self) -> Result<(), TransportError>;
    /// `None` once the server has closed the session.
    async fn recv(&self) -> Result<Option<SlackEnvelope>, TransportError>;
    async fn ack(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn close(&self);
}

/// Session that opens and is closed by the server straight away.
#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn open(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv(&self) -> Result<Option<SlackEnvelope>, TransportError> {
        Ok(None)
    }

    async fn ack(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {}
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sessions: u32,
    pub dispatched: u64,
}

struct SessionReport {
    dispatched: u64,
    outcome: Result<(), TransportError>,
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<EventDispatcher>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, policy }
    }

    /// Runs sessions until the server closes one or reconnects are used up.
    /// Giving up is logged rather than returned as an error.
    pub async fn start(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut failures = 0_u32;

        loop {
            summary.sessions += 1;
            let report = self.session().await;
            summary.dispatched += report.dispatched;

            let Err(error) = report.outcome else {
                info!(
                    event_name = "ingress.slack.session_closed",
                    sessions = summary.sessions,
                    dispatched = summary.dispatched,
                    "socket mode session closed by server"
                );
                return summary;
            };

            failures = if report.dispatched > 0 { 1 } else { failures + 1 };
            if failures > self.policy.max_retries {
                warn!(
                    event_name = "ingress.slack.reconnect_exhausted",
                    failures,
                    error = %error,
                    "giving up on socket mode"
                );
                return summary;
            }

            let delay = self.policy.delay(failures);
            warn!(
                event_name = "ingress.slack.session_failed",
                failures,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "socket mode session failed; reconnecting"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn session(&self) -> SessionReport {
        if let Err(error) = self.transport.open().await {
            return SessionReport { dispatched: 0, outcome: Err(error) };
        }
        debug!(event_name = "ingress.slack.session_opened", "socket mode session opened");

        let mut tasks = JoinSet::new();
        let mut dispatched = 0;
        let outcome = loop {
            let envelope = match self.transport.recv().await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break Ok(()),
                Err(error) => break Err(error),
            };
            // Slack redelivers unacknowledged envelopes on the next session.
            if let Err(error) = self.transport.ack(&envelope.envelope_id).await {
                break Err(error);
            }

            dispatched += 1;
            tasks.spawn(dispatch(Arc::clone(&self.dispatcher), envelope));
            while let Some(finished) = tasks.try_join_next() {
                log_finished(finished);
            }
        };

        self.transport.close().await;
        while let Some(finished) = tasks.join_next().await {
            log_finished(finished);
        }
        SessionReport { dispatched, outcome }
    }
}

async fn dispatch(
    dispatcher: Arc<EventDispatcher>,
    envelope: SlackEnvelope,
) -> (String, HandlerResult) {
    let context = EventContext { correlation_id: envelope.envelope_id.clone() };
    let (user_id, channel_id) = envelope.event.origin().unwrap_or(("unknown", "unknown"));
    debug!(
        event_name = "ingress.slack.envelope_received",
        correlation_id = %context.correlation_id,
        event_type = ?envelope.event.event_type(),
        user_id,
        channel_id,
        "dispatching slack envelope"
    );

    let result = dispatcher.dispatch(&envelope, &context).await;
    (context.correlation_id, result)
}

fn log_finished(finished: Result<(String, HandlerResult), JoinError>) {
    match finished {
        Ok((correlation_id, HandlerResult::Processed(outcome))) => debug!(
            event_name = "ingress.slack.dispatched",
            correlation_id = %correlation_id,
            outcome = ?outcome,
            "slack envelope handled"
        ),
        Ok((correlation_id, HandlerResult::Ignored)) => debug!(
            event_name = "ingress.slack.ignored",
            correlation_id = %correlation_id,
            "no handler for slack envelope"
        ),
        Err(error) => warn!(
            event_name = "ingress.slack.dispatch_aborted",
            error = %error,
            "event dispatch task did not finish"
        ),
    }
}
