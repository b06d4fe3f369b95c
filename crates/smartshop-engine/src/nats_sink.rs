//! NATS sink for the engine.
//!
//! [`NatsSink`] implements [`Sink`] by publishing each payload as JSON on
//! `<subject>.<session_id>`, where `<subject>` is the prefix configured for
//! the payload's topic. Session-keyed subjects keep every event of one
//! session on one subject.
//!
//! # Sync/Async Bridge
//!
//! [`Sink::emit`] is synchronous. It encodes the record and queues it on an
//! unbounded channel; a single forwarder task drains the channel and
//! publishes in queue order, so subscribers see events in emission order.
//! The forwarder also flushes the client every `flush_interval_secs`.
//! Delivery failures are logged by the forwarder and never reach the tick
//! loop.
//!
//! [`NatsSink::close`] closes the channel, waits for the forwarder to
//! publish everything still queued and only then flushes, so the
//! check-outs of the draining tick are on the wire before the process
//! exits.

use std::future::Future;
use std::time::Duration;

use async_nats::{ConnectOptions, Event};
use smartshop_core::config::NatsConfig;
use smartshop_core::sink::Sink;
use smartshop_types::{Payload, Topic};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, SinkError};

/// Encode one record into its subject and JSON body.
///
/// # Errors
///
/// Returns [`SinkError::ShapeMismatch`] if the payload body does not belong
/// on `topic`, or [`SinkError::Serialize`] if JSON encoding fails.
pub fn encode(
    topic: Topic,
    key: &str,
    payload: &Payload,
    config: &NatsConfig,
) -> Result<(String, Vec<u8>), SinkError> {
    if !payload.matches_topic(topic) {
        return Err(SinkError::ShapeMismatch { topic });
    }
    let subject = format!("{}.{key}", config.subject(topic));
    let body = serde_json::to_vec(payload)?;
    Ok((subject, body))
}

/// Transport the forwarder publishes through.
///
/// Implemented for [`async_nats::Client`]; tests substitute an in-memory
/// publisher.
pub trait Publisher: Send + 'static {
    /// Publish one message.
    fn publish(
        &self,
        subject: String,
        body: Vec<u8>,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    /// Flush every buffered message to the server.
    fn flush(&self) -> impl Future<Output = Result<(), SinkError>> + Send;
}

impl Publisher for async_nats::Client {
    async fn publish(&self, subject: String, body: Vec<u8>) -> Result<(), SinkError> {
        Self::publish(self, subject, body.into())
            .await
            .map_err(|e| SinkError::Transport {
                message: e.to_string(),
            })
    }

    async fn flush(&self) -> Result<(), SinkError> {
        Self::flush(self).await.map_err(|e| SinkError::Transport {
            message: e.to_string(),
        })
    }
}

/// One encoded record waiting for the forwarder.
#[derive(Debug)]
struct Outbound {
    subject: String,
    body: Vec<u8>,
}

/// A sink that publishes through a single ordered forwarder task.
pub struct NatsSink<P: Publisher = async_nats::Client> {
    config: NatsConfig,
    outbound: mpsc::UnboundedSender<Outbound>,
    forwarder: JoinHandle<P>,
}

impl NatsSink {
    /// Connect to the server named in `config`.
    ///
    /// Connection state changes are logged from the client's event callback.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the connection fails.
    pub async fn connect(config: NatsConfig) -> Result<Self, EngineError> {
        let client = ConnectOptions::new()
            .event_callback(|event| async move { log_connection_event(&event) })
            .connect(config.url.as_str())
            .await
            .map_err(|e| EngineError::Nats {
                message: format!("failed to connect to NATS at {}: {e}", config.url),
            })?;
        Ok(Self::with_publisher(client, config))
    }
}

impl<P: Publisher> NatsSink<P> {
    /// Start the forwarder task over `publisher`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_publisher(publisher: P, config: NatsConfig) -> Self {
        let (outbound, queue) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward(publisher, queue, config.flush_interval()));
        Self {
            config,
            outbound,
            forwarder,
        }
    }

    /// Publish everything still queued, then flush the client.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Nats`] if the forwarder task failed or the
    /// final flush fails.
    pub async fn close(self) -> Result<(), EngineError> {
        let Self {
            outbound,
            forwarder,
            ..
        } = self;
        drop(outbound);

        let publisher = forwarder.await.map_err(|e| EngineError::Nats {
            message: format!("forwarder task failed: {e}"),
        })?;
        publisher.flush().await.map_err(|e| EngineError::Nats {
            message: format!("flush failed: {e}"),
        })
    }
}

impl<P: Publisher> Sink for NatsSink<P> {
    fn emit(&mut self, topic: Topic, key: &str, payload: &Payload) {
        match encode(topic, key, payload, &self.config) {
            Ok((subject, body)) => {
                if self.outbound.send(Outbound { subject, body }).is_err() {
                    error!(topic = %topic, key, "Forwarder stopped, record discarded");
                }
            }
            Err(e) => {
                error!(topic = %topic, key, error = %e, "Record discarded");
            }
        }
    }
}

impl<P: Publisher> std::fmt::Debug for NatsSink<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsSink")
            .field("url", &self.config.url)
            .field("forwarder_finished", &self.forwarder.is_finished())
            .finish_non_exhaustive()
    }
}

/// Publish queued records in order until the channel closes.
///
/// Returns the publisher so the caller can run the final flush.
async fn forward<P: Publisher>(
    publisher: P,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    flush_interval: Duration,
) -> P {
    let mut next_flush = Instant::now().checked_add(flush_interval);
    while let Some(Outbound { subject, body }) = queue.recv().await {
        if let Err(e) = publisher.publish(subject.clone(), body).await {
            warn!(subject = subject, error = %e, "Message delivery failed");
        }

        let now = Instant::now();
        if next_flush.is_some_and(|at| now >= at) {
            if let Err(e) = publisher.flush().await {
                warn!(error = %e, "Periodic NATS flush failed");
            }
            next_flush = now.checked_add(flush_interval);
        }
    }
    publisher
}

fn log_connection_event(event: &Event) {
    match event {
        Event::Connected => info!("NATS connected"),
        Event::Disconnected => warn!("NATS disconnected"),
        Event::LameDuckMode => warn!("NATS server entered lame duck mode"),
        other => debug!(event = %other, "NATS client event"),
    }
}
