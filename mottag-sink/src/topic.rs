//! Topic-publish (MQTT) sink
//!
//! Publishes one message per antenna per tick. The rumqttc event loop is
//! polled on a background task which also owns reconnection.

use std::time::Duration;

use async_trait::async_trait;
use mottag_common::{Error, TopicConfig};
use mottag_sim::TickSample;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::payload::topic_messages;
use crate::Sink;

/// Request queue depth between the client and the event loop.
const CLIENT_CAPACITY: usize = 32;

/// Pause after a connection error before the event loop retries.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// How long `close` waits for the event loop to flush the disconnect.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// MQTT sink backed by `rumqttc`.
pub struct TopicSink {
    client: AsyncClient,
    topic: String,
    tag_addr: String,
    event_loop: Option<JoinHandle<()>>,
}

impl TopicSink {
    /// Creates the client and starts the event loop task.
    ///
    /// Must be called from within a tokio runtime. Connection happens in the
    /// background; failures are logged and retried there.
    pub fn new(config: &TopicConfig) -> Self {
        let mut options = MqttOptions::new(&config.client_id, &config.broker, config.port);
        options.set_keep_alive(Duration::from_secs(config.keep_alive_s));
        if let Some((username, password)) = config.credentials() {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, CLIENT_CAPACITY);
        info!(
            "Topic sink publishing to {}:{} on '{}'",
            config.broker, config.port, config.topic
        );

        Self {
            client,
            topic: config.topic.clone(),
            tag_addr: config.tag_addr.clone(),
            event_loop: Some(tokio::spawn(drive_event_loop(event_loop))),
        }
    }
}

async fn drive_event_loop(mut event_loop: EventLoop) {
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                info!("Connected to broker: {:?}", ack.code);
            }
            Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) => {
                debug!("Disconnect sent");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                warn!("Broker connection error: {}", e);
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        }
    }
}

#[async_trait]
impl Sink for TopicSink {
    fn name(&self) -> &str {
        "topic"
    }

    async fn publish(&mut self, sample: &TickSample) -> Result<(), Error> {
        for message in topic_messages(&sample.readings, &self.tag_addr, sample.timestamp_ms) {
            let payload = serde_json::to_vec(&message)?;
            self.client
                .publish(&self.topic, QoS::AtMostOnce, false, payload)
                .await
                .map_err(|e| Error::SinkTransport(format!("publish {}: {e}", message.aid)))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<(), Error> {
        let result = self
            .client
            .try_disconnect()
            .map_err(|e| Error::SinkTransport(format!("disconnect: {e}")));

        if let Some(mut handle) = self.event_loop.take() {
            if tokio::time::timeout(CLOSE_TIMEOUT, &mut handle).await.is_err() {
                debug!("Event loop did not stop in time, aborting");
                handle.abort();
            }
        }
        result
    }
}

impl Drop for TopicSink {
    fn drop(&mut self) {
        if let Some(handle) = self.event_loop.take() {
            handle.abort();
        }
    }
}
