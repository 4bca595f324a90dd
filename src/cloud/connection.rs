//! MQTT connection to the cloud platform
//!
//! Publishes snapshot events and turns inbound command messages into
//! `CloudEvent`s. The initial CONNECT must succeed; later disconnects are
//! reported and the client reconnects on the next poll. Events published
//! while disconnected are dropped, never queued.

use crate::cloud::identity::DeviceIdentity;
use crate::cloud::traits::Publisher;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, Publish, QoS, Transport};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use telemetry_shared::{broker_host, codec, event_topic, platform, Command, MetricSnapshot};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Port on which the broker expects TLS
const TLS_PORT: u16 = 8883;

/// Delay before polling again after a connection error
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

const KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Capacity of the outbound request channel
const REQUEST_CAPACITY: usize = 100;

/// Events emitted by the cloud connection
#[derive(Debug, Clone)]
pub enum CloudEvent {
    /// (Re)connected to the broker
    Connected,
    /// Connection lost
    Disconnected { reason: String },
    /// Command received from the platform
    Command(Command),
}

/// Cloneable handle to the platform connection
#[derive(Clone)]
pub struct CloudClient {
    client: AsyncClient,
    connected: Arc<AtomicBool>,
}

impl CloudClient {
    /// Whether the broker connection is currently up
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Publisher for CloudClient {
    /// Hand one event to the connection without waiting
    ///
    /// Fails while disconnected or when the request channel is full.
    async fn publish_event(&self, event: &str, snapshot: &MetricSnapshot) -> Result<()> {
        if !self.is_connected() {
            bail!("Not connected to platform, dropping {} event", event);
        }

        let payload = codec::encode_snapshot(snapshot)?;
        self.client
            .try_publish(
                event_topic(event, platform::FORMAT_JSON),
                QoS::AtMostOnce,
                false,
                payload.to_vec(),
            )
            .context("Failed to queue event")?;
        Ok(())
    }
}

/// Build the MQTT options for a device identity
pub fn mqtt_options(identity: &DeviceIdentity, port: u16) -> MqttOptions {
    let mut options = MqttOptions::new(identity.client_id(), broker_host(&identity.org), port);
    options.set_keep_alive(KEEP_ALIVE);

    if !identity.is_quickstart() {
        if let Some(token) = &identity.auth_token {
            options.set_credentials(platform::TOKEN_AUTH_USERNAME, token);
        }
    }

    if port == TLS_PORT {
        options.set_transport(Transport::tls_with_default_config());
    }

    options
}

/// Connect to the platform and start receiving commands
///
/// Returns once the broker has accepted the connection. Any failure before
/// that is returned to the caller.
pub async fn connect(
    identity: &DeviceIdentity,
    port: u16,
) -> Result<(CloudClient, mpsc::Receiver<CloudEvent>)> {
    info!("Connecting to {}:{} as {}", broker_host(&identity.org), port, identity.client_id());
    connect_with(mqtt_options(identity, port)).await
}

/// Connect with explicit MQTT options
pub async fn connect_with(
    options: MqttOptions,
) -> Result<(CloudClient, mpsc::Receiver<CloudEvent>)> {
    let (client, mut eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);

    loop {
        match eventloop
            .poll()
            .await
            .context("Failed to connect to platform")?
        {
            Event::Incoming(Packet::ConnAck(_)) => break,
            other => debug!("Connect: {:?}", other),
        }
    }

    client
        .subscribe(platform::COMMAND_FILTER, QoS::AtMostOnce)
        .await
        .context("Failed to subscribe to commands")?;

    let connected = Arc::new(AtomicBool::new(true));
    let (event_tx, event_rx) = mpsc::channel::<CloudEvent>(100);
    let loop_client = client.clone();
    let loop_connected = connected.clone();
    tokio::spawn(async move {
        event_loop(eventloop, loop_client, loop_connected, event_tx).await;
    });

    Ok((CloudClient { client, connected }, event_rx))
}

/// Drive the MQTT connection and forward inbound events
async fn event_loop(
    mut eventloop: EventLoop,
    client: AsyncClient,
    connected: Arc<AtomicBool>,
    event_tx: mpsc::Sender<CloudEvent>,
) {
    loop {
        let event = match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::Relaxed);
                // Clean sessions drop subscriptions on reconnect
                if let Err(e) = client.try_subscribe(platform::COMMAND_FILTER, QoS::AtMostOnce) {
                    error!("Failed to resubscribe to commands: {}", e);
                }
                CloudEvent::Connected
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => match command_from_publish(&publish) {
                Some(command) => CloudEvent::Command(command),
                None => continue,
            },
            Ok(_) => continue,
            Err(e) => {
                connected.store(false, Ordering::Relaxed);
                let reason = e.to_string();
                if event_tx.send(CloudEvent::Disconnected { reason }).await.is_err() {
                    break;
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        if event_tx.send(event).await.is_err() {
            break;
        }
    }

    info!("Cloud event loop stopped");
}

/// Decode a command message, logging and dropping undecodable ones
pub fn command_from_publish(publish: &Publish) -> Option<Command> {
    match codec::decode_command(&publish.topic, &publish.payload) {
        Ok(command) => Some(command),
        Err(e) => {
            warn!("Dropping message on {}: {}", publish.topic, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Instant;

    fn identity(org: &str, token: Option<&str>) -> DeviceIdentity {
        DeviceIdentity {
            org: org.into(),
            device_type: "rpi".into(),
            device_id: "dev-1".into(),
            auth_method: "token".into(),
            auth_token: token.map(String::from),
        }
    }

    #[test]
    fn test_mqtt_options_token_auth() {
        let options = mqtt_options(&identity("abc123", Some("tok")), 1883);

        assert_eq!(options.client_id(), "d:abc123:rpi:dev-1");
        assert_eq!(
            options.broker_address(),
            ("abc123.messaging.internetofthings.ibmcloud.com".to_string(), 1883)
        );
        assert_eq!(
            options.credentials(),
            Some(("use-token-auth".to_string(), "tok".to_string()))
        );
    }

    #[test]
    fn test_mqtt_options_quickstart() {
        let options = mqtt_options(&identity("quickstart", None), 1883);
        assert!(options.credentials().is_none());
    }

    #[test]
    fn test_command_from_publish() {
        let publish = Publish::new(
            "iot-2/cmd/setText/fmt/json",
            QoS::AtMostOnce,
            br#"{"text":"hi"}"#.to_vec(),
        );
        let command = command_from_publish(&publish).expect("command");
        assert_eq!(command.command, "setText");
        assert_eq!(command.field("text"), Some(&json!("hi")));
    }

    #[test]
    fn test_undecodable_publish_is_dropped() {
        let publish = Publish::new("iot-2/cmd/setText/fmt/json", QoS::AtMostOnce, b"oops".to_vec());
        assert!(command_from_publish(&publish).is_none());

        let publish = Publish::new("iot-2/evt/status/fmt/json", QoS::AtMostOnce, b"{}".to_vec());
        assert!(command_from_publish(&publish).is_none());
    }

    fn snapshot() -> MetricSnapshot {
        MetricSnapshot {
            cpu_load: 12.5,
            free_memory: 1024,
            random: 0.5,
        }
    }

    /// Client whose event loop is never polled, as while the broker is down
    fn unpolled_client(connected: bool) -> (CloudClient, EventLoop) {
        let options = MqttOptions::new("d:abc123:rpi:dev-1", "127.0.0.1", 1);
        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let client = CloudClient {
            client,
            connected: Arc::new(AtomicBool::new(connected)),
        };
        (client, eventloop)
    }

    #[tokio::test]
    async fn test_publish_never_waits_on_full_channel() {
        let (client, _eventloop) = unpolled_client(true);
        let mut queued = 0;

        for _ in 0..(REQUEST_CAPACITY * 2) {
            let started = Instant::now();
            let result = tokio::time::timeout(
                Duration::from_secs(2),
                client.publish_event(platform::EVENT_STATUS, &snapshot()),
            )
            .await
            .expect("publish blocked");
            assert!(started.elapsed() < Duration::from_secs(1));
            if result.is_ok() {
                queued += 1;
            }
        }

        assert_eq!(queued, REQUEST_CAPACITY);
    }

    #[tokio::test]
    async fn test_publish_while_disconnected_is_dropped() {
        let (client, _eventloop) = unpolled_client(false);

        for _ in 0..(REQUEST_CAPACITY + 1) {
            let result = tokio::time::timeout(
                Duration::from_secs(2),
                client.publish_event(platform::EVENT_STATUS, &snapshot()),
            )
            .await
            .expect("publish blocked");
            assert!(result.is_err());
        }

        // Nothing was queued for delivery after a reconnect
        client.connected.store(true, Ordering::Relaxed);
        for _ in 0..REQUEST_CAPACITY {
            assert!(client
                .publish_event(platform::EVENT_STATUS, &snapshot())
                .await
                .is_ok());
        }
    }

    #[tokio::test]
    async fn test_connect_failure_is_fatal() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let options = MqttOptions::new("d:abc123:rpi:dev-1", "127.0.0.1", port);
        assert!(connect_with(options).await.is_err());
    }
}
