//! [`MqttClient`] over the `rumqttc` blocking client.
//!
//! A receiver thread drives the connection, forwards incoming publishes to
//! a channel drained by [`MqttClient::try_recv`], and tracks whether the
//! broker session is up. `rumqttc` reconnects on the next poll after an
//! error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rumqttc::{Client, ClientError, Connection, Event, MqttOptions, Packet, QoS};

use crate::config::RobotConfig;
use crate::error::RobotError;
use crate::traits::{MqttClient, MqttMessage};

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connected MQTT session.
pub struct RumqttLink {
    client: Client,
    incoming: Receiver<MqttMessage>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

impl RumqttLink {
    /// Connect to the broker in `config`, waiting up to `timeout` for the
    /// broker to acknowledge.
    ///
    /// # Errors
    ///
    /// [`RobotError::Connect`] if the broker is unreachable or silent.
    pub fn connect(config: &RobotConfig, timeout: Duration) -> Result<Self, RobotError> {
        let mut options = MqttOptions::new(&config.client_id, &config.host, config.port);
        options.set_keep_alive(Duration::from_secs(u64::from(config.keep_alive_secs)));

        let (client, connection) = Client::new(options, 10);
        let (msg_tx, incoming) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let connected = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));

        {
            let connected = Arc::clone(&connected);
            let shutdown = Arc::clone(&shutdown);
            thread::Builder::new()
                .name("mqtt-recv".into())
                .spawn(move || receive_loop(connection, msg_tx, ready_tx, connected, shutdown))
                .map_err(|e| RobotError::Connect(e.to_string()))?;
        }

        let mut link = Self {
            client,
            incoming,
            connected,
            shutdown,
        };

        match ready_rx.recv_timeout(timeout) {
            Ok(Ok(())) => {
                tracing::info!("MQTT connected to {}:{}", config.host, config.port);
                Ok(link)
            }
            Ok(Err(message)) => {
                link.close();
                Err(RobotError::Connect(message))
            }
            Err(_) => {
                link.close();
                Err(RobotError::Connect(format!(
                    "no answer from {}:{} within {:?}",
                    config.host, config.port, timeout
                )))
            }
        }
    }

    /// Ask the receiver thread to exit. It is not joined: a connect attempt
    /// in progress can block it until the OS gives up on the socket.
    fn close(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if let Err(e) = self.client.try_disconnect() {
            tracing::debug!("MQTT disconnect not queued: {}", e);
        }
    }
}

impl Drop for RumqttLink {
    fn drop(&mut self) {
        self.close();
    }
}

fn receive_loop(
    mut connection: Connection,
    messages: mpsc::Sender<MqttMessage>,
    ready: mpsc::Sender<Result<(), String>>,
    connected: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
) {
    let mut ready = Some(ready);
    for event in connection.iter() {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match event {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                connected.store(true, Ordering::SeqCst);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = MqttMessage::new(publish.topic, publish.payload.to_vec());
                if messages.send(msg).is_err() {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                connected.store(false, Ordering::SeqCst);
                if let Some(ready) = ready.take() {
                    let _ = ready.send(Err(e.to_string()));
                    break;
                }
                tracing::warn!("MQTT connection error: {}", e);
                thread::sleep(RECONNECT_DELAY);
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
            }
        }
    }
    tracing::debug!("MQTT receiver exited");
}

impl MqttClient for RumqttLink {
    type Error = ClientError;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), Self::Error> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.to_vec())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), Self::Error> {
        self.client.subscribe(topic, QoS::AtLeastOnce)
    }

    fn try_recv(&mut self) -> Option<MqttMessage> {
        self.incoming.try_recv().ok()
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
