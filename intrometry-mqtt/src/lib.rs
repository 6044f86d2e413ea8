//! MQTT topic-bus [`Emitter`].
//!
//! Grounded on `original_source/pjmsg_topic/src/intrometry.cpp`, which
//! publishes ROS2 `StatisticsNames`/`StatisticsValues` messages with
//! `reliable()+transient_local()` QoS for names and `best_effort()+volatile()`
//! for values. No ROS2 pub/sub crate exists in the example pack, so this
//! substitutes MQTT via `rumqttc`, mapping that QoS intent directly:
//! names publish at QoS 1 with the retained flag set (a late subscriber gets
//! the last schema), values publish at QoS 0 without retention (lossy,
//! no replay). See `DESIGN.md`.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use intrometry::{Emitter, NamesRecord, ValuesRecord};
use rumqttc::{Client, MqttOptions, QoS};
use serde::Serialize;

/// Default broker host (spec §6), used by [`MqttEmitterBuilder::default`].
pub const DEFAULT_BROKER_HOST: &str = "localhost";
/// Default broker port (spec §6): the standard unencrypted MQTT port.
pub const DEFAULT_BROKER_PORT: u16 = 1883;
/// Default keep-alive interval (spec §6).
pub const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(30);

#[derive(Serialize)]
struct WireHeader {
    sec: i32,
    nanosec: u32,
    names_version: u32,
}

#[derive(Serialize)]
struct WireNames<'a> {
    header: WireHeader,
    names: &'a [String],
}

#[derive(Serialize)]
struct WireValues<'a> {
    header: WireHeader,
    values: &'a [f64],
}

/// Publishes records to `<topic_prefix>/<display_id>/{names,values}` on a
/// single MQTT connection shared by every source assigned to the sink.
pub struct MqttEmitter {
    client: Client,
    event_loop: Option<JoinHandle<()>>,
    topic_prefix: String,
}

impl MqttEmitter {
    /// Dials `broker_host:broker_port` and spawns the background thread that
    /// drives `rumqttc`'s synchronous event loop. `sink_id` only seeds the
    /// MQTT client id; topic naming is controlled by `topic_prefix`.
    pub fn connect(
        broker_host: &str,
        broker_port: u16,
        sink_id: &str,
        topic_prefix: impl Into<String>,
        keep_alive: Duration,
    ) -> anyhow::Result<Self> {
        let client_id = format!(
            "intrometry_{}_{}",
            intrometry::id::normalize_id(sink_id),
            intrometry::id::random_id(8)
        );
        let mut options = MqttOptions::new(client_id, broker_host, broker_port);
        options.set_keep_alive(keep_alive);

        let (client, mut connection) = Client::new(options, 256);
        let event_loop = thread::Builder::new()
            .name("intrometry-mqtt-eventloop".to_string())
            .spawn(move || {
                for notification in connection.iter() {
                    if let Err(err) = notification {
                        log::warn!("intrometry mqtt event loop stopped: {err:#}");
                        break;
                    }
                }
            })
            .context("spawning mqtt event loop thread")?;

        Ok(MqttEmitter {
            client,
            event_loop: Some(event_loop),
            topic_prefix: topic_prefix.into(),
        })
    }

    fn publish<T: Serialize>(&mut self, topic: &str, qos: QoS, retain: bool, payload: &T) -> anyhow::Result<()> {
        let data = serde_json::to_vec(payload).context("encoding mqtt payload")?;
        self.client
            .publish(topic, qos, retain, data)
            .context("publishing mqtt message")
    }
}

/// Builds an [`MqttEmitter`] with the documented defaults
/// (`DEFAULT_BROKER_HOST`, `DEFAULT_BROKER_PORT`, `DEFAULT_KEEP_ALIVE`),
/// overridable per spec §6's "config with sane defaults" requirement.
pub struct MqttEmitterBuilder {
    broker_host: String,
    broker_port: u16,
    keep_alive: Duration,
}

impl Default for MqttEmitterBuilder {
    fn default() -> Self {
        MqttEmitterBuilder {
            broker_host: DEFAULT_BROKER_HOST.to_string(),
            broker_port: DEFAULT_BROKER_PORT,
            keep_alive: DEFAULT_KEEP_ALIVE,
        }
    }
}

impl MqttEmitterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broker(mut self, host: impl Into<String>, port: u16) -> Self {
        self.broker_host = host.into();
        self.broker_port = port;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn connect(self, sink_id: &str, topic_prefix: impl Into<String>) -> anyhow::Result<MqttEmitter> {
        MqttEmitter::connect(&self.broker_host, self.broker_port, sink_id, topic_prefix, self.keep_alive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_the_documented_constants() {
        let builder = MqttEmitterBuilder::default();
        assert_eq!(builder.broker_host, DEFAULT_BROKER_HOST);
        assert_eq!(builder.broker_port, DEFAULT_BROKER_PORT);
        assert_eq!(builder.keep_alive, DEFAULT_KEEP_ALIVE);
    }

    #[test]
    fn broker_and_keep_alive_override_the_defaults() {
        let builder = MqttEmitterBuilder::new().broker("mqtt.example.org", 8883).keep_alive(Duration::from_secs(5));
        assert_eq!(builder.broker_host, "mqtt.example.org");
        assert_eq!(builder.broker_port, 8883);
        assert_eq!(builder.keep_alive, Duration::from_secs(5));
    }
}

impl Emitter for MqttEmitter {
    fn write_names(&mut self, display_id: &str, record: &NamesRecord) -> anyhow::Result<()> {
        let wire = WireNames {
            header: WireHeader { sec: record.header.sec, nanosec: record.header.nanosec, names_version: record.header.names_version },
            names: &record.names,
        };
        let topic = format!("{}/{}/names", self.topic_prefix, display_id);
        self.publish(&topic, QoS::AtLeastOnce, true, &wire)
    }

    fn write_values(&mut self, display_id: &str, record: &ValuesRecord) -> anyhow::Result<()> {
        let wire = WireValues {
            header: WireHeader { sec: record.header.sec, nanosec: record.header.nanosec, names_version: record.header.names_version },
            values: &record.values,
        };
        let topic = format!("{}/{}/values", self.topic_prefix, display_id);
        self.publish(&topic, QoS::AtMostOnce, false, &wire)
    }

    fn close(&mut self) -> anyhow::Result<()> {
        self.client.disconnect().context("disconnecting mqtt client")
    }
}

impl Drop for MqttEmitter {
    fn drop(&mut self) {
        let _ = self.client.disconnect();
        if let Some(handle) = self.event_loop.take() {
            let _ = handle.join();
        }
    }
}
