//! Container-file [`Emitter`] backed by the `mcap` crate.
//!
//! Grounded on `original_source/pjmsg_mcap/src/intrometry.cpp`: one file per
//! sink, two channels per emitted source (`<prefix>/names`, `<prefix>/values`),
//! file named `<normalized_id>[_<random8>]_<timestamp>.mcap`. The original
//! serializes ROS2 `StatisticsNames`/`StatisticsValues` messages via fastcdr;
//! this crate has no ROS2 message definitions to draw on, so records are
//! JSON-encoded instead (a substitution, not a divergence in shape) — see
//! `DESIGN.md`.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use intrometry::{Emitter, NamesRecord, ValuesRecord};
use mcap::{Channel, Message, Schema, Writer};
use serde::Serialize;

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

struct SourceChannels {
    names: u16,
    values: u16,
    sequence: u32,
}

/// Writes every assigned source's records into a single `.mcap` file.
///
/// Opens the file lazily on first use (via the `Sink` emitter factory, per
/// spec §6), so construction failures surface through `Sink::initialize`
/// rather than panicking.
pub struct McapEmitter {
    writer: Writer<'static, BufWriter<File>>,
    schema_names: Arc<Schema<'static>>,
    schema_values: Arc<Schema<'static>>,
    topic_prefix: String,
    channels: HashMap<String, SourceChannels>,
    closed: bool,
}

impl McapEmitter {
    /// Creates `<directory>/<normalized_id>[_<random8>]_<YYYYMMDD_HHMMSS>.mcap`,
    /// creating `directory` if it doesn't exist. `topic_prefix` namespaces the
    /// per-source channel names, e.g. `intrometry/<id>`.
    pub fn create(directory: impl AsRef<Path>, sink_id: &str, topic_prefix: impl Into<String>) -> anyhow::Result<Self> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)
            .with_context(|| format!("creating directory {}", directory.display()))?;

        let normalized = intrometry::id::normalize_id(sink_id);
        let stem = if normalized.is_empty() {
            intrometry::id::random_id(8)
        } else {
            format!("{normalized}_{}", intrometry::id::random_id(8))
        };
        let filename = format!("{stem}_{}.mcap", intrometry::clock::date_stamp());
        let path: PathBuf = directory.join(filename);

        let file = File::create(&path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = Writer::new(BufWriter::new(file)).context("opening mcap writer")?;

        let schema_names = Arc::new(Schema {
            name: "intrometry.NamesRecord".to_string(),
            encoding: "jsonschema".to_string(),
            data: Cow::Borrowed(&[]),
        });
        let schema_values = Arc::new(Schema {
            name: "intrometry.ValuesRecord".to_string(),
            encoding: "jsonschema".to_string(),
            data: Cow::Borrowed(&[]),
        });
        writer.add_schema(&schema_names).context("registering names schema")?;
        writer.add_schema(&schema_values).context("registering values schema")?;

        Ok(McapEmitter {
            writer,
            schema_names,
            schema_values,
            topic_prefix: topic_prefix.into(),
            channels: HashMap::new(),
            closed: false,
        })
    }

    fn channels_for(&mut self, display_id: &str) -> anyhow::Result<&mut SourceChannels> {
        if !self.channels.contains_key(display_id) {
            let names_channel = Channel {
                topic: format!("{}/{}/names", self.topic_prefix, display_id),
                schema: Some(Arc::clone(&self.schema_names)),
                message_encoding: "json".to_string(),
                metadata: BTreeMap::new(),
            };
            let values_channel = Channel {
                topic: format!("{}/{}/values", self.topic_prefix, display_id),
                schema: Some(Arc::clone(&self.schema_values)),
                message_encoding: "json".to_string(),
                metadata: BTreeMap::new(),
            };
            let names_id = self.writer.add_channel(&names_channel).context("registering names channel")?;
            let values_id = self.writer.add_channel(&values_channel).context("registering values channel")?;
            self.channels.insert(
                display_id.to_string(),
                SourceChannels { names: names_id, values: values_id, sequence: 0 },
            );
        }
        Ok(self.channels.get_mut(display_id).expect("just inserted"))
    }
}

impl Emitter for McapEmitter {
    fn write_names(&mut self, display_id: &str, record: &NamesRecord) -> anyhow::Result<()> {
        let wire = WireNames {
            header: WireHeader { sec: record.header.sec, nanosec: record.header.nanosec, names_version: record.header.names_version },
            names: &record.names,
        };
        let data = serde_json::to_vec(&wire).context("encoding names record")?;
        let channel_id = self.channels_for(display_id)?.names;
        let sequence = {
            let channels = self.channels_for(display_id)?;
            channels.sequence += 1;
            channels.sequence
        };
        let log_time = intrometry::clock::now_nanos();
        self.writer
            .write(&Message {
                channel_id,
                sequence,
                log_time,
                publish_time: log_time,
                data: Cow::Owned(data),
            })
            .context("writing names message")
    }

    fn write_values(&mut self, display_id: &str, record: &ValuesRecord) -> anyhow::Result<()> {
        let wire = WireValues {
            header: WireHeader { sec: record.header.sec, nanosec: record.header.nanosec, names_version: record.header.names_version },
            values: &record.values,
        };
        let data = serde_json::to_vec(&wire).context("encoding values record")?;
        let channel_id = self.channels_for(display_id)?.values;
        let sequence = {
            let channels = self.channels_for(display_id)?;
            channels.sequence += 1;
            channels.sequence
        };
        let log_time = intrometry::clock::now_nanos();
        self.writer
            .write(&Message {
                channel_id,
                sequence,
                log_time,
                publish_time: log_time,
                data: Cow::Owned(data),
            })
            .context("writing values message")
    }

    /// Writes the mcap footer/summary and flushes the file. Idempotent: a
    /// second call (from the drain loop's clean-exit path, say, after the
    /// `Drop` impl already ran) is a no-op rather than an error.
    fn close(&mut self) -> anyhow::Result<()> {
        if self.closed {
            return Ok(());
        }
        self.writer.finish().context("finalizing mcap file")?;
        self.closed = true;
        Ok(())
    }
}

impl Drop for McapEmitter {
    fn drop(&mut self) {
        if let Err(err) = Emitter::close(self) {
            log::warn!("intrometry mcap emitter: error finalizing file on drop: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_opens_a_file_under_the_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = McapEmitter::create(dir.path(), "demo sink", "intrometry/demo_sink");
        assert!(emitter.is_ok());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let name = entries[0].as_ref().unwrap().file_name();
        assert!(name.to_string_lossy().starts_with("demo_sink_"));
        assert!(name.to_string_lossy().ends_with(".mcap"));
    }

    #[test]
    fn empty_id_falls_back_to_a_random_stem() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = McapEmitter::create(dir.path(), "", "intrometry");
        assert!(emitter.is_ok());
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }
}
