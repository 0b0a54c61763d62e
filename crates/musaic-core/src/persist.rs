//! JSON persistence for corpora and mosaics.
//!
//! A persisted object is written as a snapshot: a plain serde struct tagged
//! with a `kind` and a format `version`. Portable snapshots embed the source
//! samples; non-portable ones only record paths and sample rates, and the
//! audio is loaded through an [`AudioLoader`](crate::audio::AudioLoader) when
//! a mosaic is rendered.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::audio::{SourceAudio, SourceFile};
use crate::error::{CoreError, CoreResult};

/// Snapshot format version written by this crate.
pub const SNAPSHOT_VERSION: u32 = 1;

/// An object that can be written to and restored from a JSON snapshot.
pub trait Persistable: Sized {
    /// Serializable form of the object.
    type Snapshot: Serialize + DeserializeOwned;

    /// Value of the snapshot's `kind` field.
    const KIND: &'static str;

    /// Captures the object; `portable` embeds source samples.
    ///
    /// # Errors
    /// `InvalidInput` if `portable` is set but a source is still deferred.
    fn serialize(&self, portable: bool) -> CoreResult<Self::Snapshot>;

    /// Restores the object from a snapshot, validating its structure.
    fn preload(snapshot: Self::Snapshot) -> CoreResult<Self>;

    /// Human-readable overview of the object.
    fn summarize(&self) -> Summary;

    /// Serializes the object to a JSON string.
    fn to_json(&self, portable: bool) -> CoreResult<String> {
        Ok(serde_json::to_string(&self.serialize(portable)?)?)
    }

    /// Restores the object from a JSON string.
    fn from_json(json: &str) -> CoreResult<Self> {
        let header: SnapshotHeader = serde_json::from_str(json)?;
        header.check(Self::KIND)?;
        Self::preload(serde_json::from_str(json)?)
    }

    /// Writes the object to `path`.
    fn write_json(&self, path: &Path, portable: bool) -> CoreResult<()> {
        let snapshot = self.serialize(portable)?;
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut writer, &snapshot)?;
        writer.flush()?;
        info!(kind = Self::KIND, path = %path.display(), portable, "wrote snapshot");
        Ok(())
    }

    /// Reads an object from `path`.
    fn read_json(path: &Path) -> CoreResult<Self> {
        let value: serde_json::Value =
            serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let header = SnapshotHeader::deserialize(&value)?;
        header.check(Self::KIND)?;
        let object = Self::preload(serde_json::from_value(value)?)?;
        info!(kind = Self::KIND, path = %path.display(), "read snapshot");
        Ok(object)
    }
}

/// The fields every snapshot starts with.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotHeader {
    /// Object kind (`"corpus"` or `"mosaic"`).
    #[serde(default)]
    pub kind: Option<String>,
    /// Format version.
    #[serde(default)]
    pub version: Option<u32>,
}

impl SnapshotHeader {
    /// Reads just the header of a JSON snapshot.
    pub fn peek(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Checks that the snapshot holds a `kind` object of a supported version.
    pub fn check(&self, kind: &str) -> CoreResult<()> {
        match self.kind.as_deref() {
            Some(found) if found == kind => {}
            Some(found) => {
                return Err(CoreError::invalid_input(format!(
                    "snapshot holds a {}, not a {}",
                    found, kind
                )))
            }
            None => return Err(CoreError::invalid_input("not a musaic snapshot")),
        }
        match self.version {
            Some(SNAPSHOT_VERSION) => Ok(()),
            Some(other) => Err(CoreError::invalid_input(format!(
                "unsupported snapshot version {} (expected {})",
                other, SNAPSHOT_VERSION
            ))),
            None => Err(CoreError::invalid_input("snapshot has no version")),
        }
    }
}

/// Persisted form of a [`SourceFile`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSnapshot {
    /// Path relative to the owning source root.
    pub path: PathBuf,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
    /// Embedded mono samples of portable snapshots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<Vec<f32>>,
}

impl SourceSnapshot {
    /// Captures a source, embedding its samples when `portable` is set.
    ///
    /// A deferred source cannot be embedded; load it first with
    /// [`Corpus::embedded`](crate::corpus::Corpus::embedded) or
    /// [`Mosaic::embedded`](crate::mosaic::Mosaic::embedded).
    pub fn capture(source: &SourceFile, portable: bool) -> CoreResult<Self> {
        let samples = match (&source.audio, portable) {
            (SourceAudio::Loaded(samples), true) => Some(samples.to_vec()),
            (SourceAudio::Deferred, true) => {
                return Err(CoreError::invalid_input(format!(
                    "source '{}' is not loaded and cannot be embedded in a portable snapshot",
                    source.path.display()
                )))
            }
            (_, false) => None,
        };
        Ok(Self {
            path: source.path.clone(),
            sample_rate: source.sample_rate,
            samples,
        })
    }

    /// Restores the source; missing samples stay deferred.
    pub fn restore(self) -> CoreResult<SourceFile> {
        if self.sample_rate == 0 {
            return Err(CoreError::invalid_input(format!(
                "source '{}' has a sample rate of 0",
                self.path.display()
            )));
        }
        Ok(match self.samples {
            Some(samples) => SourceFile::loaded(self.path, self.sample_rate, samples),
            None => SourceFile::deferred(self.path, self.sample_rate),
        })
    }
}

/// Ordered list of labelled values describing a corpus or mosaic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Object kind.
    pub kind: &'static str,
    /// Label and value pairs in display order.
    pub fields: Vec<(String, String)>,
}

impl Summary {
    /// Creates an empty summary.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
        }
    }

    /// Appends a field.
    pub fn field(mut self, label: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((label.into(), value.to_string()));
        self
    }

    /// Looks up a field by label.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind.to_uppercase())?;
        let width = self.fields.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
        for (label, value) in &self.fields {
            writeln!(f, "  {:width$}  {}", label, value, width = width)?;
        }
        Ok(())
    }
}
