//! Binary envelope for persisted objects
//!
//! Every file is a bincode-encoded [`SerializedObject`]: magic bytes, format
//! version, metadata, payload and an FNV-1a checksum of the payload.

use chrono::Utc;
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::debug;

use crate::error::{Result, TrainerError};

/// Descriptive metadata stored alongside a payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Kind of object stored (e.g. `pipeline`, `model`, `array`)
    pub object_type: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
    pub hyperparameters: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            name: "object".to_string(),
            object_type: "object".to_string(),
            created_at: Utc::now().to_rfc3339(),
            hyperparameters: BTreeMap::new(),
            metrics: BTreeMap::new(),
        }
    }
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self
    }

    pub fn add_hyperparameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.hyperparameters.insert(key.into(), value.into());
        self
    }

    pub fn add_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }
}

/// On-disk envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedObject {
    pub magic: [u8; 4],
    pub format_version: u32,
    pub metadata: ModelMetadata,
    pub payload: Vec<u8>,
    pub checksum: u64,
}

impl SerializedObject {
    const MAGIC: [u8; 4] = *b"NSTM";
    const VERSION: u32 = 1;

    pub fn new(metadata: ModelMetadata, payload: Vec<u8>) -> Self {
        let checksum = Self::compute_checksum(&payload);
        Self {
            magic: Self::MAGIC,
            format_version: Self::VERSION,
            metadata,
            payload,
            checksum,
        }
    }

    /// FNV-1a over the payload
    fn compute_checksum(data: &[u8]) -> u64 {
        const FNV_OFFSET: u64 = 14695981039346656037;
        const FNV_PRIME: u64 = 1099511628211;

        data.iter().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ *byte as u64).wrapping_mul(FNV_PRIME)
        })
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != Self::MAGIC {
            return Err("unrecognized file format".to_string());
        }
        if self.format_version > Self::VERSION {
            return Err(format!(
                "unsupported format version {} (max {})",
                self.format_version,
                Self::VERSION
            ));
        }
        if Self::compute_checksum(&self.payload) != self.checksum {
            return Err("checksum verification failed, file may be corrupted".to_string());
        }
        Ok(())
    }
}

/// Serialize `object` to `path`, creating parent directories and replacing
/// any existing file.
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, object: &T) -> Result<()> {
    save_object_with_metadata(path, object, ModelMetadata::default())
}

pub fn save_object_with_metadata<T: Serialize>(
    path: impl AsRef<Path>,
    object: &T,
    metadata: ModelMetadata,
) -> Result<()> {
    let path = path.as_ref();
    let persist_err = |what: &str, e: &dyn std::fmt::Display| {
        TrainerError::PersistenceError(format!("{} {}: {}", what, path.display(), e))
    };

    let payload = bincode::serialize(object).map_err(|e| persist_err("failed to encode", &e))?;
    let bytes = bincode::serialize(&SerializedObject::new(metadata, payload))
        .map_err(|e| persist_err("failed to encode", &e))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| persist_err("failed to create directory for", &e))?;
    }

    let file = File::create(path).map_err(|e| persist_err("failed to create", &e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|_| writer.flush())
        .map_err(|e| persist_err("failed to write", &e))?;

    debug!(path = %path.display(), bytes = bytes.len(), "Object saved");
    Ok(())
}

/// Load an object written by [`save_object`]
pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    load_object_with_metadata(path).map(|(object, _)| object)
}

pub fn load_object_with_metadata<T: DeserializeOwned>(
    path: impl AsRef<Path>,
) -> Result<(T, ModelMetadata)> {
    let path = path.as_ref();
    let load_err = |what: &str, e: &dyn std::fmt::Display| {
        TrainerError::DataError(format!("{} {}: {}", what, path.display(), e))
    };

    let file = File::open(path).map_err(|e| load_err("failed to open", &e))?;
    let mut bytes = Vec::new();
    BufReader::new(file)
        .read_to_end(&mut bytes)
        .map_err(|e| load_err("failed to read", &e))?;

    let envelope: SerializedObject =
        bincode::deserialize(&bytes).map_err(|e| load_err("failed to decode", &e))?;
    envelope
        .validate()
        .map_err(|e| load_err("invalid object file", &e))?;

    let object = bincode::deserialize(&envelope.payload)
        .map_err(|e| load_err("failed to decode payload of", &e))?;
    Ok((object, envelope.metadata))
}

/// Persist a 2-D numeric array
pub fn save_array(path: impl AsRef<Path>, array: &Array2<f64>) -> Result<()> {
    let metadata = ModelMetadata::new("array")
        .with_object_type("array")
        .add_hyperparameter("shape", format!("{}x{}", array.nrows(), array.ncols()));
    save_object_with_metadata(path, array, metadata)
}

pub fn load_array(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    load_object(path)
}
