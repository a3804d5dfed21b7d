//! Serialized object backups.
//!
//! Objects are held as [`serde_json::Value`] and written through an
//! [`ObjectCodec`], so the driver never depends on one encoding.

use crate::{BackupError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Maximum number of characters of an object's text used for its file name
pub const OBJECT_NAME_PREFIX_LEN: usize = 25;

/// Encode/decode capability for in-memory objects
pub trait ObjectCodec: Send + Sync {
    /// File extension, without the dot
    fn extension(&self) -> &str;

    fn encode(&self, value: &Value) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// Pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ObjectCodec for JsonCodec {
    fn extension(&self) -> &str {
        "json"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(value).map_err(|e| BackupError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|e| BackupError::Decode(e.to_string()))
    }
}

/// TOML; only tables without nulls can be encoded
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl ObjectCodec for TomlCodec {
    fn extension(&self) -> &str {
        "toml"
    }

    fn encode(&self, value: &Value) -> Result<Vec<u8>> {
        toml::to_string_pretty(value)
            .map(String::into_bytes)
            .map_err(|e| BackupError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(bytes).map_err(|e| BackupError::Decode(e.to_string()))?;
        toml::from_str(text).map_err(|e| BackupError::Decode(e.to_string()))
    }
}

/// Codec selection for configuration files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectFormat {
    #[default]
    Json,
    Toml,
}

impl ObjectFormat {
    pub fn codec(self) -> Box<dyn ObjectCodec> {
        match self {
            ObjectFormat::Json => Box::new(JsonCodec),
            ObjectFormat::Toml => Box::new(TomlCodec),
        }
    }
}

/// File name for an object: a short prefix of its text, reduced to the last
/// path component and made filesystem-safe, plus the codec extension.
/// Falls back to `key` when the prefix leaves nothing usable.
pub fn object_file_name(key: &str, value: &Value, extension: &str) -> String {
    format!("{}.{extension}", object_file_stem(key, value))
}

fn object_file_stem(key: &str, value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let prefix: String = text.chars().take(OBJECT_NAME_PREFIX_LEN).collect();
    let last = prefix.rsplit(['/', '\\']).next().unwrap_or_default();

    match sanitize(last) {
        Some(stem) => stem,
        None => sanitize(key).unwrap_or_else(|| "object".to_string()),
    }
}

fn sanitize(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        None
    } else {
        Some(cleaned)
    }
}

/// Encode `value` and write it into `objs_dir`. Returns the written path.
///
/// Paths in `taken` are never overwritten: a name already used gets a
/// `-<n>` suffix on its stem. The written path is added to `taken`.
pub fn backup_object(
    key: &str,
    value: &Value,
    objs_dir: &Path,
    codec: &dyn ObjectCodec,
    taken: &mut HashSet<PathBuf>,
) -> Result<PathBuf> {
    let bytes = codec.encode(value)?;

    fs::create_dir_all(objs_dir)?;
    let stem = object_file_stem(key, value);
    let extension = codec.extension();
    let mut path = objs_dir.join(format!("{stem}.{extension}"));
    let mut suffix = 1;
    while taken.contains(&path) {
        path = objs_dir.join(format!("{stem}-{suffix}.{extension}"));
        suffix += 1;
    }

    fs::write(&path, bytes)?;
    taken.insert(path.clone());

    Ok(path)
}

/// Read an object file written by [`backup_object`]
pub fn load_object(path: &Path, codec: &dyn ObjectCodec) -> Result<Value> {
    let bytes = fs::read(path)?;
    codec.decode(&bytes)
}
