//! Document ingestion and persistence.
//!
//! Turns raw bytes into configuration values and back. JSON is the native
//! format; TOML files are accepted and converted to the same value model.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// On-disk format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    #[default]
    Json,
    Toml,
}

impl DocumentFormat {
    /// Format implied by the file extension. Anything but `.toml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// Document errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialize error: {0}")]
    Serialize(String),
}

/// Parse raw bytes into a value.
pub fn parse(bytes: &[u8], format: DocumentFormat) -> Result<Value, DocumentError> {
    match format {
        DocumentFormat::Json => serde_json::from_slice(bytes)
            .map_err(|e| DocumentError::Parse(format!("JSON parse error: {}", e))),
        DocumentFormat::Toml => {
            let contents = std::str::from_utf8(bytes)
                .map_err(|e| DocumentError::Parse(format!("Invalid UTF-8: {}", e)))?;
            let table: toml::Table = toml::from_str(contents)
                .map_err(|e| DocumentError::Parse(format!("TOML parse error: {}", e)))?;
            toml_to_json(toml::Value::Table(table))
        }
    }
}

/// Serialize a value for persistence.
pub fn to_bytes(value: &Value, format: DocumentFormat) -> Result<Vec<u8>, DocumentError> {
    match format {
        DocumentFormat::Json => {
            let mut bytes = serde_json::to_vec_pretty(value)
                .map_err(|e| DocumentError::Serialize(e.to_string()))?;
            bytes.push(b'\n');
            Ok(bytes)
        }
        // TOML has no null; serializing a document containing one fails here
        DocumentFormat::Toml => toml::to_string_pretty(value)
            .map(String::into_bytes)
            .map_err(|e| DocumentError::Serialize(e.to_string())),
    }
}

/// Convert TOML Value to JSON Value. Non-finite floats have no JSON form.
fn toml_to_json(toml: toml::Value) -> Result<Value, DocumentError> {
    Ok(match toml {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i.into()),
        toml::Value::Float(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| DocumentError::Parse(format!("TOML float {} has no JSON representation", f)))?,
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(arr) => Value::Array(
            arr.into_iter()
                .map(toml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(k, v)| Ok((k, toml_to_json(v)?)))
                .collect::<Result<_, DocumentError>>()?,
        ),
    })
}

/// SHA-256 digest of raw document bytes, hex encoded.
pub fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Read a document file.
pub fn read_file(path: &Path) -> Result<Vec<u8>, DocumentError> {
    fs::read(path).map_err(|e| DocumentError::Io(format!("{}: {}", path.display(), e)))
}

/// Write a document file.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<(), DocumentError> {
    fs::write(path, bytes).map_err(|e| DocumentError::Io(format!("{}: {}", path.display(), e)))
}
