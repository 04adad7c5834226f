//! Declared-state document codec.
//!
//! # Data Flow
//! ```text
//! endpoints.{yaml,toml,json}
//!     → DocumentFormat (by extension, YAML when unknown)
//!     → Document (wrapped `{endpoints: [...]}` or a bare list of raw entries)
//!     → EntryDocument per entry (current shape, then legacy fallback)
//!     → Vec<EndpointSpec>
//! ```
//!
//! # Design Decisions
//! - Decoding is structural only; semantic checks happen in the table builder
//!   so one bad entry never rejects the whole document
//! - Entries decode one at a time; an entry of the wrong shape is logged and
//!   dropped, a missing status code decodes as 0 and fails validation later
//! - Legacy single-response entries expand to the standard method set
//! - Encoding always writes the current wrapped shape

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::routing::{EndpointSpec, MethodSpec};

/// Methods a legacy entry answers on.
pub const LEGACY_METHODS: [&str; 7] = ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Error type for document loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML document: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to encode TOML document: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),
}

/// On-disk encoding of the endpoints document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Toml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("toml") => Self::Toml,
            Some("json") => Self::Json,
            _ => Self::Yaml,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Wrapped { endpoints: Vec<serde_json::Value> },
    Bare(Vec<serde_json::Value>),
}

impl Document {
    fn into_entries(self) -> Vec<serde_json::Value> {
        match self {
            Document::Wrapped { endpoints } | Document::Bare(endpoints) => endpoints,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum EntryDocument {
    Current(EndpointSpec),
    Legacy(LegacyEndpoint),
}

/// Single-response entry used by older documents.
#[derive(Deserialize)]
struct LegacyEndpoint {
    path: String,
    #[serde(default, rename = "status-code", alias = "statusCode")]
    status_code: i32,
    #[serde(default)]
    body: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

impl From<EntryDocument> for EndpointSpec {
    fn from(entry: EntryDocument) -> Self {
        match entry {
            EntryDocument::Current(spec) => spec,
            EntryDocument::Legacy(legacy) => EndpointSpec {
                path: legacy.path,
                methods: LEGACY_METHODS
                    .iter()
                    .map(|method| MethodSpec {
                        method: method.to_string(),
                        status_code: legacy.status_code,
                        body: legacy.body.clone(),
                        headers: legacy.headers.clone(),
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Serialize)]
struct EncodedDocument<'a> {
    endpoints: &'a [EndpointSpec],
}

/// Decode document text in the given format.
///
/// Blank input yields an empty list.
pub fn decode_document(text: &str, format: DocumentFormat) -> Result<Vec<EndpointSpec>, ConfigError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let document: Document = match format {
        DocumentFormat::Yaml => serde_yaml::from_str(text)?,
        DocumentFormat::Toml => toml::from_str(text)?,
        DocumentFormat::Json => serde_json::from_str(text)?,
    };

    let specs = document
        .into_entries()
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value::<EntryDocument>(entry) {
            Ok(entry) => Some(EndpointSpec::from(entry)),
            Err(error) => {
                tracing::error!(index, error = %error, "Skipping malformed endpoint entry");
                None
            }
        })
        .collect();
    Ok(specs)
}

/// Read and decode the document at `path`.
pub fn load_document(path: &Path) -> Result<Vec<EndpointSpec>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    decode_document(&text, DocumentFormat::from_path(path))
}

/// Encode endpoints in the current wrapped shape.
pub fn encode_document(endpoints: &[EndpointSpec], format: DocumentFormat) -> Result<String, ConfigError> {
    let document = EncodedDocument { endpoints };
    let text = match format {
        DocumentFormat::Yaml => serde_yaml::to_string(&document)?,
        DocumentFormat::Toml => toml::to_string(&document)?,
        DocumentFormat::Json => serde_json::to_string_pretty(&document)?,
    };
    Ok(text)
}
