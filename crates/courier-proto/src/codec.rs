//! Wire-format codecs and HTTP content-type negotiation.
//!
//! Two serialization modes are supported: a native binary mode (bincode) and an
//! interoperable textual mode (JSON). The protocol is agnostic to which codec is
//! in use; both must round-trip every supported argument shape losslessly. The
//! active mode is carried in the HTTP `Content-Type` header and echoed in the
//! reply.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Content type of the native binary wire format.
pub const CONTENT_TYPE_BINARY: &str = "application/x-courier";

/// Content type of the interoperable JSON wire format.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors produced while encoding or decoding wire payloads.
#[derive(Debug, Error)]
pub enum ProtoError {
    /// A value could not be encoded in the selected format.
    #[error("encode error: {0}")]
    Encode(String),

    /// A payload could not be decoded in the selected format.
    #[error("decode error: {0}")]
    Decode(String),

    /// The request carried a content type no codec handles.
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
}

/// Serialization mode for requests and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    /// Native binary encoding via bincode.
    #[default]
    Binary,
    /// Interoperable textual encoding via JSON.
    Json,
}

impl WireFormat {
    /// HTTP content type announcing this format.
    pub const fn content_type(self) -> &'static str {
        match self {
            WireFormat::Binary => CONTENT_TYPE_BINARY,
            WireFormat::Json => CONTENT_TYPE_JSON,
        }
    }

    /// Resolves a format from an HTTP content type, ignoring parameters
    /// such as `; charset=utf-8`.
    pub fn from_content_type(value: &str) -> Result<Self, ProtoError> {
        let mime = value.split(';').next().unwrap_or("").trim();
        match mime {
            CONTENT_TYPE_BINARY => Ok(WireFormat::Binary),
            CONTENT_TYPE_JSON => Ok(WireFormat::Json),
            _ => Err(ProtoError::UnsupportedContentType(value.to_string())),
        }
    }

    /// Encodes any serde-compatible value to bytes in this format.
    pub fn encode<T: Serialize + ?Sized>(self, value: &T) -> Result<Vec<u8>, ProtoError> {
        match self {
            WireFormat::Binary => {
                bincode::serialize(value).map_err(|e| ProtoError::Encode(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::to_vec(value).map_err(|e| ProtoError::Encode(e.to_string()))
            }
        }
    }

    /// Decodes bytes in this format into a serde-compatible value.
    pub fn decode<T: DeserializeOwned>(self, bytes: &[u8]) -> Result<T, ProtoError> {
        match self {
            WireFormat::Binary => {
                bincode::deserialize(bytes).map_err(|e| ProtoError::Decode(e.to_string()))
            }
            WireFormat::Json => {
                serde_json::from_slice(bytes).map_err(|e| ProtoError::Decode(e.to_string()))
            }
        }
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireFormat::Binary => write!(f, "binary"),
            WireFormat::Json => write!(f, "json"),
        }
    }
}
