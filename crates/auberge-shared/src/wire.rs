//! Response envelopes of the storage and persistence collaborators.
//!
//! Both services answer `{ "success": bool, "message"?: string, ... }` with
//! the payload in an endpoint-specific field. [`ApiResult`] turns that into
//! a discriminated value so callers match on it instead of probing fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TransportError;
use crate::types::MimeClass;

/// Decoded response of one collaborator endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResult<T> {
    Ok(T),
    Err { message: Option<String> },
}

#[derive(Deserialize)]
struct RawEnvelope {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(flatten)]
    rest: Map<String, Value>,
}

impl<T: DeserializeOwned> ApiResult<T> {
    /// Decode an envelope. With `field = Some(name)` the payload is read
    /// from that field, otherwise from the remaining top-level fields.
    pub fn decode(body: &[u8], field: Option<&str>) -> Result<Self, TransportError> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| TransportError::Malformed(format!("invalid envelope: {e}")))?;

        if !raw.success {
            return Ok(Self::Err {
                message: raw.message,
            });
        }

        let payload = match field {
            Some(name) => raw
                .rest
                .get(name)
                .cloned()
                .ok_or_else(|| TransportError::Malformed(format!("missing field `{name}`")))?,
            None => Value::Object(raw.rest),
        };

        serde_json::from_value(payload)
            .map(Self::Ok)
            .map_err(|e| TransportError::Malformed(e.to_string()))
    }
}

impl<T> ApiResult<T> {
    pub fn into_result(self) -> Result<T, TransportError> {
        match self {
            ApiResult::Ok(value) => Ok(value),
            ApiResult::Err { message } => Err(TransportError::rejected(message)),
        }
    }
}

/// Payload-less acknowledgement (reorder, delete).
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Ack {}

/// Successful storage upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredMedia {
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub mime_class: Option<MimeClass>,
}
