//! Persisted payload format.
//!
//! Current payloads are a versioned envelope:
//!
//! ```json
//! { "version": 1, "ocorrencias": [ { "id": "…", … } ] }
//! ```
//!
//! Payloads written before versioning existed are a bare JSON array of records; they are
//! read as version 0 and rewritten as an envelope on the next save.
//!
//! Decode errors carry the JSON path of the first mismatch (e.g. `ocorrencias[2].data`).

use crate::constants::PAYLOAD_VERSION;
use crate::occurrence::OccurrenceRecord;
use crate::{OccurrenceError, OccurrenceResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize)]
struct EnvelopeWire<'a> {
    version: u32,
    ocorrencias: &'a [OccurrenceRecord],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnvelopeOwnedWire {
    version: u32,
    #[serde(default)]
    ocorrencias: Vec<OccurrenceRecord>,
}

/// Encodes `records` as a current-version envelope.
pub(crate) fn encode(records: &[OccurrenceRecord]) -> OccurrenceResult<String> {
    serde_json::to_string(&EnvelopeWire {
        version: PAYLOAD_VERSION,
        ocorrencias: records,
    })
    .map_err(OccurrenceError::Serialization)
}

/// Decodes a stored payload. Blank text decodes to an empty list.
pub(crate) fn decode(text: &str) -> OccurrenceResult<Vec<OccurrenceRecord>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let value: Value = serde_json::from_str(text).map_err(|e| OccurrenceError::Deserialization {
        path: "<root>".into(),
        reason: e.to_string(),
    })?;

    if value.is_array() {
        return deserialize_at::<Vec<OccurrenceRecord>>(value);
    }
    if !value.is_object() {
        return Err(OccurrenceError::Deserialization {
            path: "<root>".into(),
            reason: "expected an envelope object or a record array".into(),
        });
    }

    let found = value
        .get("version")
        .and_then(Value::as_u64)
        .ok_or_else(|| OccurrenceError::Deserialization {
            path: "version".into(),
            reason: "missing or non-numeric payload version".into(),
        })?;
    if found > u64::from(PAYLOAD_VERSION) {
        return Err(OccurrenceError::UnsupportedPayloadVersion {
            found: u32::try_from(found).unwrap_or(u32::MAX),
            supported: PAYLOAD_VERSION,
        });
    }

    deserialize_at::<EnvelopeOwnedWire>(value).map(|wire| wire.ocorrencias)
}

fn deserialize_at<T>(value: Value) -> OccurrenceResult<T>
where
    T: for<'de> Deserialize<'de>,
{
    serde_path_to_error::deserialize(value).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        OccurrenceError::Deserialization {
            path,
            reason: err.into_inner().to_string(),
        }
    })
}
