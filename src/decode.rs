use serde::de::DeserializeOwned;

use crate::{ClientError, Payload, Result};

/// Decodes a single-object payload.
pub(crate) fn decode_one<T: DeserializeOwned>(payload: Payload, what: &str) -> Result<T> {
    if payload.is_null() {
        return Err(ClientError::Decode(format!("empty response for {what}")));
    }
    serde_json::from_value(payload.into_json()?)
        .map_err(|err| ClientError::Decode(format!("invalid {what}: {err}")))
}

/// Decodes a list payload.
///
/// Endpoints do not agree on list shapes: a bare array, an object wrapping
/// the array under `results`, a single bare object, or an empty body all
/// normalize to a `Vec`.
pub(crate) fn decode_list<T: DeserializeOwned>(payload: Payload, what: &str) -> Result<Vec<T>> {
    let items = match payload.into_json()? {
        serde_json::Value::Null => Vec::new(),
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut object) => match object.remove("results") {
            Some(serde_json::Value::Array(items)) => items,
            Some(serde_json::Value::Null) => Vec::new(),
            Some(other) => {
                object.insert("results".to_owned(), other);
                vec![serde_json::Value::Object(object)]
            }
            None => vec![serde_json::Value::Object(object)],
        },
        other => {
            return Err(ClientError::Decode(format!(
                "expected a list of {what}, got {other}"
            )))
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|err| {
                ClientError::Decode(format!("invalid {what} at index {index}: {err}"))
            })
        })
        .collect()
}
