//! Object-safe serializer capability shared by every instance of an actor type.
//!
//! Serializers are held as `Arc<dyn StateSerializer>` in the runtime context, so the
//! trait itself only speaks `erased_serde`. Typed access goes through
//! [`serialize_value`](dyn StateSerializer::serialize_value) and
//! [`deserialize_value`](dyn StateSerializer::deserialize_value).

use std::fmt::Debug;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::errors::SerializerError;

/// Callback receiving a type-erased deserializer positioned at the start of the input.
pub type DeserializeVisitor<'v> = dyn for<'a, 'de> FnMut(
        &'a mut dyn erased_serde::Deserializer<'de>,
    ) -> Result<(), erased_serde::Error>
    + 'v;

pub trait StateSerializer: Debug + Send + Sync + 'static {
    /// MIME-like name of the format, for diagnostics.
    fn content_type(&self) -> &'static str;

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Bytes, SerializerError>;

    /// Run `visit` against a deserializer reading `bytes`.
    ///
    /// Implementations must reject trailing input once `visit` returns.
    fn deserialize_with(
        &self,
        bytes: &[u8],
        visit: &mut DeserializeVisitor<'_>,
    ) -> Result<(), SerializerError>;
}

/// JSON format, the default for actor state.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

/// Compact binary format backed by `postcard`.
#[cfg(feature = "postcard")]
#[derive(Debug, Clone, Copy, Default)]
pub struct PostcardSerializer;

// Implementations

impl dyn StateSerializer {
    pub fn serialize_value<T: Serialize>(&self, value: &T) -> Result<Bytes, SerializerError> {
        self.serialize(value)
    }

    pub fn deserialize_value<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        let mut out: Option<T> = None;

        self.deserialize_with(bytes, &mut |de: &mut dyn erased_serde::Deserializer<'_>| {
            out = Some(erased_serde::deserialize::<T>(de)?);
            Ok(())
        })?;

        out.ok_or_else(|| SerializerError::new("deserializer did not produce a value"))
    }
}

impl StateSerializer for JsonSerializer {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Bytes, SerializerError> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::new(format!("JSON error: {e}")))
    }

    fn deserialize_with(
        &self,
        bytes: &[u8],
        visit: &mut DeserializeVisitor<'_>,
    ) -> Result<(), SerializerError> {
        let mut de = serde_json::Deserializer::from_slice(bytes);

        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            visit(&mut erased).map_err(|e| SerializerError::new(format!("JSON error: {e}")))?;
        }

        de.end()
            .map_err(|e| SerializerError::new(format!("JSON error: {e}")))
    }
}

#[cfg(feature = "postcard")]
impl StateSerializer for PostcardSerializer {
    fn content_type(&self) -> &'static str {
        "application/x-postcard"
    }

    fn serialize(&self, value: &dyn erased_serde::Serialize) -> Result<Bytes, SerializerError> {
        postcard::to_stdvec(value)
            .map(Bytes::from)
            .map_err(|e| SerializerError::new(format!("postcard error: {e}")))
    }

    fn deserialize_with(
        &self,
        bytes: &[u8],
        visit: &mut DeserializeVisitor<'_>,
    ) -> Result<(), SerializerError> {
        let mut de = postcard::Deserializer::from_bytes(bytes);

        {
            let mut erased = <dyn erased_serde::Deserializer>::erase(&mut de);
            visit(&mut erased)
                .map_err(|e| SerializerError::new(format!("postcard error: {e}")))?;
        }

        match de.finalize() {
            Ok([]) => Ok(()),
            Ok(rest) => Err(SerializerError::new(format!(
                "postcard error: {} trailing bytes",
                rest.len()
            ))),
            Err(e) => Err(SerializerError::new(format!("postcard error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        owner: String,
        balance: i64,
    }

    #[test]
    fn test_json_typed_access() {
        let serializer: Arc<dyn StateSerializer> = Arc::new(JsonSerializer);
        let account = Account {
            owner: "maru".into(),
            balance: 42,
        };

        let bytes = serializer.serialize_value(&account).unwrap();
        assert_eq!(&bytes[..], br#"{"owner":"maru","balance":42}"#);

        let back: Account = serializer.deserialize_value(&bytes).unwrap();
        assert_eq!(back, account);
    }

    #[test]
    fn test_json_rejects_invalid_and_trailing_input() {
        let serializer: Arc<dyn StateSerializer> = Arc::new(JsonSerializer);

        assert!(serializer.deserialize_value::<Account>(b"not json").is_err());
        assert!(serializer.deserialize_value::<i32>(b"1 2").is_err());
    }

    #[cfg(feature = "postcard")]
    #[test]
    fn test_postcard_typed_access() {
        let serializer: Arc<dyn StateSerializer> = Arc::new(PostcardSerializer);
        let account = Account {
            owner: "maru".into(),
            balance: -7,
        };

        let bytes = serializer.serialize_value(&account).unwrap();
        let back: Account = serializer.deserialize_value(&bytes).unwrap();
        assert_eq!(back, account);

        let mut padded = bytes.to_vec();
        padded.push(0);
        assert!(serializer.deserialize_value::<Account>(&padded).is_err());
    }
}
