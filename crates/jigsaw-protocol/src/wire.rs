//! Positional tuple helpers shared by every wire type.
//!
//! All messages are JSON arrays. These helpers read one slot at a time and
//! turn a missing or mistyped slot into a [`ProtocolError`] naming the
//! tuple and index, which is what ends up in the server logs.

use serde_json::Value;

use crate::ProtocolError;

pub(crate) fn array<'a>(value: &'a Value, what: &str) -> Result<&'a [Value], ProtocolError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| ProtocolError::invalid(format!("{what}: expected array")))
}

pub(crate) fn slot<'a>(items: &'a [Value], i: usize, what: &str) -> Result<&'a Value, ProtocolError> {
    items
        .get(i)
        .ok_or_else(|| ProtocolError::invalid(format!("{what}: missing field {i}")))
}

pub(crate) fn f64_at(items: &[Value], i: usize, what: &str) -> Result<f64, ProtocolError> {
    slot(items, i, what)?
        .as_f64()
        .ok_or_else(|| ProtocolError::invalid(format!("{what}: field {i} is not a number")))
}

pub(crate) fn i64_at(items: &[Value], i: usize, what: &str) -> Result<i64, ProtocolError> {
    let v = slot(items, i, what)?;
    // Browsers send integral values as floats (`3.0`) now and then.
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        .ok_or_else(|| ProtocolError::invalid(format!("{what}: field {i} is not an integer")))
}

pub(crate) fn u64_at(items: &[Value], i: usize, what: &str) -> Result<u64, ProtocolError> {
    let n = i64_at(items, i, what)?;
    u64::try_from(n)
        .map_err(|_| ProtocolError::invalid(format!("{what}: field {i} is negative")))
}

pub(crate) fn str_at<'a>(items: &'a [Value], i: usize, what: &str) -> Result<&'a str, ProtocolError> {
    slot(items, i, what)?
        .as_str()
        .ok_or_else(|| ProtocolError::invalid(format!("{what}: field {i} is not a string")))
}

/// Nullable string slot; absent and `null` both read as `None`.
pub(crate) fn opt_str_at(items: &[Value], i: usize, what: &str) -> Result<Option<String>, ProtocolError> {
    match items.get(i) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ProtocolError::invalid(format!(
            "{what}: field {i} is not a string"
        ))),
    }
}

/// Truthiness of a slot, accepting `true`/`false` as well as `1`/`0`.
pub(crate) fn flag_at(items: &[Value], i: usize) -> bool {
    match items.get(i) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    }
}

/// Implements `Serialize`/`Deserialize` for a type in terms of its
/// `encode(&self) -> Value` and `decode(&Value) -> Result<Self, _>` pair.
macro_rules! wire_serde {
    ($ty:ty) => {
        impl serde::Serialize for $ty {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serde::Serialize::serialize(&self.encode(), serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = <serde_json::Value as serde::Deserialize>::deserialize(deserializer)?;
                Self::decode(&value).map_err(serde::de::Error::custom)
            }
        }
    };
}
