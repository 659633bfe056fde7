//! The dynamic value exchanged with the embedding host.
//!
//! [`HostValue`] is the closed set of shapes a host message can carry. Maps keep
//! insertion order so that a value read back from an engine tree compares equal to
//! the value it was built from.

use alloc::string::String;
use alloc::vec::Vec;

use core::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value as JsonValue;

/// A JSON-like dynamic value, plus raw byte buffers.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum HostValue {
    /// No value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer at native width.
    Int(i64),
    /// Floating point number.
    Double(f64),
    /// UTF-8 text.
    String(String),
    /// Ordered sequence.
    Array(Vec<HostValue>),
    /// String-keyed map with unique keys.
    Map(Map),
    /// Opaque bytes.
    ByteBuffer(Vec<u8>),
}

/// Coarse kind of a [`HostValue`], handy for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// [`HostValue::Null`].
    Null,
    /// [`HostValue::Bool`].
    Bool,
    /// [`HostValue::Int`].
    Int,
    /// [`HostValue::Double`].
    Double,
    /// [`HostValue::String`].
    String,
    /// [`HostValue::Array`].
    Array,
    /// [`HostValue::Map`].
    Map,
    /// [`HostValue::ByteBuffer`].
    ByteBuffer,
}

impl HostValue {
    /// Return the coarse kind of this value.
    #[must_use]
    pub const fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Map(_) => ValueKind::Map,
            Self::ByteBuffer(_) => ValueKind::ByteBuffer,
        }
    }

    /// The text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer view of a number; doubles are truncated toward zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// The entries of a map value.
    #[must_use]
    pub const fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up `key` when this value is a map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for HostValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for HostValue {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        Self::String(value.into())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<Self>> for HostValue {
    fn from(value: Vec<Self>) -> Self {
        Self::Array(value)
    }
}

impl From<Map> for HostValue {
    fn from(value: Map) -> Self {
        Self::Map(value)
    }
}

/// Insertion-ordered map with unique keys.
///
/// Iteration follows insertion order. Equality ignores it, since hosts treat
/// maps as unordered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map(IndexMap<String, HostValue>);

impl Map {
    /// An empty map.
    #[must_use]
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// An empty map with room for `capacity` entries.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Insert `value` under `key`. An existing key keeps its position and has its
    /// value replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HostValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// The value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&HostValue> {
        self.0.get(key)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, &HostValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<HostValue>> FromIterator<(K, V)> for Map {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Map {
    type Item = (String, HostValue);
    type IntoIter = indexmap::map::IntoIter<String, HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<JsonValue> for HostValue {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Double(n.as_f64().unwrap_or_default()), Self::Int),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(object) => Self::Map(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<HostValue> for JsonValue {
    fn from(value: HostValue) -> Self {
        match value {
            HostValue::Null => Self::Null,
            HostValue::Bool(b) => Self::Bool(b),
            HostValue::Int(i) => Self::from(i),
            HostValue::Double(d) => serde_json::Number::from_f64(d).map_or(Self::Null, Self::Number),
            HostValue::String(s) => Self::String(s),
            HostValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            HostValue::Map(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
            HostValue::ByteBuffer(bytes) => Self::Array(bytes.into_iter().map(Self::from).collect()),
        }
    }
}

impl Serialize for HostValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Double(d) if d.is_finite() => serializer.serialize_f64(*d),
            Self::Double(_) => serializer.serialize_unit(),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map.iter() {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Self::ByteBuffer(bytes) => {
                let mut seq = serializer.serialize_seq(Some(bytes.len()))?;
                for byte in bytes {
                    seq.serialize_element(byte)?;
                }
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for HostValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(HostValueVisitor)
    }
}

struct HostValueVisitor;

impl<'de> Visitor<'de> for HostValueVisitor {
    type Value = HostValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<HostValue, E> {
        Ok(HostValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<HostValue, E> {
        Ok(HostValue::Int(v))
    }

    #[allow(clippy::cast_precision_loss)]
    fn visit_u64<E: de::Error>(self, v: u64) -> Result<HostValue, E> {
        Ok(i64::try_from(v).map_or(HostValue::Double(v as f64), HostValue::Int))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<HostValue, E> {
        Ok(HostValue::Double(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<HostValue, E> {
        Ok(HostValue::String(v.into()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<HostValue, E> {
        Ok(HostValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<HostValue, E> {
        Ok(HostValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<HostValue, E> {
        Ok(HostValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<HostValue, D::Error> {
        HostValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<HostValue, A::Error> {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(HostValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<HostValue, A::Error> {
        let mut map = Map::new();
        while let Some((key, value)) = access.next_entry::<String, HostValue>()? {
            map.insert(key, value);
        }
        Ok(HostValue::Map(map))
    }
}
