//! The structured measurement record carried through the pipeline.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    Unsigned(u64),
    Boolean(bool),
    String(String),
}

impl FieldValue {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Float(_) => "float",
            FieldValue::Integer(_) => "integer",
            FieldValue::Unsigned(_) => "unsigned",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::String(_) => "string",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Integer(v) => write!(f, "{v}i"),
            FieldValue::Unsigned(v) => write!(f, "{v}u"),
            FieldValue::Boolean(v) => write!(f, "{v}"),
            FieldValue::String(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Unsigned(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

/// One measurement: a name, tags, typed fields and a timestamp.
///
/// Tags and fields are kept in sorted maps so that serialization is
/// deterministic; their order carries no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    name: String,
    tags: BTreeMap<String, String>,
    fields: BTreeMap<String, FieldValue>,
    timestamp: DateTime<Utc>,
}

impl Sample {
    /// Create a sample with no tags and no fields.
    pub fn new(name: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
            timestamp,
        }
    }

    /// Builder-style [`Sample::add_tag`].
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_tag(key, value);
        self
    }

    /// Builder-style [`Sample::add_field`].
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.add_field(key, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    pub fn tags(&self) -> &BTreeMap<String, String> {
        &self.tags
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Set a tag, replacing any previous value.
    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }

    pub fn remove_tag(&mut self, key: &str) -> Option<String> {
        self.tags.remove(key)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Set a field, replacing any previous value (and type).
    pub fn add_field(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn remove_field(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn builder_sets_tags_and_fields() {
        let sample = Sample::new("cpu", ts())
            .with_tag("host", "a")
            .with_field("usage", 0.5)
            .with_field("cores", 8i64);

        assert_eq!(sample.name(), "cpu");
        assert_eq!(sample.tag("host"), Some("a"));
        assert_eq!(sample.field("usage"), Some(&FieldValue::Float(0.5)));
        assert_eq!(sample.field("cores").and_then(FieldValue::as_i64), Some(8));
        assert_eq!(sample.timestamp(), ts());
    }

    #[test]
    fn add_field_replaces_value_and_type() {
        let mut sample = Sample::new("m", ts()).with_field("count", 1i64);
        sample.add_field("count", 2.5);
        assert_eq!(sample.field("count"), Some(&FieldValue::Float(2.5)));
        assert_eq!(sample.fields().len(), 1);
    }

    #[test]
    fn remove_tag_and_field() {
        let mut sample = Sample::new("m", ts())
            .with_tag("a", "1")
            .with_field("f", true);
        assert_eq!(sample.remove_tag("a"), Some("1".to_string()));
        assert_eq!(sample.remove_field("f"), Some(FieldValue::Boolean(true)));
        assert!(sample.tags().is_empty());
        assert!(sample.fields().is_empty());
        assert_eq!(sample.remove_tag("missing"), None);
    }

    #[test]
    fn field_value_display_uses_line_protocol_suffixes() {
        assert_eq!(FieldValue::Integer(3).to_string(), "3i");
        assert_eq!(FieldValue::Unsigned(3).to_string(), "3u");
        assert_eq!(FieldValue::Float(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Boolean(false).to_string(), "false");
        assert_eq!(FieldValue::String("x".into()).type_name(), "string");
    }
}
