//! Decoded frame dictionaries as delivered by the transport.
//!
//! The transport hands the core one dictionary per physical frame, already
//! checksum-validated and unescaped: field name to raw value. Parsers take
//! fields out as they consume them; whatever is left after a frame is fully
//! constructed is logged as a warning and dropped, never treated as fatal,
//! so firmware that grows new fields keeps decoding.

use std::collections::BTreeMap;

use crate::error::ProtocolError;

/// One raw value in a frame dictionary.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// A packed byte string (numbers, addresses, parameters).
    Bytes(Vec<u8>),
    /// An ascii text value (command names, the frame-type discriminator).
    Text(String),
    /// A sequence of sample sub-dictionaries, keyed `<pintype>-<pinnumber>`.
    Samples(Vec<SampleDict>),
}

/// One raw sample reading inside a sample sub-dictionary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    /// Raw numeric reading (ADC counts, or 0/1 for a digital pin).
    Number(u64),
    /// Boolean digital level.
    Bool(bool),
}

/// A sample sub-dictionary: pin key to raw reading.
pub type SampleDict = BTreeMap<String, SampleValue>;

/// A decoded field dictionary for one physical frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDict {
    fields: BTreeMap<String, FieldValue>,
}

impl FrameDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        FrameDict::default()
    }

    /// Insert a field value.
    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Insert a field value, chaining. Convenient for transports and tests.
    pub fn with(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Whether a field is (still) present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields not yet consumed.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether every field has been consumed.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Take a byte-string field. Ascii text fields coerce to their bytes.
    pub fn take_bytes(&mut self, key: &str) -> Result<Option<Vec<u8>>, ProtocolError> {
        match self.fields.remove(key) {
            None => Ok(None),
            Some(FieldValue::Bytes(bytes)) => Ok(Some(bytes)),
            Some(FieldValue::Text(text)) => Ok(Some(text.into_bytes())),
            Some(other) => {
                // Put it back so it still shows up as unused.
                self.fields.insert(key.to_owned(), other);
                Err(ProtocolError::WrongFieldKind {
                    field: key.to_owned(),
                    expected: "bytes",
                })
            }
        }
    }

    /// Take a byte-string field that must be present.
    pub fn require_bytes(&mut self, key: &'static str) -> Result<Vec<u8>, ProtocolError> {
        self.take_bytes(key)?
            .ok_or(ProtocolError::MissingField(key))
    }

    /// Take a text field. Byte-string fields coerce via UTF-8.
    pub fn take_text(&mut self, key: &str) -> Result<Option<String>, ProtocolError> {
        match self.fields.remove(key) {
            None => Ok(None),
            Some(FieldValue::Text(text)) => Ok(Some(text)),
            Some(FieldValue::Bytes(bytes)) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| ProtocolError::InvalidUtf8),
            Some(other) => {
                self.fields.insert(key.to_owned(), other);
                Err(ProtocolError::WrongFieldKind {
                    field: key.to_owned(),
                    expected: "text",
                })
            }
        }
    }

    /// Take a text field that must be present.
    pub fn require_text(&mut self, key: &'static str) -> Result<String, ProtocolError> {
        self.take_text(key)?.ok_or(ProtocolError::MissingField(key))
    }

    /// Take a sample-sequence field that must be present.
    pub fn require_samples(&mut self, key: &'static str) -> Result<Vec<SampleDict>, ProtocolError> {
        match self.fields.remove(key) {
            None => Err(ProtocolError::MissingField(key)),
            Some(FieldValue::Samples(samples)) => Ok(samples),
            Some(other) => {
                self.fields.insert(key.to_owned(), other);
                Err(ProtocolError::WrongFieldKind {
                    field: key.to_owned(),
                    expected: "samples",
                })
            }
        }
    }

    /// Log any keys no parser consumed. The protocol gains fields over a
    /// device's lifetime, so leftovers are a warning, never an error.
    pub fn warn_unused(&self, context: &str) {
        for (key, value) in &self.fields {
            log::warn!("unrecognized field in {context} frame: {key}={value:?}");
        }
    }

    /// Dismantle the dictionary into its remaining raw fields.
    pub fn into_fields(self) -> BTreeMap<String, FieldValue> {
        self.fields
    }
}
