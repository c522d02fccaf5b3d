//! Protocol error types.

use thiserror::Error;

use xh_encoding::EncodingError;

/// Errors that can occur when working with the XBee API protocol.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProtocolError {
    /// A packed field value failed to convert.
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    /// A required key is absent from a frame dictionary.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A dictionary value has a kind the field cannot hold.
    #[error("field {field} has wrong kind: expected {expected}")]
    WrongFieldKind {
        /// Field name as it appears in the dictionary.
        field: String,
        /// Kind the field is defined to carry.
        expected: &'static str,
    },

    /// A numeric field value exceeds its wire width.
    #[error("field {field} value {value:#x} exceeds its wire width")]
    FieldOutOfRange {
        /// Field name as it appears in the dictionary.
        field: &'static str,
        /// Decoded value.
        value: u64,
    },

    /// Frame ID outside the 1..=255 wire range.
    #[error("frame ID {0} outside valid range 1..=255")]
    FrameIdOutOfRange(u64),

    /// AT command name not in the recognized set.
    #[error("unknown AT command name: {0:?}")]
    UnknownCommandName(String),

    /// Response status byte with no matching status code.
    #[error("status byte out of range: {0}")]
    BadStatus(u64),

    /// Device-type index in a node-discovery record with no matching type.
    #[error("device type index out of range: {0}")]
    BadDeviceType(u8),

    /// A fixed-layout record ended before one of its fields.
    #[error("truncated record at {field}: expected {expected} more bytes, got {actual}")]
    TruncatedRecord {
        /// Field being decoded when the record ran out.
        field: &'static str,
        /// Bytes the field needs.
        expected: usize,
        /// Bytes remaining.
        actual: usize,
    },

    /// A command response parameter is too short for its layout.
    #[error("parameter too short: expected at least {expected} bytes, got {actual}")]
    ParameterTooShort {
        /// Minimum length the layout requires.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// A sample key did not parse as `<pintype>-<pinnumber>`.
    #[error("malformed sample key: {0:?}")]
    BadSampleKey(String),

    /// Sample key pin-type tag not in the recognized set.
    #[error("unknown pin type: {0:?}")]
    UnknownPinType(String),

    /// Pin number with no pin of the given type.
    #[error("no {pin_type} pin numbered {number}")]
    UnknownPin {
        /// Pin type tag ("adc" or "dio").
        pin_type: &'static str,
        /// Offending pin number.
        number: u8,
    },

    /// Analog sample delivered as a boolean.
    #[error("analog sample for pin {0} must be numeric")]
    NonNumericAnalogSample(u8),

    /// Digital sample level other than 0 or 1.
    #[error("digital sample level must be 0 or 1, got {0}")]
    InvalidDigitalLevel(u64),

    /// Invalid UTF-8 in a string field.
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,

    /// A registry tag was bound twice during setup.
    #[error("duplicate registration in {registry} registry for tag {tag}")]
    DuplicateRegistration {
        /// Registry name.
        registry: &'static str,
        /// Offending tag.
        tag: String,
    },

    /// Destination set on a response-type command.
    #[error("cannot set a destination on a response frame")]
    DestinationOnResponse,

    /// Parameter kind that has no outbound wire encoding.
    #[error("parameter cannot be encoded for sending: {0}")]
    UnencodableParameter(String),

    /// Send attempted with no transport configured on the session.
    #[error("no transport provided and none registered on the session")]
    NoTransport,

    /// The transport failed to send a frame.
    #[error("transport send failed: {0}")]
    Transport(String),

    /// No response arrived for a frame ID within the wait deadline.
    #[error("timed out waiting for response to frame ID {frame_id}")]
    ResponseTimeout {
        /// Frame ID of the outstanding request.
        frame_id: u8,
    },
}
