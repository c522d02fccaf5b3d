//! Frames: the logical units of the XBee API protocol.

use std::collections::BTreeMap;
use std::fmt;

use crate::command::Command;
use crate::data::Data;
use crate::fields::FieldValue;

/// API frame types this core knows how to build or parse. The tag strings
/// match the discriminator the transport puts in its decoded dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameType {
    /// Outbound local AT command request.
    At,
    /// Response to a local AT command.
    AtResponse,
    /// Outbound remote AT command request.
    RemoteAt,
    /// Response to a remote AT command.
    RemoteAtResponse,
    /// Unsolicited IO data sample from a 64-bit-addressed node.
    RxIoDataLongAddr,
}

impl FrameType {
    /// The discriminator tag used in frame dictionaries.
    pub fn api_id(&self) -> &'static str {
        match self {
            FrameType::At => "at",
            FrameType::AtResponse => "at_response",
            FrameType::RemoteAt => "remote_at",
            FrameType::RemoteAtResponse => "remote_at_response",
            FrameType::RxIoDataLongAddr => "rx_io_data_long_addr",
        }
    }

    /// Parse a discriminator tag. Unknown tags map to `None` so dispatch
    /// can fall back to a generic frame.
    pub fn from_api_id(tag: &str) -> Option<Self> {
        match tag {
            "at" => Some(FrameType::At),
            "at_response" => Some(FrameType::AtResponse),
            "remote_at" => Some(FrameType::RemoteAt),
            "remote_at_response" => Some(FrameType::RemoteAtResponse),
            "rx_io_data_long_addr" => Some(FrameType::RxIoDataLongAddr),
            _ => None,
        }
    }

    /// Whether this is a response to something we sent.
    pub fn is_response(&self) -> bool {
        matches!(self, FrameType::AtResponse | FrameType::RemoteAtResponse)
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_id())
    }
}

/// One parsed frame, inbound or outbound.
#[derive(Debug, Clone)]
pub enum Frame {
    /// An AT command request or response.
    Command(Command),
    /// An unsolicited IO sample frame.
    Data(Data),
    /// A frame with no registered class; raw fields retained.
    Generic(GenericFrame),
}

impl Frame {
    /// The frame type, if the discriminator tag is a known one.
    pub fn frame_type(&self) -> Option<FrameType> {
        match self {
            Frame::Command(command) => Some(command.frame_type()),
            Frame::Data(_) => Some(FrameType::RxIoDataLongAddr),
            Frame::Generic(generic) => FrameType::from_api_id(generic.api_id()),
        }
    }

    /// The raw discriminator tag.
    pub fn api_id(&self) -> &str {
        match self {
            Frame::Command(command) => command.frame_type().api_id(),
            Frame::Data(_) => FrameType::RxIoDataLongAddr.api_id(),
            Frame::Generic(generic) => generic.api_id(),
        }
    }

    /// Named field values for diagnostics and formatting.
    pub fn named_values(&self) -> BTreeMap<String, String> {
        match self {
            Frame::Command(command) => command.named_values(),
            Frame::Data(data) => data.named_values(),
            Frame::Generic(generic) => generic.named_values(),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Command(command) => command.fmt(f),
            Frame::Data(data) => data.fmt(f),
            Frame::Generic(generic) => generic.fmt(f),
        }
    }
}

/// Fallback representation for a frame type with no registered class.
/// Keeps the raw fields so a caller can still inspect what arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericFrame {
    api_id: String,
    fields: BTreeMap<String, FieldValue>,
}

impl GenericFrame {
    pub(crate) fn new(api_id: String, fields: BTreeMap<String, FieldValue>) -> Self {
        GenericFrame { api_id, fields }
    }

    /// The raw discriminator tag this frame arrived with.
    pub fn api_id(&self) -> &str {
        &self.api_id
    }

    /// The raw, unparsed fields.
    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }

    /// Named field values for diagnostics and formatting.
    pub fn named_values(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(key, value)| (key.clone(), format!("{value:?}")))
            .collect()
    }
}

impl fmt::Display for GenericFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frame {}{}",
            self.api_id,
            format_named_values(&self.named_values())
        )
    }
}

/// Format named values as ` {k=v, k=v}`, or nothing when empty.
pub(crate) fn format_named_values(values: &BTreeMap<String, String>) -> String {
    if values.is_empty() {
        return String::new();
    }
    let joined = values
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" {{{joined}}}")
}
