//! Protocol constants
//!
//! Field names match the keys the transport uses in its decoded frame
//! dictionaries, and the frame-ID bounds are fixed by the 1-byte wire
//! width (0 is reserved per protocol convention).

/// Frame-type discriminator key in a decoded frame dictionary.
pub const FIELD_ID: &str = "id";
/// Frame sequence number; packed number, 1 byte on the wire.
pub const FIELD_FRAME_ID: &str = "frame_id";
/// AT command name; two ascii characters.
pub const FIELD_COMMAND: &str = "command";
/// Value sent with or received from a command; packed number.
pub const FIELD_PARAMETER: &str = "parameter";
/// Response status code; packed number, 1 byte on the wire.
pub const FIELD_STATUS: &str = "status";
/// 16-bit network address of the responder for remote commands.
pub const FIELD_SOURCE_ADDR: &str = "source_addr";
/// 64-bit serial of the responder for remote commands.
pub const FIELD_SOURCE_ADDR_LONG: &str = "source_addr_long";
/// Sequence of sample sub-dictionaries in an IO data frame.
pub const FIELD_SAMPLES: &str = "samples";
/// 64-bit destination serial for an outbound remote command.
pub const FIELD_DEST_ADDR_LONG: &str = "dest_addr_long";

/// Smallest assignable frame ID.
pub const MIN_FRAME_ID: u8 = 1;
/// Largest frame ID that fits the 1-byte wire field.
pub const MAX_FRAME_ID: u8 = 255;
