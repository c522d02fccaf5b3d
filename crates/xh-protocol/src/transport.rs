//! The capability the core needs from the physical transport.
//!
//! Link framing, escaping, and checksum validation live on the other side
//! of this trait; the core only hands over already-encoded field values
//! and receives already-validated dictionaries through
//! [`Session::deliver`](crate::session::Session::deliver).

use crate::error::ProtocolError;

/// An AT command frame ready for the transport's send primitive. Field
/// values are packed exactly as the wire wants them: ascii name, 1-byte
/// frame ID, minimal big-endian parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedCommand {
    /// Two-character ascii command name.
    pub command: &'static str,
    /// Packed frame ID, exactly one byte.
    pub frame_id: Vec<u8>,
    /// Packed parameter, if the command carries one.
    pub parameter: Option<Vec<u8>>,
}

/// Send half of the transport contract.
pub trait Transport: Send {
    /// Send a local AT command frame.
    fn send_at(&mut self, frame: &EncodedCommand) -> Result<(), ProtocolError>;

    /// Send a remote AT command frame to the node with the given 64-bit
    /// serial, packed big-endian.
    fn send_remote_at(
        &mut self,
        frame: &EncodedCommand,
        dest_addr_long: [u8; 8],
    ) -> Result<(), ProtocolError>;
}
