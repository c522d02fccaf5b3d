//! Node-discovery (ND) response record parsing.
//!
//! An ND response parameter is one fixed-layout record per discovered
//! node, variable-length only in its null-terminated name field. Layout,
//! in order: network address (2), serial high half (4), serial low half
//! (4), node identifier (null-terminated ascii), parent network address
//! (2), device type (1), reserved status (1), profile ID (2),
//! manufacturer ID (2). Trailing bytes are ignored for forward
//! compatibility.

use std::fmt;

use crate::command::Parameter;
use crate::error::ProtocolError;

/// Role of a discovered node on the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    /// Index 0.
    Coordinator,
    /// Index 1.
    Router,
    /// Index 2.
    EndDevice,
}

impl DeviceType {
    /// Decode the 1-byte device-type index. An out-of-range index is a
    /// protocol violation, not a value to coerce.
    pub fn from_index(index: u8) -> Result<Self, ProtocolError> {
        match index {
            0 => Ok(DeviceType::Coordinator),
            1 => Ok(DeviceType::Router),
            2 => Ok(DeviceType::EndDevice),
            _ => Err(ProtocolError::BadDeviceType(index)),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceType::Coordinator => "COORDINATOR",
            DeviceType::Router => "ROUTER",
            DeviceType::EndDevice => "END_DEVICE",
        };
        f.write_str(name)
    }
}

/// The identity record one node returns to an ND request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDiscoverRecord {
    /// 16-bit network address (MY).
    pub network_address: u16,
    /// 64-bit serial (SH/SL concatenated, high half first).
    pub serial: u64,
    /// Node identifier string (NI).
    pub node_identifier: String,
    /// 16-bit network address of the node's parent.
    pub parent_network_address: u16,
    /// Role of the node.
    pub device_type: DeviceType,
    /// Reserved status byte.
    pub status: u8,
    /// 16-bit profile ID.
    pub profile_id: u16,
    /// 16-bit manufacturer ID.
    pub manufacturer_id: u16,
}

/// Byte cursor over a fixed-layout record.
struct RecordCursor<'a> {
    bytes: &'a [u8],
}

impl<'a> RecordCursor<'a> {
    fn take(&mut self, len: usize, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        if self.bytes.len() < len {
            return Err(ProtocolError::TruncatedRecord {
                field,
                expected: len,
                actual: self.bytes.len(),
            });
        }
        let (taken, rest) = self.bytes.split_at(len);
        self.bytes = rest;
        Ok(taken)
    }

    fn take_number(&mut self, len: usize, field: &'static str) -> Result<u64, ProtocolError> {
        Ok(xh_encoding::bytes_to_number(self.take(len, field)?)?)
    }

    /// Take bytes up to (and skip past) a null terminator.
    fn take_until_null(&mut self, field: &'static str) -> Result<&'a [u8], ProtocolError> {
        let end = self.bytes.iter().position(|&b| b == 0).ok_or(
            ProtocolError::TruncatedRecord {
                field,
                expected: 1,
                actual: 0,
            },
        )?;
        let value = &self.bytes[..end];
        self.bytes = &self.bytes[end + 1..];
        Ok(value)
    }
}

/// Parse one node-discovery response record.
pub fn parse_node_discover(record: &[u8]) -> Result<NodeDiscoverRecord, ProtocolError> {
    let mut cursor = RecordCursor { bytes: record };

    let network_address = cursor.take_number(2, "network_address")? as u16;

    let serial_high = cursor.take_number(4, "serial_high")?;
    let serial_low = cursor.take_number(4, "serial_low")?;
    let serial = (serial_high << 32) | serial_low;

    let name = cursor.take_until_null("node_identifier")?;
    let node_identifier =
        String::from_utf8(name.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)?;

    let parent_network_address = cursor.take_number(2, "parent_network_address")? as u16;
    let device_type = DeviceType::from_index(cursor.take_number(1, "device_type")? as u8)?;
    let status = cursor.take_number(1, "status")? as u8;
    let profile_id = cursor.take_number(2, "profile_id")? as u16;
    let manufacturer_id = cursor.take_number(2, "manufacturer_id")? as u16;
    // Anything after the manufacturer ID belongs to a future protocol
    // revision; ignore it.

    Ok(NodeDiscoverRecord {
        network_address,
        serial,
        node_identifier,
        parent_network_address,
        device_type,
        status,
        profile_id,
        manufacturer_id,
    })
}

/// Parameter parser registered for the ND command.
pub(crate) fn parse_node_discover_parameter(encoded: &[u8]) -> Result<Parameter, ProtocolError> {
    Ok(Parameter::NodeDiscover(parse_node_discover(encoded)?))
}
