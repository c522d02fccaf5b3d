//! AT commands: request construction, response parsing, frame-ID
//! correlation, and the thread-safe send path.

use std::collections::BTreeMap;
use std::fmt;

use crate::constants::*;
use crate::dispatch::Registries;
use crate::error::ProtocolError;
use crate::fields::FrameDict;
use crate::frame::{format_named_values, FrameType};
use crate::input_sample::InputSampleReading;
use crate::node_discover::NodeDiscoverRecord;
use crate::session::Session;
use crate::transport::{EncodedCommand, Transport};

/// Recognized AT command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum CommandName {
    /// `%V`: voltage level on the Vcc pin.
    InputVolts,
    /// Configure IO pin DIO0 / AD0 / COMM.
    D0,
    /// Configure IO pin DIO1 / AD1.
    D1,
    /// Configure IO pin DIO2 / AD2.
    D2,
    /// Configure IO pin DIO3 / AD3.
    D3,
    /// Configure IO pin DIO4.
    D4,
    /// Configure IO pin DIO5 / ASSOC.
    D5,
    /// Configure IO pin DIO6 / RTS.
    D6,
    /// Configure IO pin DIO7 / CTS.
    D7,
    /// Encryption enable (0 or 1).
    EE,
    /// Network ID.
    ID,
    /// IO sample rate.
    IR,
    /// Force a sample on all digital and analog inputs.
    IS,
    /// Link encryption key.
    KY,
    /// Node's network address (0 for the coordinator).
    MY,
    /// Node discover.
    ND,
    /// String node name.
    NI,
    /// Node discover timeout.
    NT,
    /// Configure IO pin DIO10 / PWM / RSSI.
    P0,
    /// Configure IO pin DIO11.
    P1,
    /// Configure IO pin DIO12.
    P2,
    /// Polling rate.
    PO,
    /// Pull-up resistor bit field.
    PR,
    /// Serial number, high 32 bits.
    SH,
    /// Sleep immediately.
    SI,
    /// Serial number, low 32 bits.
    SL,
    /// Sleep mode.
    SM,
    /// Number of sleep periods.
    SN,
    /// Sleep options.
    SO,
    /// Sleep period.
    SP,
    /// Time before sleep.
    ST,
    /// `V+`: supply voltage monitoring threshold for Vcc sampling.
    SupplyThreshold,
    /// Wake host timer.
    WH,
    /// Write configuration to non-volatile memory.
    WR,
}

impl CommandName {
    /// The two-character ascii name sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandName::InputVolts => "%V",
            CommandName::D0 => "D0",
            CommandName::D1 => "D1",
            CommandName::D2 => "D2",
            CommandName::D3 => "D3",
            CommandName::D4 => "D4",
            CommandName::D5 => "D5",
            CommandName::D6 => "D6",
            CommandName::D7 => "D7",
            CommandName::EE => "EE",
            CommandName::ID => "ID",
            CommandName::IR => "IR",
            CommandName::IS => "IS",
            CommandName::KY => "KY",
            CommandName::MY => "MY",
            CommandName::ND => "ND",
            CommandName::NI => "NI",
            CommandName::NT => "NT",
            CommandName::P0 => "P0",
            CommandName::P1 => "P1",
            CommandName::P2 => "P2",
            CommandName::PO => "PO",
            CommandName::PR => "PR",
            CommandName::SH => "SH",
            CommandName::SI => "SI",
            CommandName::SL => "SL",
            CommandName::SM => "SM",
            CommandName::SN => "SN",
            CommandName::SO => "SO",
            CommandName::SP => "SP",
            CommandName::ST => "ST",
            CommandName::SupplyThreshold => "V+",
            CommandName::WH => "WH",
            CommandName::WR => "WR",
        }
    }

    /// Parse a wire name.
    pub fn from_ascii(name: &str) -> Result<Self, ProtocolError> {
        match name {
            "%V" => Ok(CommandName::InputVolts),
            "D0" => Ok(CommandName::D0),
            "D1" => Ok(CommandName::D1),
            "D2" => Ok(CommandName::D2),
            "D3" => Ok(CommandName::D3),
            "D4" => Ok(CommandName::D4),
            "D5" => Ok(CommandName::D5),
            "D6" => Ok(CommandName::D6),
            "D7" => Ok(CommandName::D7),
            "EE" => Ok(CommandName::EE),
            "ID" => Ok(CommandName::ID),
            "IR" => Ok(CommandName::IR),
            "IS" => Ok(CommandName::IS),
            "KY" => Ok(CommandName::KY),
            "MY" => Ok(CommandName::MY),
            "ND" => Ok(CommandName::ND),
            "NI" => Ok(CommandName::NI),
            "NT" => Ok(CommandName::NT),
            "P0" => Ok(CommandName::P0),
            "P1" => Ok(CommandName::P1),
            "P2" => Ok(CommandName::P2),
            "PO" => Ok(CommandName::PO),
            "PR" => Ok(CommandName::PR),
            "SH" => Ok(CommandName::SH),
            "SI" => Ok(CommandName::SI),
            "SL" => Ok(CommandName::SL),
            "SM" => Ok(CommandName::SM),
            "SN" => Ok(CommandName::SN),
            "SO" => Ok(CommandName::SO),
            "SP" => Ok(CommandName::SP),
            "ST" => Ok(CommandName::ST),
            "V+" => Ok(CommandName::SupplyThreshold),
            "WH" => Ok(CommandName::WH),
            "WR" => Ok(CommandName::WR),
            _ => Err(ProtocolError::UnknownCommandName(name.to_owned())),
        }
    }

    /// Whether a numeric default parse is known to be right for this
    /// command's response parameter.
    fn parses_as_number(&self) -> bool {
        matches!(
            self,
            CommandName::InputVolts
                | CommandName::ID
                | CommandName::MY
                | CommandName::NT
                | CommandName::SH
                | CommandName::SL
        )
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response status, decoded from a single status byte by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Index 0.
    Ok,
    /// Index 1.
    Error,
    /// Index 2.
    InvalidCommand,
    /// Index 3.
    InvalidParameter,
    /// Index 4.
    TransmitFailure,
}

impl CommandStatus {
    /// Decode a status byte. An out-of-range byte is a protocol
    /// violation, never silently coerced.
    pub fn from_byte(byte: u64) -> Result<Self, ProtocolError> {
        match byte {
            0 => Ok(CommandStatus::Ok),
            1 => Ok(CommandStatus::Error),
            2 => Ok(CommandStatus::InvalidCommand),
            3 => Ok(CommandStatus::InvalidParameter),
            4 => Ok(CommandStatus::TransmitFailure),
            _ => Err(ProtocolError::BadStatus(byte)),
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandStatus::Ok => "OK",
            CommandStatus::Error => "ERROR",
            CommandStatus::InvalidCommand => "INVALID_COMMAND",
            CommandStatus::InvalidParameter => "INVALID_PARAMETER",
            CommandStatus::TransmitFailure => "TRANSMIT_FAILURE",
        };
        f.write_str(name)
    }
}

/// A command parameter, decoded per command where the layout is known and
/// as a packed number otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    /// An unsigned packed number; the only kind with an outbound encoding.
    Number(u64),
    /// An ascii string (NI node names, up to 20 bytes on the wire).
    Text(String),
    /// A voltage reading (`%V`).
    Volts(f64),
    /// A node-discovery record (ND).
    NodeDiscover(NodeDiscoverRecord),
    /// A forced-sample reading (IS).
    InputSample(InputSampleReading),
}

/// An AT command request or its response, correlated by frame ID.
#[derive(Debug, Clone)]
pub struct Command {
    frame_type: FrameType,
    frame_id: u8,
    name: CommandName,
    parameter: Option<Parameter>,
    status: Option<CommandStatus>,
    remote_network_address: Option<u16>,
    remote_serial: Option<u64>,
}

impl Command {
    /// Construct an outbound local command, allocating a fresh frame ID
    /// from the session.
    pub fn request(session: &Session, name: CommandName) -> Self {
        Command {
            frame_type: FrameType::At,
            frame_id: session.allocate_frame_id(),
            name,
            parameter: None,
            status: None,
            remote_network_address: None,
            remote_serial: None,
        }
    }

    /// Construct an outbound command addressed to a remote node by its
    /// 64-bit serial.
    pub fn remote_request(session: &Session, name: CommandName, dest_serial: u64) -> Self {
        let mut command = Self::request(session, name);
        command.remote_serial = Some(dest_serial);
        command
    }

    /// The request/response frame type.
    pub fn frame_type(&self) -> FrameType {
        self.frame_type
    }

    /// The frame ID: freshly allocated for a request, echoed from the
    /// request for a response.
    pub fn frame_id(&self) -> u8 {
        self.frame_id
    }

    /// The AT command name.
    pub fn name(&self) -> CommandName {
        self.name
    }

    /// Whether this is a response to something we sent.
    pub fn is_response(&self) -> bool {
        self.frame_type.is_response()
    }

    /// Whether the command involves a remote node.
    pub fn is_remote(&self) -> bool {
        self.remote_serial.is_some()
    }

    /// 16-bit network address of a remote responder.
    pub fn remote_network_address(&self) -> Option<u16> {
        self.remote_network_address
    }

    /// 64-bit serial of the remote node, destination or responder.
    pub fn remote_serial(&self) -> Option<u64> {
        self.remote_serial
    }

    /// The response status, present only on a parsed response.
    pub fn status(&self) -> Option<CommandStatus> {
        self.status
    }

    /// The decoded parameter, if any.
    pub fn parameter(&self) -> Option<&Parameter> {
        self.parameter.as_ref()
    }

    /// Set the parameter to send with a request.
    pub fn set_parameter(&mut self, parameter: Parameter) {
        self.parameter = Some(parameter);
    }

    /// Set a numeric parameter, chaining.
    pub fn with_parameter(mut self, value: u64) -> Self {
        self.set_parameter(Parameter::Number(value));
        self
    }

    /// Address the command to a remote node. Remote addressing is only
    /// valid on a request about to be sent, never on a parsed response.
    pub fn set_destination(&mut self, dest_serial: u64) -> Result<(), ProtocolError> {
        if self.is_response() {
            return Err(ProtocolError::DestinationOnResponse);
        }
        self.remote_serial = Some(dest_serial);
        Ok(())
    }

    /// Named field values for diagnostics and formatting.
    pub fn named_values(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        if let Some(addr) = self.remote_network_address {
            values.insert("remoteAddr".to_owned(), format!("{addr:#x}"));
        }
        if let Some(serial) = self.remote_serial {
            values.insert("remoteSerial".to_owned(), format!("{serial:#x}"));
        }
        if let Some(parameter) = &self.parameter {
            let formatted = match parameter {
                Parameter::Number(n) => format!("{n:#x}"),
                Parameter::Text(text) => format!("{text:?}"),
                Parameter::Volts(v) => format!("{v:.3}V"),
                Parameter::NodeDiscover(record) => format!("{record:?}"),
                Parameter::InputSample(reading) => format!("{reading:?}"),
            };
            values.insert("parameter".to_owned(), formatted);
        }
        values
    }

    /// Send this command through an explicitly supplied transport. The
    /// caller owns serialization of that transport.
    pub fn send_with(&self, transport: &mut dyn Transport) -> Result<(), ProtocolError> {
        log::debug!("sending {self}");
        let encoded = self.encoded()?;
        match self.remote_serial {
            Some(serial) => {
                transport.send_remote_at(&encoded, xh_encoding::number_to_serial_bytes(serial))
            }
            None => transport.send_at(&encoded),
        }
    }

    /// Send this command through the session's registered transport,
    /// serialized under the session's send lock. Fails with
    /// [`ProtocolError::NoTransport`] if none is registered.
    pub fn send(&self, session: &Session) -> Result<(), ProtocolError> {
        log::debug!("sending {self}");
        session.send_encoded(&self.encoded()?, self.remote_serial)
    }

    fn encoded(&self) -> Result<EncodedCommand, ProtocolError> {
        let parameter = match &self.parameter {
            None => None,
            Some(Parameter::Number(n)) => Some(xh_encoding::number_to_bytes(*n)),
            Some(other) => {
                return Err(ProtocolError::UnencodableParameter(format!("{other:?}")))
            }
        };
        Ok(EncodedCommand {
            command: self.name.as_str(),
            frame_id: vec![self.frame_id],
            parameter,
        })
    }

    /// Build a command from a parsed response dictionary. Used only by
    /// dispatch; reuses the echoed frame ID so the caller can correlate
    /// the response with the request that produced it.
    pub(crate) fn create_from_dict(
        registries: &Registries,
        frame_type: FrameType,
        dict: &mut FrameDict,
    ) -> Result<Self, ProtocolError> {
        let frame_id_bytes = dict.require_bytes(FIELD_FRAME_ID)?;
        let frame_id = xh_encoding::bytes_to_number(&frame_id_bytes)?;
        if !(u64::from(MIN_FRAME_ID)..=u64::from(MAX_FRAME_ID)).contains(&frame_id) {
            return Err(ProtocolError::FrameIdOutOfRange(frame_id));
        }

        let name_text = dict.require_text(FIELD_COMMAND)?;
        let name = CommandName::from_ascii(&name_text)?;

        let mut command = Command {
            frame_type,
            frame_id: frame_id as u8,
            name,
            parameter: None,
            status: None,
            remote_network_address: None,
            remote_serial: None,
        };

        if let Some(status) = dict.take_bytes(FIELD_STATUS)? {
            let byte = xh_encoding::bytes_to_number(&status)?;
            command.status = Some(CommandStatus::from_byte(byte)?);
        }

        if let Some(source) = dict.take_bytes(FIELD_SOURCE_ADDR)? {
            let address = xh_encoding::bytes_to_number(&source)?;
            command.remote_network_address =
                Some(
                    u16::try_from(address).map_err(|_| ProtocolError::FieldOutOfRange {
                        field: FIELD_SOURCE_ADDR,
                        value: address,
                    })?,
                );
            let serial = dict.require_bytes(FIELD_SOURCE_ADDR_LONG)?;
            command.remote_serial = Some(xh_encoding::bytes_to_number(&serial)?);
        }

        if let Some(raw) = dict.take_bytes(FIELD_PARAMETER)? {
            command.parameter = Some(command.parse_parameter(registries, &raw)?);
        }

        Ok(command)
    }

    /// Parse a response parameter through the command-name registry, or
    /// as a packed number when no class-specific parser is bound.
    fn parse_parameter(
        &self,
        registries: &Registries,
        encoded: &[u8],
    ) -> Result<Parameter, ProtocolError> {
        if let Some(parser) = registries.parameter_parsers().resolve(&self.name) {
            return parser(encoded);
        }
        let number = xh_encoding::bytes_to_number(encoded)?;
        if !self.name.parses_as_number() {
            log::warn!(
                "uncertain conversion of encoded parameter {encoded:02x?} to number {number:#x} \
                 for command {}",
                self.name
            );
        }
        Ok(Parameter::Number(number))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.frame_id, self.name)?;
        if let Some(status) = self.status {
            write!(f, " ({status})")?;
        }
        f.write_str(&format_named_values(&self.named_values()))
    }
}

/// Parameter parser registered for the `%V` supply-voltage command.
pub(crate) fn parse_input_volts_parameter(encoded: &[u8]) -> Result<Parameter, ProtocolError> {
    let counts = xh_encoding::bytes_to_number(encoded)?;
    Ok(Parameter::Volts(xh_encoding::number_to_volts(counts)))
}

/// Parameter parser registered for the NI node-name command. Node names
/// can run past the 8-byte width a packed number allows, so they decode
/// as text.
pub(crate) fn parse_node_identifier_parameter(encoded: &[u8]) -> Result<Parameter, ProtocolError> {
    let text = String::from_utf8(encoded.to_vec()).map_err(|_| ProtocolError::InvalidUtf8)?;
    Ok(Parameter::Text(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldValue;

    fn response_dict(name: &str, frame_id: u8) -> FrameDict {
        FrameDict::new()
            .with(FIELD_FRAME_ID, FieldValue::Bytes(vec![frame_id]))
            .with(FIELD_COMMAND, FieldValue::Text(name.to_owned()))
    }

    #[test]
    fn test_name_ascii_roundtrip() {
        for name in [
            CommandName::InputVolts,
            CommandName::D0,
            CommandName::ID,
            CommandName::ND,
            CommandName::SupplyThreshold,
            CommandName::WR,
        ] {
            assert_eq!(CommandName::from_ascii(name.as_str()).unwrap(), name);
        }
        assert!(matches!(
            CommandName::from_ascii("ZZ"),
            Err(ProtocolError::UnknownCommandName(_))
        ));
    }

    #[test]
    fn test_status_from_byte() {
        assert_eq!(CommandStatus::from_byte(0).unwrap(), CommandStatus::Ok);
        assert_eq!(
            CommandStatus::from_byte(4).unwrap(),
            CommandStatus::TransmitFailure
        );
        assert_eq!(
            CommandStatus::from_byte(5).unwrap_err(),
            ProtocolError::BadStatus(5)
        );
    }

    #[test]
    fn test_request_allocates_sequential_ids() {
        let session = Session::default();
        let first = Command::request(&session, CommandName::ID);
        let second = Command::request(&session, CommandName::NT);
        assert_eq!(first.frame_id(), 1);
        assert_eq!(second.frame_id(), 2);
        assert_eq!(first.frame_type(), FrameType::At);
        assert!(!first.is_response());
    }

    #[test]
    fn test_create_from_dict_parses_status_and_parameter() {
        let session = Session::default();
        let mut dict = response_dict("ID", 7)
            .with(FIELD_STATUS, FieldValue::Bytes(vec![0x00]))
            .with(FIELD_PARAMETER, FieldValue::Bytes(vec![0x3e, 0xf7]));
        let command =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap();
        assert_eq!(command.frame_id(), 7);
        assert_eq!(command.name(), CommandName::ID);
        assert_eq!(command.status(), Some(CommandStatus::Ok));
        assert_eq!(command.parameter(), Some(&Parameter::Number(0x3ef7)));
        assert!(command.is_response());
        assert!(dict.is_empty());
    }

    #[test]
    fn test_create_from_dict_remote_source() {
        let session = Session::default();
        let mut dict = response_dict("NI", 3)
            .with(FIELD_SOURCE_ADDR, FieldValue::Bytes(vec![0x12, 0x34]))
            .with(
                FIELD_SOURCE_ADDR_LONG,
                FieldValue::Bytes(vec![0x00, 0x13, 0xa2, 0x00, 0x12, 0x34, 0x56, 0x78]),
            );
        let command = Command::create_from_dict(
            session.registries(),
            FrameType::RemoteAtResponse,
            &mut dict,
        )
        .unwrap();
        assert_eq!(command.remote_network_address(), Some(0x1234));
        assert_eq!(command.remote_serial(), Some(0x0013_a200_1234_5678));
        assert!(command.is_remote());
    }

    #[test]
    fn test_bad_status_byte_rejected() {
        let session = Session::default();
        let mut dict = response_dict("ID", 1).with(FIELD_STATUS, FieldValue::Bytes(vec![0x09]));
        let err =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap_err();
        assert_eq!(err, ProtocolError::BadStatus(9));
    }

    #[test]
    fn test_frame_id_zero_rejected() {
        let session = Session::default();
        let mut dict = response_dict("ID", 0);
        let err =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap_err();
        assert_eq!(err, ProtocolError::FrameIdOutOfRange(0));
    }

    #[test]
    fn test_destination_only_on_requests() {
        let session = Session::default();
        let mut request = Command::request(&session, CommandName::NI);
        request.set_destination(0x0013_a200_dead_beef).unwrap();
        assert!(request.is_remote());

        let mut dict = response_dict("NI", 2);
        let mut response =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap();
        assert_eq!(
            response.set_destination(0x0013_a200_dead_beef).unwrap_err(),
            ProtocolError::DestinationOnResponse
        );
    }

    #[test]
    fn test_node_name_longer_than_a_packed_number() {
        // Node names run up to 20 bytes, well past the 8-byte packed-number
        // width, and must still decode.
        let session = Session::default();
        let mut dict = response_dict("NI", 4)
            .with(FIELD_PARAMETER, FieldValue::Bytes(b"LivingRoom".to_vec()));
        let command =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap();
        assert_eq!(
            command.parameter(),
            Some(&Parameter::Text("LivingRoom".to_owned()))
        );
    }

    #[test]
    fn test_node_name_rejects_invalid_utf8() {
        let session = Session::default();
        let mut dict =
            response_dict("NI", 4).with(FIELD_PARAMETER, FieldValue::Bytes(vec![0xff, 0xfe]));
        let err =
            Command::create_from_dict(session.registries(), FrameType::AtResponse, &mut dict)
                .unwrap_err();
        assert_eq!(err, ProtocolError::InvalidUtf8);
    }

    #[test]
    fn test_input_volts_parameter() {
        let parameter = parse_input_volts_parameter(&[0x02, 0x00]).unwrap();
        match parameter {
            Parameter::Volts(volts) => assert!((volts - 512.0 / 1024.0 * 1.2).abs() < 1e-9),
            other => panic!("expected volts, got {other:?}"),
        }
    }

    #[test]
    fn test_display() {
        let session = Session::default();
        let command = Command::request(&session, CommandName::ND);
        assert_eq!(format!("{command}"), "#1 ND");
    }
}
