//! Frame dispatch: from a raw field dictionary to a concrete frame.

use crate::command::{self, Command, CommandName, Parameter};
use crate::constants::FIELD_ID;
use crate::data::{self, Data, PinType, Sample};
use crate::error::ProtocolError;
use crate::fields::{FrameDict, SampleValue};
use crate::frame::{Frame, FrameType, GenericFrame};
use crate::input_sample;
use crate::node_discover;
use crate::registry::Registry;

/// Builds a concrete frame from a dictionary whose discriminator matched
/// the registered frame type.
pub type FrameFactory =
    fn(&Registries, FrameType, &mut FrameDict) -> Result<Frame, ProtocolError>;

/// Parses a response parameter for one specific command name.
pub type ParameterParser = fn(&[u8]) -> Result<Parameter, ProtocolError>;

/// Builds a typed sample from a pin number and a raw reading.
pub type SampleFactory = fn(u8, &SampleValue) -> Result<Sample, ProtocolError>;

/// The three dispatch registries: frame type to frame class, command name
/// to parameter parser, pin type to sample class. Populated once during
/// setup; read-only (and therefore safe to share across threads) after.
#[derive(Debug)]
pub struct Registries {
    frames: Registry<FrameType, FrameFactory>,
    parameter_parsers: Registry<CommandName, ParameterParser>,
    samples: Registry<PinType, SampleFactory>,
}

impl Registries {
    /// Create an empty registry set.
    pub fn empty() -> Self {
        Registries {
            frames: Registry::new("frame"),
            parameter_parsers: Registry::new("command parameter"),
            samples: Registry::new("sample"),
        }
    }

    /// The standard registrations: command frames for AT responses, data
    /// frames for IO samples, the class-specific parameter parsers, and
    /// both sample classes.
    pub fn standard() -> Self {
        Self::try_standard().expect("standard registrations are duplicate-free")
    }

    fn try_standard() -> Result<Self, ProtocolError> {
        let mut registries = Self::empty();

        registries
            .frames
            .register(FrameType::AtResponse, command_frame_factory)?;
        registries
            .frames
            .register(FrameType::RemoteAtResponse, command_frame_factory)?;
        registries
            .frames
            .register(FrameType::RxIoDataLongAddr, data_frame_factory)?;

        registries.parameter_parsers.register(
            CommandName::InputVolts,
            command::parse_input_volts_parameter,
        )?;
        registries
            .parameter_parsers
            .register(CommandName::IS, input_sample::parse_input_sample_parameter)?;
        registries
            .parameter_parsers
            .register(CommandName::NI, command::parse_node_identifier_parameter)?;
        registries.parameter_parsers.register(
            CommandName::ND,
            node_discover::parse_node_discover_parameter,
        )?;

        registries
            .samples
            .register(PinType::Adc, data::analog_sample_from_raw)?;
        registries
            .samples
            .register(PinType::Dio, data::digital_sample_from_raw)?;

        Ok(registries)
    }

    /// The frame-type registry.
    pub fn frames(&self) -> &Registry<FrameType, FrameFactory> {
        &self.frames
    }

    /// Mutable frame-type registry, for setup-time extension.
    pub fn frames_mut(&mut self) -> &mut Registry<FrameType, FrameFactory> {
        &mut self.frames
    }

    /// The command-name registry.
    pub fn parameter_parsers(&self) -> &Registry<CommandName, ParameterParser> {
        &self.parameter_parsers
    }

    /// Mutable command-name registry, for setup-time extension.
    pub fn parameter_parsers_mut(&mut self) -> &mut Registry<CommandName, ParameterParser> {
        &mut self.parameter_parsers
    }

    /// The pin-type registry.
    pub fn samples(&self) -> &Registry<PinType, SampleFactory> {
        &self.samples
    }

    /// Mutable pin-type registry, for setup-time extension.
    pub fn samples_mut(&mut self) -> &mut Registry<PinType, SampleFactory> {
        &mut self.samples
    }
}

impl Default for Registries {
    fn default() -> Self {
        Self::standard()
    }
}

fn command_frame_factory(
    registries: &Registries,
    frame_type: FrameType,
    dict: &mut FrameDict,
) -> Result<Frame, ProtocolError> {
    Ok(Frame::Command(Command::create_from_dict(
        registries, frame_type, dict,
    )?))
}

fn data_frame_factory(
    registries: &Registries,
    _frame_type: FrameType,
    dict: &mut FrameDict,
) -> Result<Frame, ProtocolError> {
    Ok(Frame::Data(Data::create_from_dict(registries, dict)?))
}

/// Parse one raw field dictionary into a concrete frame.
///
/// Resolves the dictionary's frame-type discriminator through the frame
/// registry and delegates construction to the bound class. A frame type
/// with no registered class falls back to [`GenericFrame`] so the receive
/// path keeps working as the protocol grows; any keys a known class does
/// not consume are logged and dropped.
pub fn parse_frame(registries: &Registries, mut dict: FrameDict) -> Result<Frame, ProtocolError> {
    let api_id = dict.require_text(FIELD_ID)?;

    let factory = FrameType::from_api_id(&api_id)
        .and_then(|frame_type| {
            registries
                .frames()
                .resolve(&frame_type)
                .map(|factory| (frame_type, *factory))
        });

    match factory {
        Some((frame_type, factory)) => {
            let frame = factory(registries, frame_type, &mut dict)?;
            dict.warn_unused(&api_id);
            Ok(frame)
        }
        None => {
            log::warn!("no frame class registered for API frame type {api_id:?}");
            Ok(Frame::Generic(GenericFrame::new(api_id, dict.into_fields())))
        }
    }
}
