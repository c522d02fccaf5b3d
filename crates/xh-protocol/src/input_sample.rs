//! Forced-sample (IS) response parameter parsing.
//!
//! An IS request forces a sample of every configured input pin; a module
//! with no inputs configured responds with an error status instead. The
//! response parameter packs the readings densely:
//!
//! ```text
//! offset  description
//! 0       receive options
//! 1-2     digital channel configuration mask (bit field)
//! 3       analog channel configuration mask (bit field)
//! 4-5     digital sample levels (bit field, matching the channel mask)
//! 6+      one byte per analog channel in the mask, ascending pin order
//! ```

use crate::command::Parameter;
use crate::data::{Pin, Sample};
use crate::error::ProtocolError;

/// The decoded readings from one forced sample.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSampleReading {
    /// Receive options byte: 0x01 = acknowledged, 0x02 = broadcast.
    pub options: u8,
    /// Digital readings first, then analog, each in ascending pin order.
    pub samples: Vec<Sample>,
}

/// Parse an IS response parameter into typed samples.
pub fn parse_input_sample(encoded: &[u8]) -> Result<InputSampleReading, ProtocolError> {
    const HEADER_LEN: usize = 6;
    if encoded.len() < HEADER_LEN {
        return Err(ProtocolError::ParameterTooShort {
            expected: HEADER_LEN,
            actual: encoded.len(),
        });
    }

    let options = encoded[0];
    let digital_pins = xh_encoding::bit_field_to_index_set(&encoded[1..3]);
    let analog_pins = xh_encoding::bit_field_to_index_set(&encoded[3..4]);
    let digital_levels = xh_encoding::bit_field_to_index_set(&encoded[4..6]);

    let analog_bytes = &encoded[HEADER_LEN..];
    if analog_bytes.len() < analog_pins.len() {
        return Err(ProtocolError::ParameterTooShort {
            expected: HEADER_LEN + analog_pins.len(),
            actual: encoded.len(),
        });
    }

    let mut samples = Vec::with_capacity(digital_pins.len() + analog_pins.len());

    // Indices from the 1- and 2-byte masks above are at most 15.
    for &number in &digital_pins {
        samples.push(Sample::Digital {
            pin: Pin::digital(number as u8)?,
            is_set: digital_levels.contains(&number),
        });
    }

    for (&number, &raw) in analog_pins.iter().zip(analog_bytes) {
        let volts = xh_encoding::number_to_volts(u64::from(raw));
        log::debug!("appending analog value {volts} for pin {number}");
        samples.push(Sample::Analog {
            pin: Pin::analog(number as u8)?,
            volts,
        });
    }

    Ok(InputSampleReading { options, samples })
}

/// Parameter parser registered for the IS command.
pub(crate) fn parse_input_sample_parameter(encoded: &[u8]) -> Result<Parameter, ProtocolError> {
    Ok(Parameter::InputSample(parse_input_sample(encoded)?))
}
