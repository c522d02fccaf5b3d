//! Unsolicited IO sample frames and the typed pin readings inside them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::constants::*;
use crate::dispatch::Registries;
use crate::error::ProtocolError;
use crate::fields::{FrameDict, SampleValue};
use crate::frame::format_named_values;

/// The two kinds of pin a sample key can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinType {
    /// Analog sample.
    Adc,
    /// Digital sample.
    Dio,
}

impl PinType {
    /// The tag used in sample keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            PinType::Adc => "adc",
            PinType::Dio => "dio",
        }
    }

    /// Parse a sample-key tag.
    pub fn from_tag(tag: &str) -> Result<Self, ProtocolError> {
        match tag {
            "adc" => Ok(PinType::Adc),
            "dio" => Ok(PinType::Dio),
            _ => Err(ProtocolError::UnknownPinType(tag.to_owned())),
        }
    }
}

/// Analog channel number reserved for the supply-voltage reading. Pin 7 is
/// not a normal AD channel; it aliases VCC.
const VCC_PIN_NUMBER: u8 = 7;

/// The known module pins a sample can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pin {
    Ad0,
    Ad1,
    Ad2,
    Ad3,
    /// Supply voltage, sampled as analog channel 7.
    Vcc,
    Dio0,
    Dio1,
    Dio2,
    Dio3,
    Dio4,
    Dio5,
    Dio6,
    Dio7,
    Dio10,
    Dio11,
    Dio12,
}

impl Pin {
    /// Resolve an analog channel number to a pin.
    pub fn analog(number: u8) -> Result<Self, ProtocolError> {
        match number {
            0 => Ok(Pin::Ad0),
            1 => Ok(Pin::Ad1),
            2 => Ok(Pin::Ad2),
            3 => Ok(Pin::Ad3),
            VCC_PIN_NUMBER => Ok(Pin::Vcc),
            _ => Err(ProtocolError::UnknownPin {
                pin_type: PinType::Adc.as_str(),
                number,
            }),
        }
    }

    /// Resolve a digital channel number to a pin.
    pub fn digital(number: u8) -> Result<Self, ProtocolError> {
        match number {
            0 => Ok(Pin::Dio0),
            1 => Ok(Pin::Dio1),
            2 => Ok(Pin::Dio2),
            3 => Ok(Pin::Dio3),
            4 => Ok(Pin::Dio4),
            5 => Ok(Pin::Dio5),
            6 => Ok(Pin::Dio6),
            7 => Ok(Pin::Dio7),
            10 => Ok(Pin::Dio10),
            11 => Ok(Pin::Dio11),
            12 => Ok(Pin::Dio12),
            _ => Err(ProtocolError::UnknownPin {
                pin_type: PinType::Dio.as_str(),
                number,
            }),
        }
    }

    /// The pin's printed name.
    pub fn name(&self) -> &'static str {
        match self {
            Pin::Ad0 => "AD0",
            Pin::Ad1 => "AD1",
            Pin::Ad2 => "AD2",
            Pin::Ad3 => "AD3",
            Pin::Vcc => "VCC",
            Pin::Dio0 => "DIO0",
            Pin::Dio1 => "DIO1",
            Pin::Dio2 => "DIO2",
            Pin::Dio3 => "DIO3",
            Pin::Dio4 => "DIO4",
            Pin::Dio5 => "DIO5",
            Pin::Dio6 => "DIO6",
            Pin::Dio7 => "DIO7",
            Pin::Dio10 => "DIO10",
            Pin::Dio11 => "DIO11",
            Pin::Dio12 => "DIO12",
        }
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pin reading inside a Data frame. Immutable once decoded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    /// A voltage measured on an analog input. With the exception of VCC,
    /// the maximum an ADC pin can sense is 1.2 V.
    Analog {
        /// Pin the reading came from.
        pin: Pin,
        /// Measured voltage.
        volts: f64,
    },
    /// A level read on a digital input.
    Digital {
        /// Pin the reading came from.
        pin: Pin,
        /// Whether the pin was high.
        is_set: bool,
    },
}

impl Sample {
    /// The pin the reading came from.
    pub fn pin(&self) -> Pin {
        match self {
            Sample::Analog { pin, .. } | Sample::Digital { pin, .. } => *pin,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sample::Analog { pin, volts } => write!(f, "AnalogSample({pin}, volts={volts:.3})"),
            Sample::Digital { pin, is_set } => write!(f, "DigitalSample({pin}, {is_set})"),
        }
    }
}

/// Build an analog sample from a raw sample-dictionary reading.
pub fn analog_sample_from_raw(number: u8, value: &SampleValue) -> Result<Sample, ProtocolError> {
    let counts = match value {
        SampleValue::Number(n) => *n,
        SampleValue::Bool(_) => return Err(ProtocolError::NonNumericAnalogSample(number)),
    };
    Ok(Sample::Analog {
        pin: Pin::analog(number)?,
        volts: xh_encoding::number_to_volts(counts),
    })
}

/// Build a digital sample from a raw sample-dictionary reading. Accepts a
/// boolean or a raw 0/1 numeric level.
pub fn digital_sample_from_raw(number: u8, value: &SampleValue) -> Result<Sample, ProtocolError> {
    let is_set = match value {
        SampleValue::Bool(b) => *b,
        SampleValue::Number(0) => false,
        SampleValue::Number(1) => true,
        SampleValue::Number(n) => return Err(ProtocolError::InvalidDigitalLevel(*n)),
    };
    Ok(Sample::Digital {
        pin: Pin::digital(number)?,
        is_set,
    })
}

/// An unsolicited IO-sample frame from a remote node.
#[derive(Debug, Clone)]
pub struct Data {
    timestamp: DateTime<Utc>,
    source_address: u16,
    source_address_long: u64,
    samples: Vec<Sample>,
}

impl Data {
    /// Display format for the decode timestamp. Ex: `2012 Jun 17 23:24:18 UTC`.
    pub const DATETIME_FORMAT: &'static str = "%Y %b %d %H:%M:%S UTC";

    /// UTC instant the frame was decoded. Presentation metadata for
    /// diagnostic ordering, not part of the wire format.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The decode timestamp in [`Self::DATETIME_FORMAT`].
    pub fn format_timestamp(&self) -> String {
        self.timestamp.format(Self::DATETIME_FORMAT).to_string()
    }

    /// 16-bit network address of the sending node.
    pub fn source_address(&self) -> u16 {
        self.source_address
    }

    /// 64-bit serial of the sending node.
    pub fn source_address_long(&self) -> u64 {
        self.source_address_long
    }

    /// The decoded pin readings, in dictionary order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Named field values for diagnostics and formatting.
    pub fn named_values(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        values.insert(
            "sourceAddress".to_owned(),
            format!("{:#x}", self.source_address),
        );
        values.insert(
            "sourceAddressLong".to_owned(),
            format!("{:#x}", self.source_address_long),
        );
        if !self.samples.is_empty() {
            let samples = self
                .samples
                .iter()
                .map(Sample::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            values.insert("samples".to_owned(), format!("[{samples}]"));
        }
        values
    }

    pub(crate) fn create_from_dict(
        registries: &Registries,
        dict: &mut FrameDict,
    ) -> Result<Self, ProtocolError> {
        let source = dict.require_bytes(FIELD_SOURCE_ADDR)?;
        let source = xh_encoding::bytes_to_number(&source)?;
        let source_address =
            u16::try_from(source).map_err(|_| ProtocolError::FieldOutOfRange {
                field: FIELD_SOURCE_ADDR,
                value: source,
            })?;

        let source_long = dict.require_bytes(FIELD_SOURCE_ADDR_LONG)?;
        let source_address_long = xh_encoding::bytes_to_number(&source_long)?;

        let mut samples = Vec::new();
        for sample_dict in dict.require_samples(FIELD_SAMPLES)? {
            for (key, value) in &sample_dict {
                samples.push(sample_from_key(registries, key, value)?);
            }
        }

        Ok(Data {
            timestamp: Utc::now(),
            source_address,
            source_address_long,
            samples,
        })
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "data {}{}",
            self.format_timestamp(),
            format_named_values(&self.named_values())
        )
    }
}

/// Decode one `<pintype>-<pinnumber>` keyed reading through the sample
/// registry.
fn sample_from_key(
    registries: &Registries,
    key: &str,
    value: &SampleValue,
) -> Result<Sample, ProtocolError> {
    let (tag, number) = key
        .split_once('-')
        .ok_or_else(|| ProtocolError::BadSampleKey(key.to_owned()))?;
    let number: u8 = number
        .parse()
        .map_err(|_| ProtocolError::BadSampleKey(key.to_owned()))?;
    let pin_type = PinType::from_tag(tag)?;
    let factory = registries
        .samples()
        .resolve(&pin_type)
        .ok_or_else(|| ProtocolError::UnknownPinType(tag.to_owned()))?;
    factory(number, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{FieldValue, SampleDict};

    fn sample_dict(entries: &[(&str, SampleValue)]) -> SampleDict {
        entries
            .iter()
            .map(|(key, value)| ((*key).to_owned(), *value))
            .collect()
    }

    #[test]
    fn test_create_from_dict() {
        let registries = Registries::standard();
        let mut dict = FrameDict::new()
            .with(FIELD_SOURCE_ADDR, FieldValue::Bytes(vec![0x12, 0x34]))
            .with(
                FIELD_SOURCE_ADDR_LONG,
                FieldValue::Bytes(vec![0x00, 0x13, 0xa2, 0x00, 0x12, 0x34, 0x56, 0x78]),
            )
            .with(
                FIELD_SAMPLES,
                FieldValue::Samples(vec![sample_dict(&[
                    ("adc-1", SampleValue::Number(512)),
                    ("dio-4", SampleValue::Number(1)),
                ])]),
            );

        let data = Data::create_from_dict(&registries, &mut dict).unwrap();
        assert_eq!(data.source_address(), 0x1234);
        assert_eq!(data.source_address_long(), 0x0013_a200_1234_5678);
        assert_eq!(data.samples().len(), 2);
        match data.samples()[0] {
            Sample::Analog { pin, volts } => {
                assert_eq!(pin, Pin::Ad1);
                assert!((volts - 0.6).abs() < 1e-9);
            }
            ref other => panic!("expected analog sample, got {other:?}"),
        }
        assert_eq!(
            data.samples()[1],
            Sample::Digital {
                pin: Pin::Dio4,
                is_set: true,
            }
        );
        assert!(dict.is_empty());
    }

    #[test]
    fn test_analog_pin_seven_is_vcc() {
        let sample = analog_sample_from_raw(7, &SampleValue::Number(1023)).unwrap();
        assert_eq!(sample.pin(), Pin::Vcc);
    }

    #[test]
    fn test_digital_accepts_bool_and_numeric() {
        let from_bool = digital_sample_from_raw(1, &SampleValue::Bool(true)).unwrap();
        let from_number = digital_sample_from_raw(1, &SampleValue::Number(1)).unwrap();
        assert_eq!(from_bool, from_number);

        assert_eq!(
            digital_sample_from_raw(1, &SampleValue::Number(2)).unwrap_err(),
            ProtocolError::InvalidDigitalLevel(2)
        );
    }

    #[test]
    fn test_unknown_pin_rejected() {
        assert_eq!(
            analog_sample_from_raw(5, &SampleValue::Number(0)).unwrap_err(),
            ProtocolError::UnknownPin {
                pin_type: "adc",
                number: 5,
            }
        );
        assert!(Pin::digital(8).is_err());
        assert!(Pin::digital(13).is_err());
    }

    #[test]
    fn test_bad_sample_key() {
        let registries = Registries::standard();
        let err = sample_from_key(&registries, "adc3", &SampleValue::Number(0)).unwrap_err();
        assert_eq!(err, ProtocolError::BadSampleKey("adc3".to_owned()));

        let err = sample_from_key(&registries, "pwm-0", &SampleValue::Number(0)).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownPinType("pwm".to_owned()));
    }
}
