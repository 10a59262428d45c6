//! Frame decoder for the glove's text protocol.
//!
//! One WebSocket text message is one frame:
//!
//! ```text
//! Side:Channel:Value[:ignored...]
//! Left:Index:42.5
//! ```
//!
//! | Condition | Outcome |
//! |---|---|
//! | fewer than 3 fields | [`HandError::Protocol`], frame dropped |
//! | value not a finite float | [`HandError::Protocol`], frame dropped |
//! | side is not the accepted side | dropped silently |
//! | unknown channel label | record with [`ChannelLabel::Unrecognized`] |
//!
//! Fields are trimmed before interpretation; the firmware ends each line
//! with `\r\n`.

use handlink_types::{ChannelLabel, HandError, Side, TelemetryRecord};
use tracing::{trace, warn};

/// Field delimiter used by the glove firmware.
pub const DEFAULT_DELIMITER: char = ':';

/// Minimum number of fields in a well-formed frame.
const MIN_FIELDS: usize = 3;

/// Stateless frame parser.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    delimiter: char,
    accepted_side: Side,
}

impl FrameDecoder {
    pub fn new(delimiter: char, accepted_side: Side) -> Self {
        Self {
            delimiter,
            accepted_side,
        }
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn accepted_side(&self) -> Side {
        self.accepted_side
    }

    /// Parse one frame.
    ///
    /// Returns `Ok(None)` for well-formed frames about another hand.
    ///
    /// # Errors
    ///
    /// [`HandError::Protocol`] when the frame has too few fields or a
    /// non-numeric value.
    pub fn decode(&self, frame: &str) -> Result<Option<TelemetryRecord>, HandError> {
        let fields: Vec<&str> = frame.split(self.delimiter).map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(protocol_error(
                frame,
                format!("expected at least {MIN_FIELDS} fields, got {}", fields.len()),
            ));
        }

        let raw_value = match fields[2].parse::<f32>() {
            Ok(v) if v.is_finite() => v,
            Ok(_) => return Err(protocol_error(frame, "value is not finite")),
            Err(e) => return Err(protocol_error(frame, format!("bad value {:?}: {e}", fields[2]))),
        };

        let side = match Side::from_label(fields[0]) {
            Some(side) if side == self.accepted_side => side,
            _ => {
                trace!(side = fields[0], "frame for another hand ignored");
                return Ok(None);
            }
        };

        Ok(Some(TelemetryRecord {
            side,
            channel: ChannelLabel::resolve(fields[1]),
            raw_value,
        }))
    }

    /// [`decode`][Self::decode], logging protocol errors as warnings.
    pub fn decode_or_warn(&self, frame: &str) -> Option<TelemetryRecord> {
        match self.decode(frame) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "invalid frame dropped");
                None
            }
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER, Side::Left)
    }
}

fn protocol_error(frame: &str, reason: impl Into<String>) -> HandError {
    HandError::Protocol {
        frame: frame.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handlink_types::Channel;

    fn decode(frame: &str) -> Result<Option<TelemetryRecord>, HandError> {
        FrameDecoder::default().decode(frame)
    }

    #[test]
    fn decodes_left_index() {
        let record = decode("Left:Index:42.5").unwrap().unwrap();
        assert_eq!(record.side, Side::Left);
        assert_eq!(record.channel, ChannelLabel::Known(Channel::IndexFlex));
        assert!((record.raw_value - 42.5).abs() < f32::EPSILON);
    }

    #[test]
    fn trailing_fields_are_ignored() {
        let record = decode("Left:RotateZ:-12:extra:more").unwrap().unwrap();
        assert_eq!(record.channel, ChannelLabel::Known(Channel::RotateZ));
        assert!((record.raw_value + 12.0).abs() < f32::EPSILON);
    }

    #[test]
    fn line_endings_are_trimmed() {
        let record = decode("Left:Thumb:15\r\n").unwrap().unwrap();
        assert_eq!(record.channel, ChannelLabel::Known(Channel::ThumbFlex));
        assert!((record.raw_value - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn too_few_fields_is_protocol_error() {
        assert!(matches!(decode("Left:Index"), Err(HandError::Protocol { .. })));
        assert!(matches!(decode(""), Err(HandError::Protocol { .. })));
    }

    #[test]
    fn non_numeric_value_is_protocol_error() {
        assert!(matches!(decode("Left:Index:abc"), Err(HandError::Protocol { .. })));
        assert!(matches!(decode("Left:Index:"), Err(HandError::Protocol { .. })));
    }

    #[test]
    fn non_finite_value_is_protocol_error() {
        assert!(matches!(decode("Left:Index:NaN"), Err(HandError::Protocol { .. })));
        assert!(matches!(decode("Left:Index:inf"), Err(HandError::Protocol { .. })));
    }

    #[test]
    fn other_sides_are_dropped_silently() {
        assert_eq!(decode("Right:Index:10").unwrap(), None);
        assert_eq!(decode("Both:Index:10").unwrap(), None);
        assert_eq!(decode("left:Index:10").unwrap(), None);
    }

    #[test]
    fn malformed_value_wins_over_foreign_side() {
        // A malformed frame is reported even when it names another hand.
        assert!(decode("Right:Index:abc").is_err());
    }

    #[test]
    fn unknown_label_still_produces_record() {
        let record = decode("Left:Wrist:3").unwrap().unwrap();
        assert_eq!(record.channel, ChannelLabel::Unrecognized("Wrist".to_string()));
    }

    #[test]
    fn custom_delimiter_and_side() {
        let decoder = FrameDecoder::new(',', Side::Right);
        let record = decoder.decode("Right,Pinky,7").unwrap().unwrap();
        assert_eq!(record.side, Side::Right);
        assert_eq!(record.channel, ChannelLabel::Known(Channel::PinkyFlex));
        assert_eq!(decoder.decode("Left,Pinky,7").unwrap(), None);
    }

    #[test]
    fn decode_or_warn_swallows_errors() {
        let decoder = FrameDecoder::default();
        assert!(decoder.decode_or_warn("garbage").is_none());
        assert!(decoder.decode_or_warn("Left:Middle:30").is_some());
    }
}
