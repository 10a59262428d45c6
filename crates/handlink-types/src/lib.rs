use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Which hand a frame reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Protocol spelling of the side field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Left => "Left",
            Side::Right => "Right",
        }
    }

    /// Parse the protocol spelling.  Matching is exact (case-sensitive).
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Left" => Some(Side::Left),
            "Right" => Some(Side::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A principal local axis of a rig transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One degree of freedom reported by the sensor glove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    IndexFlex,
    MiddleFlex,
    RingFlex,
    PinkyFlex,
    ThumbFlex,
    RotateX,
    RotateY,
    RotateZ,
    TranslateX,
    TranslateY,
    TranslateZ,
}

impl Channel {
    /// Number of channels.
    pub const COUNT: usize = 11;

    /// Every channel, in declaration order.
    pub const ALL: [Channel; Channel::COUNT] = [
        Channel::IndexFlex,
        Channel::MiddleFlex,
        Channel::RingFlex,
        Channel::PinkyFlex,
        Channel::ThumbFlex,
        Channel::RotateX,
        Channel::RotateY,
        Channel::RotateZ,
        Channel::TranslateX,
        Channel::TranslateY,
        Channel::TranslateZ,
    ];

    /// Dense index of this channel, usable as an array slot.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Label used for this channel on the wire.
    pub fn label(self) -> &'static str {
        match self {
            Channel::IndexFlex => "Index",
            Channel::MiddleFlex => "Middle",
            Channel::RingFlex => "Ring",
            Channel::PinkyFlex => "Pinky",
            Channel::ThumbFlex => "Thumb",
            Channel::RotateX => "RotateX",
            Channel::RotateY => "RotateY",
            Channel::RotateZ => "RotateZ",
            Channel::TranslateX => "TranslateX",
            Channel::TranslateY => "TranslateY",
            Channel::TranslateZ => "TranslateZ",
        }
    }

    /// Resolve a wire label.  Returns `None` for labels the glove firmware
    /// does not define.
    pub fn from_label(label: &str) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.label() == label)
    }

    /// `true` for the five finger-flex channels.
    pub fn is_finger(self) -> bool {
        matches!(
            self,
            Channel::IndexFlex
                | Channel::MiddleFlex
                | Channel::RingFlex
                | Channel::PinkyFlex
                | Channel::ThumbFlex
        )
    }

    /// Local axis driven by a wrist rotation or translation channel.
    /// Finger channels return `None`.
    pub fn axis(self) -> Option<Axis> {
        match self {
            Channel::RotateX | Channel::TranslateX => Some(Axis::X),
            Channel::RotateY | Channel::TranslateY => Some(Axis::Y),
            Channel::RotateZ | Channel::TranslateZ => Some(Axis::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Channel field of a decoded frame, resolved once at decode time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChannelLabel {
    Known(Channel),
    /// A well-formed frame carrying a label outside the [`Channel`] set.
    Unrecognized(String),
}

impl ChannelLabel {
    pub fn resolve(label: &str) -> Self {
        match Channel::from_label(label) {
            Some(channel) => ChannelLabel::Known(channel),
            None => ChannelLabel::Unrecognized(label.to_string()),
        }
    }
}

/// One decoded telemetry frame.  Immutable once created; ownership moves
/// from the I/O context to the simulation context through the ingest queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub side: Side,
    pub channel: ChannelLabel,
    pub raw_value: f32,
}

/// Lifecycle state of the telemetry link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Closing => "closing",
        };
        f.write_str(s)
    }
}

/// Opaque handle to a transient object spawned in the scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectId(pub Uuid);

impl ObjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Notification published by the telemetry link on the I/O context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEvent {
    /// Connection attempt this event belongs to.
    pub session: Uuid,
    pub timestamp: DateTime<Utc>,
    pub payload: LinkPayload,
}

/// Variants of data carried by a [`LinkEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LinkPayload {
    StateChanged(LinkState),
    /// A raw text frame arrived.  Carries the frame so observers can log or
    /// record it; decoding happens separately.
    Frame(String),
    Error(HandError),
}

/// Error type for every stage of the telemetry pipeline.  None of these are
/// fatal: the pipeline drops bad input and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandError {
    #[error("Transport Error: {0}")]
    Transport(String),

    #[error("Protocol Error in frame {frame:?}: {reason}")]
    Protocol { frame: String, reason: String },

    #[error("Unknown Channel: {0}")]
    UnknownChannel(String),

    #[error("No target bound for channel {0}")]
    Binding(Channel),

    #[error("Scene Error on {target}: {details}")]
    Scene { target: String, details: String },

    #[error("Configuration Error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_labels_roundtrip() {
        for channel in Channel::ALL {
            assert_eq!(Channel::from_label(channel.label()), Some(channel));
        }
        assert_eq!(Channel::from_label("Wrist"), None);
        // Labels are case-sensitive on the wire.
        assert_eq!(Channel::from_label("index"), None);
    }

    #[test]
    fn channel_indices_are_dense() {
        for (i, channel) in Channel::ALL.iter().enumerate() {
            assert_eq!(channel.index(), i);
        }
    }

    #[test]
    fn finger_and_axis_partition() {
        let fingers = Channel::ALL.iter().filter(|c| c.is_finger()).count();
        assert_eq!(fingers, 5);
        for channel in Channel::ALL {
            assert_eq!(channel.is_finger(), channel.axis().is_none());
        }
        assert_eq!(Channel::RotateZ.axis(), Some(Axis::Z));
        assert_eq!(Channel::TranslateX.axis(), Some(Axis::X));
    }

    #[test]
    fn channel_label_resolve() {
        assert_eq!(ChannelLabel::resolve("Ring"), ChannelLabel::Known(Channel::RingFlex));
        assert_eq!(
            ChannelLabel::resolve("Elbow"),
            ChannelLabel::Unrecognized("Elbow".to_string())
        );
    }

    #[test]
    fn side_parsing_is_exact() {
        assert_eq!(Side::from_label("Left"), Some(Side::Left));
        assert_eq!(Side::from_label("Right"), Some(Side::Right));
        assert_eq!(Side::from_label("left"), None);
    }

    #[test]
    fn link_event_roundtrip() {
        let event = LinkEvent {
            session: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload: LinkPayload::Error(HandError::Transport("refused".to_string())),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: LinkEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event.session, back.session);
        match back.payload {
            LinkPayload::Error(HandError::Transport(msg)) => assert_eq!(msg, "refused"),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn hand_error_display() {
        let err = HandError::Protocol {
            frame: "Left:Index".to_string(),
            reason: "expected at least 3 fields".to_string(),
        };
        assert!(err.to_string().contains("Left:Index"));
        assert!(HandError::Binding(Channel::ThumbFlex).to_string().contains("Thumb"));
    }
}
