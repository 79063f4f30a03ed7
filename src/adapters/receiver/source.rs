//! Input sources and the capabilities each one exposes.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use crate::error::ReceiverError;

/// The nine inputs the receiver offers, as presented to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    Optical,
    #[serde(rename = "CD")]
    Cd,
    Spotify,
    #[serde(rename = "Line 1")]
    Line1,
    #[serde(rename = "Line 2")]
    Line2,
    #[serde(rename = "Line 3")]
    Line3,
    #[serde(rename = "Net Radio")]
    NetRadio,
    Server,
    Tuner,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::Optical,
        Source::Cd,
        Source::Spotify,
        Source::Line1,
        Source::Line2,
        Source::Line3,
        Source::NetRadio,
        Source::Server,
        Source::Tuner,
    ];

    /// Host-facing name.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Optical => "Optical",
            Self::Cd => "CD",
            Self::Spotify => "Spotify",
            Self::Line1 => "Line 1",
            Self::Line2 => "Line 2",
            Self::Line3 => "Line 3",
            Self::NetRadio => "Net Radio",
            Self::Server => "Server",
            Self::Tuner => "Tuner",
        }
    }

    /// Token used in `Input_Sel`.
    pub fn native_code(&self) -> &'static str {
        match self {
            Self::Optical => "OPTICAL",
            Self::Cd => "CD",
            Self::Spotify => "Spotify",
            Self::Line1 => "LINE1",
            Self::Line2 => "LINE2",
            Self::Line3 => "LINE3",
            Self::NetRadio => "NET RADIO",
            Self::Server => "SERVER",
            Self::Tuner => "TUNER",
        }
    }

    pub fn from_native(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.native_code() == code)
    }

    /// Native token with spaces replaced by underscores (`NET_RADIO`).
    pub fn device_source(&self) -> String {
        device_source_token(self.native_code())
    }

    /// Element name under which play info and play control live, if the
    /// source has any.
    pub fn play_info_endpoint(&self) -> Option<&'static str> {
        play_info_endpoint(&self.device_source())
    }

    pub fn features(&self) -> Features {
        match self {
            Self::Optical | Self::Cd | Self::Line1 | Self::Line2 | Self::Line3 => Features::BASE,
            Self::Tuner => {
                Features::BASE
                    | Features::NEXT_TRACK
                    | Features::PREVIOUS_TRACK
                    | Features::PLAY_MEDIA
            }
            Self::Spotify => Features::BASE | Features::TRANSPORT,
            Self::NetRadio | Self::Server => {
                Features::BASE | Features::TRANSPORT | Features::PLAY_MEDIA | Features::BROWSE_MEDIA
            }
        }
    }

    pub fn content_type(&self) -> MediaContentType {
        match self {
            Self::NetRadio | Self::Tuner => MediaContentType::Channel,
            _ => MediaContentType::Playlist,
        }
    }

    /// Sources with a browsable menu tree.
    pub fn is_browsable(&self) -> bool {
        self.features().contains(Features::BROWSE_MEDIA)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Source {
    type Err = ReceiverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|source| source.label() == s)
            .ok_or_else(|| ReceiverError::UnknownSource(s.to_string()))
    }
}

pub fn device_source_token(native: &str) -> String {
    native.replace(' ', "_")
}

/// Map a device source token to its play-info / play-control element.
pub fn play_info_endpoint(device_source: &str) -> Option<&'static str> {
    match device_source {
        "Spotify" => Some("Spotify"),
        "NET_RADIO" => Some("NET_RADIO"),
        "SERVER" => Some("SERVER"),
        "TUNER" => Some("Tuner"),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaContentType {
    Channel,
    Playlist,
}

/// Bitset of host operations valid for the current source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Features(u32);

impl Features {
    pub const VOLUME_SET: Features = Features(1 << 0);
    pub const VOLUME_MUTE: Features = Features(1 << 1);
    pub const TURN_ON: Features = Features(1 << 2);
    pub const TURN_OFF: Features = Features(1 << 3);
    pub const SELECT_SOURCE: Features = Features(1 << 4);
    pub const PLAY: Features = Features(1 << 5);
    pub const PAUSE: Features = Features(1 << 6);
    pub const STOP: Features = Features(1 << 7);
    pub const NEXT_TRACK: Features = Features(1 << 8);
    pub const PREVIOUS_TRACK: Features = Features(1 << 9);
    pub const SHUFFLE_SET: Features = Features(1 << 10);
    pub const PLAY_MEDIA: Features = Features(1 << 11);
    pub const BROWSE_MEDIA: Features = Features(1 << 12);

    pub const BASE: Features = Features(
        Self::VOLUME_SET.0
            | Self::VOLUME_MUTE.0
            | Self::TURN_ON.0
            | Self::TURN_OFF.0
            | Self::SELECT_SOURCE.0,
    );

    pub const TRANSPORT: Features = Features(
        Self::PLAY.0
            | Self::PAUSE.0
            | Self::STOP.0
            | Self::NEXT_TRACK.0
            | Self::PREVIOUS_TRACK.0
            | Self::SHUFFLE_SET.0,
    );

    const NAMES: [(Features, &'static str); 13] = [
        (Self::VOLUME_SET, "volume_set"),
        (Self::VOLUME_MUTE, "volume_mute"),
        (Self::TURN_ON, "turn_on"),
        (Self::TURN_OFF, "turn_off"),
        (Self::SELECT_SOURCE, "select_source"),
        (Self::PLAY, "play"),
        (Self::PAUSE, "pause"),
        (Self::STOP, "stop"),
        (Self::NEXT_TRACK, "next_track"),
        (Self::PREVIOUS_TRACK, "previous_track"),
        (Self::SHUFFLE_SET, "shuffle_set"),
        (Self::PLAY_MEDIA, "play_media"),
        (Self::BROWSE_MEDIA, "browse_media"),
    ];

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(&self, other: Features) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn names(&self) -> Vec<&'static str> {
        Self::NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }
}

impl BitOr for Features {
    type Output = Features;

    fn bitor(self, rhs: Self) -> Self::Output {
        Features(self.0 | rhs.0)
    }
}

impl Serialize for Features {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.names())
    }
}
