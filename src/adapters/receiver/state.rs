//! Receiver state as reconstructed from status and play-info polls.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::browse::{format_path, NavStep};
use super::source::{Features, MediaContentType, Source};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerState {
    Off,
    /// On, but nothing playing.
    Idle,
    Playing,
    #[default]
    Unknown,
}

/// Semantic keys for now-playing metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaKey {
    Artist,
    Song,
    Album,
    Station,
    Genre,
    Description,
    Frequency,
}

impl MetaKey {
    /// Key for a `Meta_Info` child element.
    pub fn from_meta_tag(tag: &str) -> Option<Self> {
        match tag {
            "Artist" => Some(Self::Artist),
            "Album" => Some(Self::Album),
            "Song" | "Track" | "Radio_Text_A" => Some(Self::Song),
            "Station" | "Program_Service" => Some(Self::Station),
            "Program_Type" => Some(Self::Genre),
            "Radio_Text_B" => Some(Self::Description),
            _ => None,
        }
    }
}

pub type MediaMeta = BTreeMap<MetaKey, String>;

/// Menu position the device was last driven to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCursor {
    pub source: Source,
    pub path: Vec<NavStep>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReceiverState {
    pub power: PowerState,
    pub volume_level: f64,
    pub muted: bool,
    pub source: Option<Source>,
    pub device_source: Option<String>,
    pub media_meta: MediaMeta,
    pub playing: bool,
    pub position: Option<u64>,
    pub position_updated_at: Option<DateTime<Utc>>,
    pub shuffle: bool,
    pub repeat: bool,
    pub current_preset: Option<u8>,
    pub navigation: Option<MenuCursor>,
}

impl ReceiverState {
    /// Play/Pause/Assert style token from `Playback_Info` or `Signal_Info`.
    /// Off is never left here.
    pub fn apply_playback_token(&mut self, token: &str) {
        match token {
            "Play" | "Assert" => {
                if self.power != PowerState::Off {
                    self.power = PowerState::Playing;
                }
                self.playing = true;
            }
            "Pause" => {
                if self.power != PowerState::Off {
                    self.power = PowerState::Idle;
                }
                self.playing = true;
            }
            _ => self.playing = false,
        }
    }

    /// Clear now-playing data for sources without play info.
    pub fn nullify_media(&mut self) {
        self.media_meta.clear();
        self.playing = false;
        if self.power == PowerState::Playing {
            self.power = PowerState::Idle;
        }
    }

    pub fn features(&self) -> Features {
        self.source.map(|s| s.features()).unwrap_or(Features::BASE)
    }

    pub fn media_content_type(&self) -> Option<MediaContentType> {
        self.source.map(|s| s.content_type())
    }

    pub fn meta(&self, key: MetaKey) -> Option<&str> {
        self.media_meta.get(&key).map(String::as_str)
    }

    /// Title shown by the host. With both a song and a frequency the two
    /// alternate: song for the first 20 seconds of each minute.
    pub fn media_title_at(&self, second: u32) -> Option<&str> {
        match (self.meta(MetaKey::Song), self.meta(MetaKey::Frequency)) {
            (Some(song), Some(frequency)) => Some(if second < 20 { song } else { frequency }),
            (Some(song), None) => Some(song),
            (None, Some(frequency)) => Some(frequency),
            (None, None) => self.meta(MetaKey::Station),
        }
    }

    pub fn media_title(&self) -> Option<&str> {
        self.media_title_at(Utc::now().second())
    }

    pub fn navigation_path(&self) -> &[NavStep] {
        self.navigation
            .as_ref()
            .map(|cursor| cursor.path.as_slice())
            .unwrap_or(&[])
    }
}

/// Point-in-time view of a receiver, published on the bus and handed to
/// hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiverSnapshot {
    pub name: String,
    pub host: String,
    pub power: PowerState,
    pub volume_level: f64,
    pub muted: bool,
    pub source: Option<Source>,
    pub device_source: Option<String>,
    pub source_list: Vec<Source>,
    pub media_title: Option<String>,
    pub media_meta: MediaMeta,
    pub playing: bool,
    pub position: Option<u64>,
    pub position_updated_at: Option<DateTime<Utc>>,
    pub shuffle: bool,
    pub repeat: bool,
    pub current_preset: Option<u8>,
    pub media_content_type: Option<MediaContentType>,
    pub features: Features,
    pub navigation_path: String,
}

impl ReceiverSnapshot {
    pub fn new(name: &str, host: &str, state: &ReceiverState) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            power: state.power,
            volume_level: state.volume_level,
            muted: state.muted,
            source: state.source,
            device_source: state.device_source.clone(),
            source_list: Source::ALL.to_vec(),
            media_title: state.media_title().map(str::to_string),
            media_meta: state.media_meta.clone(),
            playing: state.playing,
            position: state.position,
            position_updated_at: state.position_updated_at,
            shuffle: state.shuffle,
            repeat: state.repeat,
            current_preset: state.current_preset,
            media_content_type: state.media_content_type(),
            features: state.features(),
            navigation_path: format_path(state.navigation_path()),
        }
    }

    pub fn artist(&self) -> Option<&str> {
        self.media_meta.get(&MetaKey::Artist).map(String::as_str)
    }

    pub fn album(&self) -> Option<&str> {
        self.media_meta.get(&MetaKey::Album).map(String::as_str)
    }
}
