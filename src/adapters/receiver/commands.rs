//! Host commands translated to PUT requests.

use std::fmt;
use std::str::FromStr;

use super::source::{Features, Source};
use super::ReceiverAdapter;
use crate::adapters::traits::{AdapterCommand, AdapterCommandResponse};
use crate::error::{ReceiverError, Result};
use crate::protocol::nest;

/// Media kinds accepted by [`ReceiverAdapter::play_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Tuner preset number.
    Preset,
    /// Net Radio menu item.
    Station,
    /// Server menu item.
    Music,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preset => "preset",
            Self::Station => "station",
            Self::Music => "music",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ReceiverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "preset" => Ok(Self::Preset),
            "station" => Ok(Self::Station),
            "music" => Ok(Self::Music),
            other => Err(ReceiverError::unsupported(
                format!("play_media({})", other),
                "any source",
            )),
        }
    }
}

fn on_off(on: bool) -> &'static str {
    if on {
        "On"
    } else {
        "Off"
    }
}

pub(super) fn playback_body(endpoint: &str, action: &str) -> String {
    nest(&[endpoint, "Play_Control", "Playback"], action)
}

impl ReceiverAdapter {
    pub async fn turn_on(&mut self) -> Result<()> {
        self.set_power(true).await
    }

    pub async fn turn_off(&mut self) -> Result<()> {
        self.set_power(false).await
    }

    async fn set_power(&mut self, on: bool) -> Result<()> {
        let power = if on { "On" } else { "Standby" };
        self.put(&nest(&["System", "Power_Control", "Power"], power))
            .await
    }

    /// Set volume from a host fraction. The level itself is only updated by
    /// the next status poll.
    pub async fn set_volume(&mut self, fraction: f64) -> Result<()> {
        let native = self.volume_scale.to_native(fraction);
        self.put(&nest(
            &["Main_Zone", "Volume", "Lvl"],
            &format!("<Val>{}</Val><Exp>0</Exp><Unit></Unit>", native),
        ))
        .await
    }

    pub async fn select_source(&mut self, source: Source) -> Result<()> {
        self.put(&nest(
            &["Main_Zone", "Input", "Input_Sel"],
            source.native_code(),
        ))
        .await
    }

    /// Like [`select_source`](Self::select_source) for a host-facing name.
    /// Unknown names fail before any request is sent.
    pub async fn select_source_by_name(&mut self, name: &str) -> Result<()> {
        let source: Source = name.parse()?;
        self.select_source(source).await
    }

    pub async fn set_mute(&mut self, mute: bool) -> Result<()> {
        self.put(&nest(&["System", "Volume", "Mute"], on_off(mute)))
            .await?;
        self.state.muted = mute;
        Ok(())
    }

    pub async fn media_play(&mut self) -> Result<()> {
        self.playback(Features::PLAY, "Play").await
    }

    pub async fn media_pause(&mut self) -> Result<()> {
        self.playback(Features::PAUSE, "Pause").await
    }

    pub async fn media_stop(&mut self) -> Result<()> {
        self.playback(Features::STOP, "Stop").await
    }

    /// Skip forward, or the next preset on the tuner.
    pub async fn media_next_track(&mut self) -> Result<()> {
        if self.state.source == Some(Source::Tuner) {
            return self.next_preset().await;
        }
        self.playback(Features::NEXT_TRACK, "Skip Fwd").await
    }

    /// Skip back, or the previous preset on the tuner.
    pub async fn media_previous_track(&mut self) -> Result<()> {
        if self.state.source == Some(Source::Tuner) {
            return self.previous_preset().await;
        }
        self.playback(Features::PREVIOUS_TRACK, "Skip Rev").await
    }

    pub async fn set_shuffle(&mut self, shuffle: bool) -> Result<()> {
        let endpoint = self.control_endpoint(Features::SHUFFLE_SET, "set_shuffle")?;
        self.put(&nest(
            &[endpoint, "Play_Control", "Play_Mode", "Shuffle"],
            on_off(shuffle),
        ))
        .await
    }

    /// Play a preset, station or server item identified by `media_id`.
    pub async fn play_media(&mut self, media_type: &str, media_id: &str) -> Result<()> {
        let current = self.current_source_label();
        let kind: MediaKind = media_type.parse().map_err(|_| {
            ReceiverError::unsupported(format!("play_media({})", media_type), current.clone())
        })?;

        match (self.state.source, kind) {
            (Some(Source::Tuner), MediaKind::Preset) => {
                let preset = super::preset::parse_preset_id(media_id)?;
                self.select_preset(preset).await
            }
            (Some(source @ Source::NetRadio), MediaKind::Station)
            | (Some(source @ Source::Server), MediaKind::Music) => {
                self.play_menu_item(source, media_id).await
            }
            _ => Err(ReceiverError::unsupported(
                format!("play_media({})", kind),
                current,
            )),
        }
    }

    /// Run a host command and fold the outcome into a response.
    pub async fn handle_command(&mut self, command: AdapterCommand) -> AdapterCommandResponse {
        let result = match &command {
            AdapterCommand::TurnOn => self.turn_on().await,
            AdapterCommand::TurnOff => self.turn_off().await,
            AdapterCommand::VolumeAbsolute(fraction) => self.set_volume(*fraction).await,
            AdapterCommand::Mute(mute) => self.set_mute(*mute).await,
            AdapterCommand::SelectSource(name) => self.select_source_by_name(name).await,
            AdapterCommand::Play => self.media_play().await,
            AdapterCommand::Pause => self.media_pause().await,
            AdapterCommand::Stop => self.media_stop().await,
            AdapterCommand::Next => self.media_next_track().await,
            AdapterCommand::Previous => self.media_previous_track().await,
            AdapterCommand::Shuffle(shuffle) => self.set_shuffle(*shuffle).await,
            AdapterCommand::PlayMedia {
                media_type,
                media_id,
            } => self.play_media(media_type, media_id).await,
        };

        match result {
            Ok(()) => AdapterCommandResponse {
                success: true,
                error: None,
            },
            Err(e) => {
                tracing::warn!("{} command {:?} failed: {}", self.name, command, e);
                AdapterCommandResponse {
                    success: false,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn playback(&mut self, feature: Features, action: &str) -> Result<()> {
        let endpoint = self.control_endpoint(feature, action)?;
        self.put(&playback_body(endpoint, action)).await
    }

    /// Play-control element for the current source, if it supports `feature`.
    fn control_endpoint(&self, feature: Features, operation: &str) -> Result<&'static str> {
        if !self.state.features().contains(feature) {
            return Err(ReceiverError::unsupported(
                operation,
                self.current_source_label(),
            ));
        }
        self.state
            .source
            .and_then(|s| s.play_info_endpoint())
            .ok_or_else(|| ReceiverError::unsupported(operation, self.current_source_label()))
    }

    pub(super) fn current_source_label(&self) -> String {
        self.state
            .source
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}
