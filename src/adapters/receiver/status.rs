//! Status and play-info parsing.
//!
//! Both responses are walked child by child through a tag → handler table.
//! Handlers write into an update struct which is committed to the state in
//! one step, so a document that fails to parse never leaves a half-applied
//! state behind. A handler error only drops that one node.

use chrono::{DateTime, Utc};

use super::source::{device_source_token, Source};
use super::state::{MediaMeta, MetaKey, PowerState, ReceiverState};
use super::volume::VolumeScale;
use crate::error::{ReceiverError, Result};
use crate::protocol::XmlElement;

type Handler<U> = fn(&XmlElement, &mut U) -> Result<()>;

fn dispatch<U>(payload: &XmlElement, table: &[(&str, Handler<U>)], update: &mut U) {
    for node in &payload.children {
        let Some((_, handler)) = table.iter().find(|(tag, _)| *tag == node.tag) else {
            continue;
        };
        if let Err(e) = handler(node, update) {
            tracing::warn!("Skipping <{}>: {}", node.tag, e);
        }
    }
}

fn malformed(msg: impl Into<String>) -> ReceiverError {
    ReceiverError::MalformedResponse(msg.into())
}

fn parse_number<T: std::str::FromStr>(node: &XmlElement, what: &str) -> Result<T> {
    node.text()
        .trim()
        .parse()
        .map_err(|_| malformed(format!("{} is not a number: {:?}", what, node.text())))
}

// =============================================================================
// Main_Zone / Basic_Status
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusUpdate {
    scale: VolumeScale,
    pub power: Option<PowerState>,
    pub volume_level: Option<f64>,
    pub muted: Option<bool>,
    /// Raw `Input_Sel`, present for inputs outside the known sources too.
    pub input: Option<String>,
    pub source: Option<Source>,
}

const STATUS_HANDLERS: &[(&str, Handler<StatusUpdate>)] = &[
    ("Power_Control", status_power),
    ("Volume", status_volume),
    ("Input", status_input),
];

/// Parse a `Basic_Status` response.
pub fn parse_status(doc: &XmlElement, scale: VolumeScale) -> Result<StatusUpdate> {
    let payload = doc.require_payload()?;
    let mut update = StatusUpdate {
        scale,
        ..Default::default()
    };
    dispatch(payload, STATUS_HANDLERS, &mut update);
    Ok(update)
}

fn status_power(node: &XmlElement, update: &mut StatusUpdate) -> Result<()> {
    let power = node
        .child("Power")
        .or_else(|| node.children.first())
        .ok_or_else(|| malformed("Power_Control has no Power"))?;
    update.power = Some(if power.text() == "On" {
        PowerState::Idle
    } else {
        PowerState::Off
    });
    Ok(())
}

fn status_volume(node: &XmlElement, update: &mut StatusUpdate) -> Result<()> {
    for child in &node.children {
        match child.tag.as_str() {
            "Lvl" => {
                let val = child
                    .child("Val")
                    .ok_or_else(|| malformed("Lvl has no Val"))?;
                let native: i64 = parse_number(val, "Lvl/Val")?;
                update.volume_level = Some(update.scale.to_fraction(native));
            }
            "Mute" => update.muted = Some(child.text() == "On"),
            _ => {}
        }
    }
    Ok(())
}

fn status_input(node: &XmlElement, update: &mut StatusUpdate) -> Result<()> {
    let token = node
        .child_text("Input_Sel")
        .ok_or_else(|| malformed("Input has no Input_Sel"))?;
    update.source = Source::from_native(token);
    if update.source.is_none() {
        tracing::warn!("Input {:?} is not a known source", token);
    }
    update.input = Some(token.to_string());
    Ok(())
}

impl StatusUpdate {
    pub fn commit(self, state: &mut ReceiverState) {
        if let Some(power) = self.power {
            state.power = power;
        }
        if let Some(volume_level) = self.volume_level {
            state.volume_level = volume_level;
        }
        if let Some(muted) = self.muted {
            state.muted = muted;
        }
        if let Some(input) = self.input {
            let device_source = device_source_token(&input);
            let changed = state.source != self.source
                || state
                    .device_source
                    .as_ref()
                    .is_some_and(|previous| *previous != device_source);
            if changed {
                tracing::debug!(
                    "Source changed: {:?} -> {:?}",
                    state.device_source,
                    device_source
                );
                state.navigation = None;
                if self.source != Some(Source::Tuner) {
                    state.current_preset = None;
                }
            }
            state.source = self.source;
            state.device_source = Some(device_source);
        }
    }
}

// =============================================================================
// <Endpoint> / Play_Info
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackSignal {
    /// `Playback_Info`, or `Signal_Info/Tuned` outside the tuner.
    Token(String),
    /// Tuner reports a tuned signal.
    SignalAcquired,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayInfoUpdate {
    tuner: bool,
    pub media_meta: MediaMeta,
    pub play_mode: Option<bool>,
    pub position: Option<u64>,
    pub playback: Vec<PlaybackSignal>,
    /// `Some(None)` when the device reports no preset selected.
    pub preset: Option<Option<u8>>,
}

const PLAY_INFO_HANDLERS: &[(&str, Handler<PlayInfoUpdate>)] = &[
    ("Play_Mode", play_mode),
    ("Play_Time", play_time),
    ("Meta_Info", meta_info),
    ("Playback_Info", playback_info),
    ("Signal_Info", signal_info),
    ("Tuning", tuning),
    ("Preset", preset),
];

/// Parse a `Play_Info` response for the given source.
pub fn parse_play_info(doc: &XmlElement, source: Option<Source>) -> Result<PlayInfoUpdate> {
    let payload = doc.require_payload()?;
    let mut update = PlayInfoUpdate {
        tuner: source == Some(Source::Tuner),
        ..Default::default()
    };
    dispatch(payload, PLAY_INFO_HANDLERS, &mut update);
    Ok(update)
}

fn play_mode(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    // Shuffle and repeat share the one flag
    update.play_mode = Some(node.text() == "On");
    Ok(())
}

fn play_time(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    update.position = Some(parse_number(node, "Play_Time")?);
    Ok(())
}

fn meta_info(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    for meta in &node.children {
        let Some(key) = MetaKey::from_meta_tag(&meta.tag) else {
            continue;
        };
        if meta.text().is_empty() {
            continue;
        }
        // Device double-escapes ampersands
        update
            .media_meta
            .insert(key, meta.text().replace("&amp;", "&"));
    }
    Ok(())
}

fn playback_info(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    update
        .playback
        .push(PlaybackSignal::Token(node.text().to_string()));
    Ok(())
}

fn signal_info(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    let Some(tuned) = node.child("Tuned") else {
        return Ok(());
    };
    let signal = if update.tuner && tuned.text() == "Assert" {
        PlaybackSignal::SignalAcquired
    } else {
        PlaybackSignal::Token(tuned.text().to_string())
    };
    update.playback.push(signal);
    Ok(())
}

fn tuning(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    let (Some(band), Some(current)) = (node.child("Band"), node.path(&["Freq", "Current"])) else {
        return Ok(());
    };
    let (Some(val), Some(unit)) = (current.child("Val"), current.child("Unit")) else {
        return Ok(());
    };
    let hundredths: f64 = parse_number(val, "Freq/Current/Val")?;
    update.media_meta.insert(
        MetaKey::Frequency,
        format_frequency(band.text(), hundredths / 100.0, unit.text()),
    );
    Ok(())
}

fn preset(node: &XmlElement, update: &mut PlayInfoUpdate) -> Result<()> {
    let Some(selected) = node.child("Preset_Sel") else {
        return Ok(());
    };
    let preset = selected
        .text()
        .trim()
        .parse::<u8>()
        .ok()
        .filter(|p| (1..=super::preset::PRESET_COUNT).contains(p));
    update.preset = Some(preset);
    Ok(())
}

/// `FM 97.9 MHz`. Whole values keep one decimal (`FM 100.0 MHz`).
pub fn format_frequency(band: &str, value: f64, unit: &str) -> String {
    if value.fract() == 0.0 {
        format!("{} {:.1} {}", band, value, unit)
    } else {
        format!("{} {} {}", band, value, unit)
    }
}

impl PlayInfoUpdate {
    pub fn commit(self, state: &mut ReceiverState, now: DateTime<Utc>) {
        state.media_meta = self.media_meta;
        if let Some(on) = self.play_mode {
            state.shuffle = on;
            state.repeat = on;
        }
        if let Some(position) = self.position {
            state.position = Some(position);
            state.position_updated_at = Some(now);
        }
        for signal in self.playback {
            match signal {
                PlaybackSignal::Token(token) => state.apply_playback_token(&token),
                PlaybackSignal::SignalAcquired => {
                    if state.power != PowerState::Off {
                        state.power = PowerState::Playing;
                    }
                    state.playing = true;
                }
            }
        }
        if let Some(preset) = self.preset {
            if state.source == Some(Source::Tuner) {
                state.current_preset = preset;
            }
        }
    }
}
