//! Tuner presets 1-8, cycled circularly by next/previous.

use super::ReceiverAdapter;
use crate::error::{ReceiverError, Result};
use crate::protocol::nest;

pub const PRESET_COUNT: u8 = 8;

pub fn next_preset(current: Option<u8>) -> u8 {
    let current = current.unwrap_or(1);
    (current % PRESET_COUNT) + 1
}

pub fn previous_preset(current: Option<u8>) -> u8 {
    let current = i16::from(current.unwrap_or(1));
    // rem_euclid keeps 1 -> 8
    ((current - 2).rem_euclid(i16::from(PRESET_COUNT)) + 1) as u8
}

pub(super) fn parse_preset_id(id: &str) -> Result<u8> {
    id.trim()
        .parse::<u8>()
        .ok()
        .filter(|p| (1..=PRESET_COUNT).contains(p))
        .ok_or_else(|| ReceiverError::InvalidPreset(id.to_string()))
}

impl ReceiverAdapter {
    /// Tune to a preset, then refresh so the new station shows up at once.
    pub async fn select_preset(&mut self, preset: u8) -> Result<()> {
        if !(1..=PRESET_COUNT).contains(&preset) {
            return Err(ReceiverError::InvalidPreset(preset.to_string()));
        }
        self.put(&nest(
            &["Tuner", "Play_Control", "Preset", "Preset_Sel"],
            &preset.to_string(),
        ))
        .await?;

        if let Err(e) = self.refresh().await {
            tracing::warn!("Refresh after selecting preset {} failed: {}", preset, e);
        }
        Ok(())
    }

    pub async fn next_preset(&mut self) -> Result<()> {
        self.select_preset(next_preset(self.state.current_preset))
            .await
    }

    pub async fn previous_preset(&mut self) -> Result<()> {
        self.select_preset(previous_preset(self.state.current_preset))
            .await
    }
}
