//! Yamaha R-N301 class receiver adapter.
//!
//! One `ReceiverAdapter` per device. It owns the transport and the
//! reconstructed [`ReceiverState`]; every method that touches the device
//! takes `&mut self`, so a caller can never interleave two navigation
//! sequences on the same receiver.
//!
//! State is only mutated in three places: [`ReceiverAdapter::refresh`]
//! (status and play-info polls), [`ReceiverAdapter::set_mute`] (local
//! update after the device accepted the command) and menu navigation
//! (cursor bookkeeping).

mod browse;
mod commands;
mod preset;
mod source;
mod state;
mod status;
mod volume;

pub use browse::{
    format_path, parse_path, BrowseItem, BrowseMedia, LineKind, MenuLine, MenuListing, NavStep,
    PAGE_SIZE,
};
pub use commands::MediaKind;
pub use preset::{next_preset, previous_preset, PRESET_COUNT};
pub use source::{Features, MediaContentType, Source};
pub use state::{MediaMeta, MetaKey, PowerState, ReceiverSnapshot, ReceiverState};
pub use status::{parse_play_info, parse_status, PlayInfoUpdate, StatusUpdate};
pub use volume::VolumeScale;

use chrono::{DateTime, Utc};

use crate::config::{NavigationConfig, ReceiverConfig};
use crate::error::{ReceiverError, Result};
use crate::protocol::{self, build_get, build_put, DeviceEndpoint, HttpTransport, Transport, XmlElement};

pub struct ReceiverAdapter {
    name: String,
    endpoint: DeviceEndpoint,
    transport: Box<dyn Transport>,
    volume_scale: VolumeScale,
    navigation: NavigationConfig,
    state: ReceiverState,
}

impl ReceiverAdapter {
    /// Adapter talking HTTP to `config.host`.
    pub fn new(config: &ReceiverConfig) -> Result<Self> {
        let endpoint = DeviceEndpoint::new(&config.host, config.timeout())?;
        let transport = HttpTransport::new(endpoint.clone());
        Ok(Self::build(config, endpoint, Box::new(transport)))
    }

    /// Adapter with a caller-supplied transport.
    pub fn with_transport(
        config: &ReceiverConfig,
        transport: impl Transport + 'static,
    ) -> Result<Self> {
        let endpoint = DeviceEndpoint::new(&config.host, config.timeout())?;
        Ok(Self::build(config, endpoint, Box::new(transport)))
    }

    fn build(config: &ReceiverConfig, endpoint: DeviceEndpoint, transport: Box<dyn Transport>) -> Self {
        tracing::debug!(
            "Receiver adapter {:?} for {} (volume scale {})",
            config.name,
            endpoint.control_url(),
            config.volume_scale.full_scale()
        );
        Self {
            name: config.name.clone(),
            endpoint,
            transport,
            volume_scale: config.volume_scale,
            navigation: config.navigation.clone(),
            state: ReceiverState::default(),
        }
    }

    // =========================================================================
    // Polling
    // =========================================================================

    /// Poll `Basic_Status`, then play info (or clear it when in standby).
    ///
    /// On any error the state is left exactly as it was before the failing
    /// request.
    pub async fn refresh(&mut self) -> Result<()> {
        let doc = self
            .get(&protocol::query("Main_Zone", "Basic_Status"))
            .await?;
        status::parse_status(&doc, self.volume_scale)?.commit(&mut self.state);

        if self.state.power == PowerState::Off {
            self.state.nullify_media();
            return Ok(());
        }
        self.refresh_play_info().await
    }

    async fn refresh_play_info(&mut self) -> Result<()> {
        let Some(endpoint) = self.state.source.and_then(|s| s.play_info_endpoint()) else {
            self.state.nullify_media();
            return Ok(());
        };
        let doc = self.get(&protocol::query(endpoint, "Play_Info")).await?;
        let update = status::parse_play_info(&doc, self.state.source)?;
        update.commit(&mut self.state, Utc::now());
        tracing::trace!("Media metadata: {:?}", self.state.media_meta);
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn volume_scale(&self) -> VolumeScale {
        self.volume_scale
    }

    pub fn state(&self) -> &ReceiverState {
        &self.state
    }

    pub fn power(&self) -> PowerState {
        self.state.power
    }

    pub fn volume_level(&self) -> f64 {
        self.state.volume_level
    }

    pub fn is_volume_muted(&self) -> bool {
        self.state.muted
    }

    pub fn source(&self) -> Option<Source> {
        self.state.source
    }

    pub fn device_source(&self) -> Option<&str> {
        self.state.device_source.as_deref()
    }

    pub fn source_list(&self) -> &'static [Source] {
        &Source::ALL
    }

    pub fn media_meta(&self) -> &MediaMeta {
        &self.state.media_meta
    }

    pub fn media_title(&self) -> Option<&str> {
        self.state.media_title()
    }

    pub fn media_artist(&self) -> Option<&str> {
        self.state.meta(MetaKey::Artist)
    }

    pub fn media_album(&self) -> Option<&str> {
        self.state.meta(MetaKey::Album)
    }

    pub fn media_position(&self) -> Option<u64> {
        self.state.position
    }

    pub fn media_position_updated_at(&self) -> Option<DateTime<Utc>> {
        self.state.position_updated_at
    }

    pub fn media_content_type(&self) -> Option<MediaContentType> {
        self.state.media_content_type()
    }

    pub fn is_playing(&self) -> bool {
        self.state.playing
    }

    pub fn shuffle(&self) -> bool {
        self.state.shuffle
    }

    pub fn repeat(&self) -> bool {
        self.state.repeat
    }

    pub fn current_preset(&self) -> Option<u8> {
        self.state.current_preset
    }

    pub fn navigation_path(&self) -> &[NavStep] {
        self.state.navigation_path()
    }

    pub fn supported_features(&self) -> Features {
        self.state.features()
    }

    pub fn snapshot(&self) -> ReceiverSnapshot {
        ReceiverSnapshot::new(&self.name, self.endpoint.host(), &self.state)
    }

    // =========================================================================
    // Wire helpers
    // =========================================================================

    async fn get(&self, body: &str) -> Result<XmlElement> {
        let response = self.transport.send(&build_get(body)).await;
        if response.is_empty() {
            return Err(ReceiverError::Transport(self.endpoint.host().to_string()));
        }
        XmlElement::parse(&response)
    }

    async fn put(&self, body: &str) -> Result<()> {
        let response = self.transport.send(&build_put(body)).await;
        if response.is_empty() {
            return Err(ReceiverError::Transport(self.endpoint.host().to_string()));
        }
        let doc = XmlElement::parse(&response)?;
        match protocol::response_code(&doc) {
            Some(code) if code != "0" => Err(ReceiverError::Rejected(code.to_string())),
            _ => Ok(()),
        }
    }
}
