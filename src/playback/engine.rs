//! Adaptive engine lifecycle and playback path selection

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::media::{ListenerId, MediaElement, MediaEvent, MediaEventKind, HLS_MIME};

/// Quality level the engine starts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StartQuality {
    #[default]
    Lowest,
    Auto,
}

/// Tuning handed to the adaptive engine on creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_true")]
    pub low_latency: bool,
    #[serde(default = "default_live_sync_segments")]
    pub live_sync_segments: u32,
    #[serde(default = "default_max_buffer_seconds")]
    pub max_buffer_seconds: u32,
    #[serde(default)]
    pub start_quality: StartQuality,
    /// Bits per second assumed before the first measurement
    #[serde(default = "default_bandwidth_estimate")]
    pub initial_bandwidth_estimate: u64,
}

fn default_true() -> bool { true }
fn default_live_sync_segments() -> u32 { 2 }
fn default_max_buffer_seconds() -> u32 { 10 }
fn default_bandwidth_estimate() -> u64 { 500_000 }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            low_latency: true,
            live_sync_segments: default_live_sync_segments(),
            max_buffer_seconds: default_max_buffer_seconds(),
            start_quality: StartQuality::Lowest,
            initial_bandwidth_estimate: default_bandwidth_estimate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Top-level playlist read; segments can be loaded
    ManifestParsed,
    Error(String),
}

/// One instance of the adaptive streaming library
pub trait AdaptiveEngine {
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self, media: &mut dyn MediaElement);
    fn next_event(&mut self) -> Option<EngineEvent>;
    /// Stops loading and detaches from the element
    fn destroy(&mut self);
}

/// The adaptive streaming library as available in this environment
pub trait EngineBackend {
    fn is_supported(&self) -> bool;
    fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine>;
}

/// Exclusive ownership of one engine for a session's lifetime
pub struct EngineHandle {
    engine: Option<Box<dyn AdaptiveEngine>>,
}

impl EngineHandle {
    pub fn new(engine: Box<dyn AdaptiveEngine>) -> Self {
        Self {
            engine: Some(engine),
        }
    }

    pub fn is_live(&self) -> bool {
        self.engine.is_some()
    }

    pub fn engine_mut(&mut self) -> Option<&mut (dyn AdaptiveEngine + 'static)> {
        self.engine.as_deref_mut()
    }

    /// Destroys the engine. Returns true only on the call that destroyed it.
    pub fn release(&mut self) -> bool {
        match self.engine.take() {
            Some(mut engine) => {
                engine.destroy();
                true
            }
            None => false,
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPath {
    Engine,
    Native,
    Unavailable,
}

/// Establishes playback for one stream on one element
pub struct StreamEngineAdapter {
    path: PlaybackPath,
    engine: Option<EngineHandle>,
    metadata_listener: Option<ListenerId>,
    native_play_requested: bool,
    torn_down: bool,
}

impl StreamEngineAdapter {
    /// Picks the engine when supported, else native HLS, else nothing
    pub fn attach(
        source: &str,
        media: &mut dyn MediaElement,
        backend: &dyn EngineBackend,
        config: &EngineConfig,
    ) -> Self {
        let mut adapter = Self {
            path: PlaybackPath::Unavailable,
            engine: None,
            metadata_listener: None,
            native_play_requested: false,
            torn_down: false,
        };

        if backend.is_supported() {
            let mut handle = EngineHandle::new(backend.create(config));
            if let Some(engine) = handle.engine_mut() {
                engine.load_source(source);
                engine.attach_media(media);
            }
            adapter.engine = Some(handle);
            adapter.path = PlaybackPath::Engine;
            debug!("Adaptive engine attached for {}", source);
        } else if media.can_play_type(HLS_MIME) {
            media.set_src(source);
            adapter.metadata_listener = Some(media.add_listener(MediaEventKind::LoadedMetadata));
            adapter.path = PlaybackPath::Native;
            debug!("Native playback path for {}", source);
        } else {
            info!("No playback path available for {}", source);
        }

        adapter
    }

    pub fn path(&self) -> PlaybackPath {
        self.path
    }

    pub fn is_engine_live(&self) -> bool {
        self.engine.as_ref().is_some_and(EngineHandle::is_live)
    }

    /// Drains engine events; a parsed manifest starts playback
    pub fn pump(&mut self, media: &mut dyn MediaElement) {
        if self.torn_down {
            return;
        }
        let Some(engine) = self.engine.as_mut().and_then(EngineHandle::engine_mut) else {
            return;
        };

        let mut events = Vec::new();
        while let Some(event) = engine.next_event() {
            events.push(event);
        }

        for event in events {
            match event {
                EngineEvent::ManifestParsed => {
                    debug!("Manifest parsed, requesting playback");
                    media.play();
                }
                EngineEvent::Error(e) => warn!("Adaptive engine error: {}", e),
            }
        }
    }

    /// Native path: start playback once metadata is in
    pub fn on_media_event(&mut self, event: &MediaEvent, media: &mut dyn MediaElement) {
        if self.torn_down || self.path != PlaybackPath::Native {
            return;
        }
        if *event == MediaEvent::LoadedMetadata && !self.native_play_requested {
            self.native_play_requested = true;
            media.play();
        }
    }

    /// Releases the engine and listeners. Safe to call repeatedly; returns
    /// true only when this call destroyed an engine.
    pub fn teardown(&mut self, media: &mut dyn MediaElement) -> bool {
        if self.torn_down {
            return false;
        }
        self.torn_down = true;

        if let Some(id) = self.metadata_listener.take() {
            media.remove_listener(id);
        }

        let released = self.engine.as_mut().is_some_and(EngineHandle::release);
        self.engine = None;
        if released {
            debug!("Adaptive engine destroyed");
        }
        released
    }
}
