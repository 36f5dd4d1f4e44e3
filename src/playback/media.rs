//! Media element contract shared by the engine, the monitors and the hosts.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use super::fullscreen::FullscreenError;

/// MIME type probed for native HLS playback
pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaEventKind {
    Waiting,
    Stalled,
    Playing,
    LoadedMetadata,
    PlayRejected,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    Waiting,
    Stalled,
    Playing,
    LoadedMetadata,
    /// Settlement of a `play()` call that the platform refused
    PlayRejected(String),
}

impl MediaEvent {
    pub fn kind(&self) -> MediaEventKind {
        match self {
            MediaEvent::Waiting => MediaEventKind::Waiting,
            MediaEvent::Stalled => MediaEventKind::Stalled,
            MediaEvent::Playing => MediaEventKind::Playing,
            MediaEvent::LoadedMetadata => MediaEventKind::LoadedMetadata,
            MediaEvent::PlayRejected(_) => MediaEventKind::PlayRejected,
        }
    }

    /// Play settlements reach the caller whether or not anyone listens
    pub fn always_delivered(&self) -> bool {
        matches!(self, MediaEvent::PlayRejected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// Registry of attached listeners keyed by event kind
#[derive(Debug)]
pub struct Listeners<K> {
    next_id: u64,
    entries: Vec<(ListenerId, K)>,
}

impl<K> Default for Listeners<K> {
    fn default() -> Self {
        Self {
            next_id: 1,
            entries: Vec::new(),
        }
    }
}

impl<K: Copy + PartialEq> Listeners<K> {
    pub fn add(&mut self, kind: K) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, kind));
        id
    }

    /// Returns false when the id was not attached
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        self.entries.len() != before
    }

    pub fn is_listening(&self, kind: K) -> bool {
        self.entries.iter().any(|(_, k)| *k == kind)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn count_kind(&self, kind: K) -> usize {
        self.entries.iter().filter(|(_, k)| *k == kind).count()
    }
}

/// Decoded video frame for rendering
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB24 data
    pub pts: i64,
}

/// Handle an engine uses to feed an attached element from any thread
#[derive(Clone)]
pub struct MediaSink {
    events: Sender<MediaEvent>,
    frame: Arc<Mutex<Option<DecodedFrame>>>,
}

impl MediaSink {
    pub fn new(events: Sender<MediaEvent>, frame: Arc<Mutex<Option<DecodedFrame>>>) -> Self {
        Self { events, frame }
    }

    /// Returns false once the element is gone
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn present(&self, frame: DecodedFrame) {
        if let Ok(mut slot) = self.frame.lock() {
            *slot = Some(frame);
        }
    }
}

/// A playable surface: the platform's video element
pub trait MediaElement {
    fn can_play_type(&self, mime: &str) -> bool;

    fn set_src(&mut self, url: &str);

    /// Requests playback. Never blocks; the outcome arrives later as
    /// `Playing` or `PlayRejected`.
    fn play(&mut self);

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);

    /// Next event that has an attached listener (or is always delivered)
    fn next_event(&mut self) -> Option<MediaEvent>;

    fn media_sink(&self) -> MediaSink;

    /// Element-level fullscreen, as found on touch devices
    fn supports_native_fullscreen(&self) -> bool {
        false
    }

    fn enter_native_fullscreen(&mut self) -> Result<(), FullscreenError> {
        Err(FullscreenError::Unsupported)
    }
}
