//! Desktop implementations of the playback host traits

use eframe::egui;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::playback::{
    DecodedFrame, FullscreenApi, FullscreenHost, FullscreenSignal, ListenerId, Listeners,
    MediaElement, MediaEvent, MediaEventKind, MediaSink, PageHost, HLS_MIME,
};

/// Shell-side view of a `VideoSurface` once the session owns it
#[derive(Clone)]
pub struct VideoFeed {
    frame: Arc<Mutex<Option<DecodedFrame>>>,
    playing: Rc<Cell<bool>>,
}

impl VideoFeed {
    /// Latest decoded frame, withheld until playback was requested
    pub fn take_frame(&self) -> Option<DecodedFrame> {
        if !self.playing.get() {
            return None;
        }
        self.frame.lock().ok().and_then(|mut slot| slot.take())
    }
}

/// Video element of the player window.
///
/// Engine output arrives through the `MediaSink`. The native path hands the
/// stream to an external player process.
pub struct VideoSurface {
    external_player: String,
    src: Option<String>,
    muted: bool,
    listeners: Listeners<MediaEventKind>,
    event_sender: Sender<MediaEvent>,
    event_receiver: Receiver<MediaEvent>,
    frame: Arc<Mutex<Option<DecodedFrame>>>,
    playing: Rc<Cell<bool>>,
    child: Option<Child>,
}

impl VideoSurface {
    pub fn new(external_player: &str) -> Self {
        let (event_sender, event_receiver) = channel();
        Self {
            external_player: external_player.trim().to_string(),
            src: None,
            muted: false,
            listeners: Listeners::default(),
            event_sender,
            event_receiver,
            frame: Arc::new(Mutex::new(None)),
            playing: Rc::new(Cell::new(false)),
            child: None,
        }
    }

    pub fn feed(&self) -> VideoFeed {
        VideoFeed {
            frame: Arc::clone(&self.frame),
            playing: Rc::clone(&self.playing),
        }
    }

    fn emit(&self, event: MediaEvent) {
        let _ = self.event_sender.send(event);
    }

    fn launch_external(&mut self, url: &str) {
        info!("Launching {} for {}", self.external_player, url);
        let mut cmd = Command::new(&self.external_player);
        cmd.arg(url).stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());

        match cmd.spawn() {
            Ok(child) => {
                self.child = Some(child);
                self.emit(MediaEvent::Playing);
            }
            Err(e) => self.emit(MediaEvent::PlayRejected(format!(
                "{}: {}",
                self.external_player, e
            ))),
        }
    }
}

impl MediaElement for VideoSurface {
    fn can_play_type(&self, mime: &str) -> bool {
        mime == HLS_MIME && !self.external_player.is_empty()
    }

    fn set_src(&mut self, url: &str) {
        self.src = Some(url.to_string());
        // The external player probes the stream itself
        self.emit(MediaEvent::LoadedMetadata);
    }

    fn play(&mut self) {
        if self.playing.replace(true) {
            return;
        }
        if let Some(url) = self.src.clone() {
            self.launch_external(&url);
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId {
        self.listeners.add(kind)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.listeners.remove(id);
    }

    fn next_event(&mut self) -> Option<MediaEvent> {
        while let Ok(event) = self.event_receiver.try_recv() {
            if event.always_delivered() || self.listeners.is_listening(event.kind()) {
                return Some(event);
            }
            debug!("Dropping unheard {:?}", event);
        }
        None
    }

    fn media_sink(&self) -> MediaSink {
        MediaSink::new(self.event_sender.clone(), Arc::clone(&self.frame))
    }
}

impl Drop for VideoSurface {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!("External player already gone: {}", e);
            }
            let _ = child.wait();
        }
    }
}

/// Native window fullscreen through viewport commands.
///
/// The window only speaks the standard variant. Changes are detected by
/// comparing the viewport's fullscreen flag between frames.
pub struct WindowFullscreen {
    ctx: egui::Context,
    listeners: Listeners<FullscreenApi>,
    last_fullscreen: bool,
    pending: VecDeque<FullscreenSignal>,
}

impl WindowFullscreen {
    pub fn new(ctx: &egui::Context) -> Self {
        let mut host = Self {
            ctx: ctx.clone(),
            listeners: Listeners::default(),
            last_fullscreen: false,
            pending: VecDeque::new(),
        };
        host.last_fullscreen = host.is_fullscreen();
        host
    }

    fn poll_change(&mut self) {
        let now = self.is_fullscreen();
        if now != self.last_fullscreen {
            self.last_fullscreen = now;
            if self.listeners.is_listening(FullscreenApi::Standard) {
                self.pending.push_back(FullscreenSignal::Changed(FullscreenApi::Standard));
            }
        }
    }
}

impl FullscreenHost for WindowFullscreen {
    fn supports_request(&self, api: FullscreenApi) -> bool {
        api == FullscreenApi::Standard
    }

    fn request(&mut self, api: FullscreenApi) {
        if api != FullscreenApi::Standard {
            self.pending.push_back(FullscreenSignal::RequestRejected {
                api,
                reason: "unsupported variant".to_string(),
            });
            return;
        }
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(true));
    }

    fn supports_exit(&self, api: FullscreenApi) -> bool {
        api == FullscreenApi::Standard
    }

    fn exit(&mut self, _api: FullscreenApi) {
        self.ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(false));
    }

    fn is_fullscreen(&self) -> bool {
        self.ctx.input(|i| i.viewport().fullscreen.unwrap_or(false))
    }

    fn add_change_listener(&mut self, api: FullscreenApi) -> ListenerId {
        self.listeners.add(api)
    }

    fn remove_change_listener(&mut self, id: ListenerId) {
        if !self.listeners.remove(id) {
            warn!("Unknown fullscreen listener {:?}", id);
        }
    }

    fn next_signal(&mut self) -> Option<FullscreenSignal> {
        self.poll_change();
        self.pending.pop_front()
    }
}

/// Page flags the shell reads back each frame
#[derive(Debug, Default)]
pub struct PageFlags {
    pub scroll_locked: bool,
    pub closed_channel: Option<String>,
}

#[derive(Clone, Default)]
pub struct ShellPage {
    flags: Rc<RefCell<PageFlags>>,
}

impl ShellPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_scroll_locked(&self) -> bool {
        self.flags.borrow().scroll_locked
    }

    /// Channel id of the most recently closed player, cleared on read
    pub fn take_closed(&self) -> Option<String> {
        self.flags.borrow_mut().closed_channel.take()
    }
}

impl PageHost for ShellPage {
    fn set_scroll_locked(&mut self, locked: bool) {
        self.flags.borrow_mut().scroll_locked = locked;
    }

    fn player_closed(&mut self, channel_id: &str) {
        self.flags.borrow_mut().closed_channel = Some(channel_id.to_string());
    }
}
