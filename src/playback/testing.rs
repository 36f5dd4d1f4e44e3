//! In-memory hosts for exercising the playback core

use std::cell::{Ref, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use super::engine::{AdaptiveEngine, EngineBackend, EngineConfig, EngineEvent};
use super::fullscreen::{FullscreenApi, FullscreenError, FullscreenHost, FullscreenSignal};
use super::media::{
    DecodedFrame, ListenerId, Listeners, MediaElement, MediaEvent, MediaEventKind, MediaSink, HLS_MIME,
};
use super::report::{BrokenStreamReport, PendingReport, ReportError, ReportSink};
use super::session::PageHost;

/// How a fake element settles `play()`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PlayPolicy {
    #[default]
    Manual,
    Succeed,
    Reject(String),
}

#[derive(Default)]
pub struct FakeMediaState {
    pub src: Option<String>,
    pub muted: bool,
    pub play_calls: usize,
    pub native_fullscreen_calls: usize,
    pub native_hls: bool,
    pub native_fullscreen: bool,
    pub play_policy: PlayPolicy,
    pub listeners: Listeners<MediaEventKind>,
}

#[derive(Clone)]
pub struct FakeMedia {
    state: Rc<RefCell<FakeMediaState>>,
    events_tx: Sender<MediaEvent>,
    events_rx: Rc<Receiver<MediaEvent>>,
    frame: Arc<Mutex<Option<DecodedFrame>>>,
}

impl FakeMedia {
    pub fn new() -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            state: Rc::new(RefCell::new(FakeMediaState::default())),
            events_tx,
            events_rx: Rc::new(events_rx),
            frame: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_native_hls(self) -> Self {
        self.state.borrow_mut().native_hls = true;
        self
    }

    pub fn with_native_fullscreen(self) -> Self {
        self.state.borrow_mut().native_fullscreen = true;
        self
    }

    pub fn with_play_policy(self, policy: PlayPolicy) -> Self {
        self.state.borrow_mut().play_policy = policy;
        self
    }

    pub fn state(&self) -> Ref<'_, FakeMediaState> {
        self.state.borrow()
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.count()
    }

    /// Fires an event as the platform would
    pub fn dispatch(&self, event: MediaEvent) {
        let _ = self.events_tx.send(event);
    }
}

impl MediaElement for FakeMedia {
    fn can_play_type(&self, mime: &str) -> bool {
        mime == HLS_MIME && self.state.borrow().native_hls
    }

    fn set_src(&mut self, url: &str) {
        self.state.borrow_mut().src = Some(url.to_string());
    }

    fn play(&mut self) {
        let policy = {
            let mut state = self.state.borrow_mut();
            state.play_calls += 1;
            state.play_policy.clone()
        };
        match policy {
            PlayPolicy::Manual => {}
            PlayPolicy::Succeed => self.dispatch(MediaEvent::Playing),
            PlayPolicy::Reject(reason) => self.dispatch(MediaEvent::PlayRejected(reason)),
        }
    }

    fn is_muted(&self) -> bool {
        self.state.borrow().muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.state.borrow_mut().muted = muted;
    }

    fn add_listener(&mut self, kind: MediaEventKind) -> ListenerId {
        self.state.borrow_mut().listeners.add(kind)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }

    fn next_event(&mut self) -> Option<MediaEvent> {
        while let Ok(event) = self.events_rx.try_recv() {
            if event.always_delivered() || self.state.borrow().listeners.is_listening(event.kind()) {
                return Some(event);
            }
        }
        None
    }

    fn media_sink(&self) -> MediaSink {
        MediaSink::new(self.events_tx.clone(), Arc::clone(&self.frame))
    }

    fn supports_native_fullscreen(&self) -> bool {
        self.state.borrow().native_fullscreen
    }

    fn enter_native_fullscreen(&mut self) -> Result<(), FullscreenError> {
        self.state.borrow_mut().native_fullscreen_calls += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeEngineState {
    pub supported: bool,
    pub created: usize,
    pub destroyed: usize,
    pub attached: usize,
    pub loaded_sources: Vec<String>,
    pub last_config: Option<EngineConfig>,
    pending: VecDeque<EngineEvent>,
}

#[derive(Clone)]
pub struct FakeEngineBackend {
    state: Rc<RefCell<FakeEngineState>>,
}

impl FakeEngineBackend {
    pub fn supported() -> Self {
        Self::with_support(true)
    }

    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeEngineState {
                supported,
                ..Default::default()
            })),
        }
    }

    pub fn state(&self) -> Ref<'_, FakeEngineState> {
        self.state.borrow()
    }

    pub fn live_engines(&self) -> usize {
        let state = self.state.borrow();
        state.created - state.destroyed
    }

    pub fn emit(&self, event: EngineEvent) {
        self.state.borrow_mut().pending.push_back(event);
    }
}

impl EngineBackend for FakeEngineBackend {
    fn is_supported(&self) -> bool {
        self.state.borrow().supported
    }

    fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine> {
        {
            let mut state = self.state.borrow_mut();
            state.created += 1;
            state.last_config = Some(config.clone());
        }
        Box::new(FakeEngine {
            state: Rc::clone(&self.state),
            destroyed: false,
        })
    }
}

struct FakeEngine {
    state: Rc<RefCell<FakeEngineState>>,
    destroyed: bool,
}

impl AdaptiveEngine for FakeEngine {
    fn load_source(&mut self, url: &str) {
        self.state.borrow_mut().loaded_sources.push(url.to_string());
    }

    fn attach_media(&mut self, _media: &mut dyn MediaElement) {
        self.state.borrow_mut().attached += 1;
    }

    fn next_event(&mut self) -> Option<EngineEvent> {
        if self.destroyed {
            return None;
        }
        self.state.borrow_mut().pending.pop_front()
    }

    fn destroy(&mut self) {
        if !self.destroyed {
            self.destroyed = true;
            self.state.borrow_mut().destroyed += 1;
        }
    }
}

#[derive(Default)]
pub struct FakeFullscreenState {
    pub supported: Vec<FullscreenApi>,
    pub fullscreen: bool,
    pub requests: Vec<FullscreenApi>,
    pub exits: Vec<FullscreenApi>,
    pub reject_with: Option<String>,
    pub listeners: Listeners<FullscreenApi>,
    signals: VecDeque<FullscreenSignal>,
}

#[derive(Clone)]
pub struct FakeFullscreenHost {
    state: Rc<RefCell<FakeFullscreenState>>,
}

impl FakeFullscreenHost {
    pub fn new(supported: &[FullscreenApi]) -> Self {
        Self {
            state: Rc::new(RefCell::new(FakeFullscreenState {
                supported: supported.to_vec(),
                ..Default::default()
            })),
        }
    }

    pub fn rejecting(self, reason: &str) -> Self {
        self.state.borrow_mut().reject_with = Some(reason.to_string());
        self
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.count()
    }

    pub fn requests(&self) -> Vec<FullscreenApi> {
        self.state.borrow().requests.clone()
    }

    pub fn exits(&self) -> Vec<FullscreenApi> {
        self.state.borrow().exits.clone()
    }

    /// The user left or entered fullscreen through the platform itself
    pub fn set_fullscreen_externally(&self, on: bool) {
        let api = self
            .state
            .borrow()
            .supported
            .first()
            .copied()
            .unwrap_or(FullscreenApi::Standard);
        self.change(api, on);
    }

    fn change(&self, api: FullscreenApi, on: bool) {
        let mut state = self.state.borrow_mut();
        state.fullscreen = on;
        state.signals.push_back(FullscreenSignal::Changed(api));
    }
}

impl FullscreenHost for FakeFullscreenHost {
    fn supports_request(&self, api: FullscreenApi) -> bool {
        self.state.borrow().supported.contains(&api)
    }

    fn request(&mut self, api: FullscreenApi) {
        let reject = {
            let mut state = self.state.borrow_mut();
            state.requests.push(api);
            state.reject_with.clone()
        };
        match reject {
            Some(reason) => self
                .state
                .borrow_mut()
                .signals
                .push_back(FullscreenSignal::RequestRejected { api, reason }),
            None => self.change(api, true),
        }
    }

    fn supports_exit(&self, api: FullscreenApi) -> bool {
        self.state.borrow().supported.contains(&api)
    }

    fn exit(&mut self, api: FullscreenApi) {
        self.state.borrow_mut().exits.push(api);
        self.change(api, false);
    }

    fn is_fullscreen(&self) -> bool {
        self.state.borrow().fullscreen
    }

    fn add_change_listener(&mut self, api: FullscreenApi) -> ListenerId {
        self.state.borrow_mut().listeners.add(api)
    }

    fn remove_change_listener(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }

    fn next_signal(&mut self) -> Option<FullscreenSignal> {
        let mut state = self.state.borrow_mut();
        while let Some(signal) = state.signals.pop_front() {
            let delivered = match &signal {
                FullscreenSignal::Changed(api) => state.listeners.is_listening(*api),
                FullscreenSignal::RequestRejected { .. } => true,
            };
            if delivered {
                return Some(signal);
            }
        }
        None
    }
}

#[derive(Default)]
pub struct FakePageState {
    pub scroll_locked: bool,
    pub closed: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakePage {
    state: Rc<RefCell<FakePageState>>,
}

impl FakePage {
    pub fn state(&self) -> Ref<'_, FakePageState> {
        self.state.borrow()
    }
}

impl PageHost for FakePage {
    fn set_scroll_locked(&mut self, locked: bool) {
        self.state.borrow_mut().scroll_locked = locked;
    }

    fn player_closed(&mut self, channel_id: &str) {
        self.state.borrow_mut().closed.push(channel_id.to_string());
    }
}

/// Report endpoint whose answers are released by the test
#[derive(Clone, Default)]
pub struct FakeReportSink {
    submitted: Rc<RefCell<Vec<BrokenStreamReport>>>,
    waiting: Rc<RefCell<VecDeque<Sender<Result<(), ReportError>>>>>,
}

impl FakeReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submitted(&self) -> Vec<BrokenStreamReport> {
        self.submitted.borrow().clone()
    }

    /// Settles the oldest outstanding submission
    pub fn resolve(&self, result: Result<(), ReportError>) {
        if let Some(tx) = self.waiting.borrow_mut().pop_front() {
            let _ = tx.send(result);
        }
    }
}

impl ReportSink for FakeReportSink {
    fn submit(&self, report: BrokenStreamReport) -> PendingReport {
        let (tx, rx) = channel();
        self.submitted.borrow_mut().push(report);
        self.waiting.borrow_mut().push_back(tx);
        PendingReport::from_receiver(rx)
    }
}
