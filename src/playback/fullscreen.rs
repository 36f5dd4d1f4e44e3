//! Fullscreen state reflected from the host across vendor API variants.
//!
//! Requests and exits go through an ordered list of API variants; the first
//! one the host (or the media element) supports is used. The controller never
//! assumes a request succeeded: its state only changes when the host reports a
//! fullscreen change, and is then read back from the host.

use tracing::{debug, warn};

use super::media::{ListenerId, MediaElement};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FullscreenError {
    #[error("fullscreen is not supported here")]
    Unsupported,
}

/// Historical fullscreen API variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FullscreenApi {
    /// Enter fullscreen on the video element itself
    ElementNative,
    Standard,
    Webkit,
    Moz,
    Ms,
}

impl FullscreenApi {
    pub const REQUEST_ORDER: [FullscreenApi; 5] = [
        FullscreenApi::ElementNative,
        FullscreenApi::Standard,
        FullscreenApi::Webkit,
        FullscreenApi::Moz,
        FullscreenApi::Ms,
    ];

    pub const EXIT_ORDER: [FullscreenApi; 4] = [
        FullscreenApi::Standard,
        FullscreenApi::Webkit,
        FullscreenApi::Moz,
        FullscreenApi::Ms,
    ];

    pub fn request_method(&self) -> &'static str {
        match self {
            FullscreenApi::ElementNative => "webkitEnterFullscreen",
            FullscreenApi::Standard => "requestFullscreen",
            FullscreenApi::Webkit => "webkitRequestFullscreen",
            FullscreenApi::Moz => "mozRequestFullScreen",
            FullscreenApi::Ms => "msRequestFullscreen",
        }
    }

    pub fn exit_method(&self) -> Option<&'static str> {
        match self {
            FullscreenApi::ElementNative => None,
            FullscreenApi::Standard => Some("exitFullscreen"),
            FullscreenApi::Webkit => Some("webkitExitFullscreen"),
            FullscreenApi::Moz => Some("mozCancelFullScreen"),
            FullscreenApi::Ms => Some("msExitFullscreen"),
        }
    }

    /// Change event fired by the host for this variant
    pub fn change_event(&self) -> Option<&'static str> {
        match self {
            FullscreenApi::ElementNative => None,
            FullscreenApi::Standard => Some("fullscreenchange"),
            FullscreenApi::Webkit => Some("webkitfullscreenchange"),
            FullscreenApi::Moz => Some("mozfullscreenchange"),
            FullscreenApi::Ms => Some("MSFullscreenChange"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FullscreenSignal {
    /// A change event for the given variant fired
    Changed(FullscreenApi),
    /// An earlier request settled with a failure
    RequestRejected { api: FullscreenApi, reason: String },
}

/// The document and player container, as far as fullscreen is concerned
pub trait FullscreenHost {
    fn supports_request(&self, api: FullscreenApi) -> bool;
    /// Fire-and-forget; failure settles later as `RequestRejected`
    fn request(&mut self, api: FullscreenApi);
    fn supports_exit(&self, api: FullscreenApi) -> bool;
    fn exit(&mut self, api: FullscreenApi);
    /// True if any variant reports a fullscreen element
    fn is_fullscreen(&self) -> bool;
    fn add_change_listener(&mut self, api: FullscreenApi) -> ListenerId;
    fn remove_change_listener(&mut self, id: ListenerId);
    fn next_signal(&mut self) -> Option<FullscreenSignal>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullscreenState {
    Normal,
    Fullscreen,
}

/// What Escape should do given the current fullscreen state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeAction {
    ClosePlayer,
    /// The host leaves fullscreen on its own
    DeferToHost,
}

pub struct FullscreenController {
    state: FullscreenState,
    listeners: Vec<ListenerId>,
}

impl FullscreenController {
    /// Subscribes all change-event variants at once; only one ever fires
    pub fn attach(host: &mut dyn FullscreenHost) -> Self {
        let listeners = FullscreenApi::EXIT_ORDER
            .iter()
            .map(|api| host.add_change_listener(*api))
            .collect();
        Self {
            state: reflect(host),
            listeners,
        }
    }

    pub fn state(&self) -> FullscreenState {
        self.state
    }

    pub fn is_fullscreen(&self) -> bool {
        self.state == FullscreenState::Fullscreen
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    /// Asks for fullscreen with the first supported variant
    pub fn request(
        &mut self,
        host: &mut dyn FullscreenHost,
        media: &mut dyn MediaElement,
    ) -> Option<FullscreenApi> {
        let api = FullscreenApi::REQUEST_ORDER.into_iter().find(|api| match api {
            FullscreenApi::ElementNative => media.supports_native_fullscreen(),
            _ => host.supports_request(*api),
        })?;

        debug!("Requesting fullscreen via {}", api.request_method());
        match api {
            FullscreenApi::ElementNative => {
                if let Err(e) = media.enter_native_fullscreen() {
                    warn!("Error attempting to enable full-screen mode: {}", e);
                }
            }
            _ => host.request(api),
        }
        Some(api)
    }

    pub fn exit(&mut self, host: &mut dyn FullscreenHost) -> Option<FullscreenApi> {
        let api = FullscreenApi::EXIT_ORDER
            .into_iter()
            .find(|api| host.supports_exit(*api))?;
        debug!("Leaving fullscreen via {:?}", api.exit_method());
        host.exit(api);
        Some(api)
    }

    /// Requests or exits based on what the host currently reports
    pub fn toggle(
        &mut self,
        host: &mut dyn FullscreenHost,
        media: &mut dyn MediaElement,
    ) -> Option<FullscreenApi> {
        if host.is_fullscreen() {
            self.exit(host)
        } else {
            self.request(host, media)
        }
    }

    pub fn on_signal(&mut self, signal: &FullscreenSignal, host: &dyn FullscreenHost) {
        if !self.is_attached() {
            return;
        }
        match signal {
            FullscreenSignal::Changed(api) => {
                self.state = reflect(host);
                debug!("{:?} -> {:?}", api.change_event(), self.state);
            }
            FullscreenSignal::RequestRejected { api, reason } => {
                warn!(
                    "Error attempting to enable full-screen mode via {}: {}",
                    api.request_method(),
                    reason
                );
            }
        }
    }

    pub fn escape_action(&self) -> EscapeAction {
        match self.state {
            FullscreenState::Normal => EscapeAction::ClosePlayer,
            FullscreenState::Fullscreen => EscapeAction::DeferToHost,
        }
    }

    pub fn detach(&mut self, host: &mut dyn FullscreenHost) {
        for id in self.listeners.drain(..) {
            host.remove_change_listener(id);
        }
    }
}

fn reflect(host: &dyn FullscreenHost) -> FullscreenState {
    if host.is_fullscreen() {
        FullscreenState::Fullscreen
    } else {
        FullscreenState::Normal
    }
}
