//! One open player: ties a channel to the engine, monitors and report flow.

use std::rc::Rc;
use std::time::Instant;
use tracing::{debug, info};

use super::buffering::BufferingMonitor;
use super::engine::{EngineBackend, EngineConfig, PlaybackPath, StreamEngineAdapter};
use super::fullscreen::{
    EscapeAction, FullscreenApi, FullscreenController, FullscreenHost, FullscreenState,
};
use super::media::{MediaElement, MediaEvent};
use super::report::{ReportChannel, ReportIcon, ReportOutcome, ReportSink, ReportState};
use crate::models::Channel;

/// Viewports narrower than this get abbreviated labels
pub const NARROW_VIEWPORT_WIDTH: f32 = 640.0;

/// Page-level hooks of the hosting shell
pub trait PageHost {
    fn set_scroll_locked(&mut self, locked: bool);
    fn player_closed(&mut self, channel_id: &str);
}

/// Platform surfaces a session takes exclusive ownership of
pub struct PlayerSurfaces {
    pub media: Box<dyn MediaElement>,
    pub fullscreen: Box<dyn FullscreenHost>,
    pub page: Box<dyn PageHost>,
}

/// Shared collaborators, the same for every session of a player
#[derive(Clone)]
pub struct PlaybackServices {
    pub engine: Rc<dyn EngineBackend>,
    pub reporter: Rc<dyn ReportSink>,
    pub engine_config: EngineConfig,
}

/// Things the shell must show the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    ReportSucceeded,
    /// Blocking alert text
    ReportFailed(String),
}

pub struct PlaybackSession {
    channel: Channel,
    surfaces: PlayerSurfaces,
    services: PlaybackServices,
    adapter: StreamEngineAdapter,
    buffering: BufferingMonitor,
    fullscreen: FullscreenController,
    report: ReportChannel,
    muted: bool,
    narrow: bool,
    alive: bool,
}

impl PlaybackSession {
    pub fn open(channel: Channel, mut surfaces: PlayerSurfaces, services: PlaybackServices) -> Self {
        info!("Opening {} ({})", channel.name(), channel.id());
        surfaces.page.set_scroll_locked(true);

        let adapter = StreamEngineAdapter::attach(
            channel.stream_url(),
            surfaces.media.as_mut(),
            services.engine.as_ref(),
            &services.engine_config,
        );
        let buffering = BufferingMonitor::attach(surfaces.media.as_mut());
        let fullscreen = FullscreenController::attach(surfaces.fullscreen.as_mut());
        let muted = surfaces.media.is_muted();

        Self {
            channel,
            surfaces,
            services,
            adapter,
            buffering,
            fullscreen,
            report: ReportChannel::new(),
            muted,
            narrow: false,
            alive: true,
        }
    }

    /// Processes everything that settled since the last turn
    pub fn pump(&mut self, now: Instant) -> Vec<SessionNotice> {
        let mut notices = Vec::new();
        if !self.alive {
            return notices;
        }

        self.adapter.pump(self.surfaces.media.as_mut());

        while let Some(event) = self.surfaces.media.next_event() {
            self.adapter.on_media_event(&event, self.surfaces.media.as_mut());
            match &event {
                MediaEvent::PlayRejected(reason) => {
                    info!("Autoplay was prevented: {}", reason);
                    self.buffering.clear();
                }
                other => self.buffering.observe(other),
            }
        }

        while let Some(signal) = self.surfaces.fullscreen.next_signal() {
            self.fullscreen.on_signal(&signal, self.surfaces.fullscreen.as_ref());
        }

        match self.report.poll(now) {
            Some(ReportOutcome::Succeeded) => notices.push(SessionNotice::ReportSucceeded),
            Some(ReportOutcome::Failed(message)) => notices.push(SessionNotice::ReportFailed(message)),
            None => {}
        }

        notices
    }

    /// Flips the element's mute flag and mirrors it; returns the new value
    pub fn toggle_mute(&mut self) -> bool {
        if self.alive {
            let media = self.surfaces.media.as_mut();
            let muted = !media.is_muted();
            media.set_muted(muted);
            self.muted = media.is_muted();
        }
        self.muted
    }

    pub fn toggle_fullscreen(&mut self) -> Option<FullscreenApi> {
        if !self.alive {
            return None;
        }
        self.fullscreen
            .toggle(self.surfaces.fullscreen.as_mut(), self.surfaces.media.as_mut())
    }

    /// Returns true if a report was actually sent
    pub fn report(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        let sent = self.report.submit(&self.channel, self.services.reporter.as_ref());
        if sent {
            debug!("Reporting {} as broken", self.channel.id());
        }
        sent
    }

    pub fn escape_action(&self) -> EscapeAction {
        self.fullscreen.escape_action()
    }

    pub fn set_viewport_width(&mut self, width: f32) {
        self.narrow = width < NARROW_VIEWPORT_WIDTH;
    }

    /// Tears everything down. Only the first call does anything.
    pub fn close(&mut self) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;

        let media = self.surfaces.media.as_mut();
        self.adapter.teardown(media);
        self.buffering.detach(media);
        // The player surface goes away, so fullscreen must not outlive it
        if self.surfaces.fullscreen.is_fullscreen() {
            self.fullscreen.exit(self.surfaces.fullscreen.as_mut());
        }
        self.fullscreen.detach(self.surfaces.fullscreen.as_mut());
        self.report.cancel();

        self.surfaces.page.set_scroll_locked(false);
        self.surfaces.page.player_closed(self.channel.id());
        info!("Closed {}", self.channel.id());
        true
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn playback_path(&self) -> PlaybackPath {
        self.adapter.path()
    }

    pub fn is_engine_live(&self) -> bool {
        self.adapter.is_engine_live()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering.is_buffering()
    }

    pub fn fullscreen_state(&self) -> FullscreenState {
        self.fullscreen.state()
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen.is_fullscreen()
    }

    pub fn is_narrow(&self) -> bool {
        self.narrow
    }

    pub fn report_state(&self) -> ReportState {
        self.report.state()
    }

    pub fn report_enabled(&self) -> bool {
        self.alive && self.report.is_enabled()
    }

    pub fn report_label(&self) -> &'static str {
        self.report.label(self.narrow)
    }

    pub fn report_icon(&self) -> ReportIcon {
        self.report.icon()
    }

    pub fn mute_label(&self) -> &'static str {
        if self.muted { "Unmute" } else { "Mute" }
    }

    pub fn fullscreen_label(&self) -> &'static str {
        if self.is_fullscreen() { "Exit Fullscreen" } else { "Enter Fullscreen" }
    }

    pub fn subcategory_display(&self) -> String {
        self.channel.sub_category().display()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
