//! Player instance: at most one live session at a time

use std::time::Instant;
use tracing::debug;

use super::fullscreen::EscapeAction;
use super::session::{PlaybackServices, PlaybackSession, PlayerSurfaces, SessionNotice};
use crate::models::Channel;

/// Builds the surfaces for the next session
pub type SurfaceFactory = Box<dyn FnMut() -> PlayerSurfaces>;

pub struct LivePlayer {
    make_surfaces: SurfaceFactory,
    services: PlaybackServices,
    session: Option<PlaybackSession>,
}

impl LivePlayer {
    pub fn new(make_surfaces: SurfaceFactory, services: PlaybackServices) -> Self {
        Self {
            make_surfaces,
            services,
            session: None,
        }
    }

    /// Opens `channel`, closing the current session first. `None` is a no-op.
    pub fn open(&mut self, channel: Option<Channel>) -> bool {
        let Some(channel) = channel else {
            debug!("No channel selected, nothing to open");
            return false;
        };

        self.close();
        let surfaces = (self.make_surfaces)();
        self.session = Some(PlaybackSession::open(channel, surfaces, self.services.clone()));
        true
    }

    /// Returns false when nothing was open
    pub fn close(&mut self) -> bool {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        self.session.as_mut()
    }

    pub fn pump(&mut self, now: Instant) -> Vec<SessionNotice> {
        self.session
            .as_mut()
            .map(|session| session.pump(now))
            .unwrap_or_default()
    }

    /// Escape closes the player unless fullscreen is up. Returns true if closed.
    pub fn handle_escape(&mut self) -> bool {
        let action = self.session.as_ref().map(PlaybackSession::escape_action);
        match action {
            Some(EscapeAction::ClosePlayer) => self.close(),
            _ => false,
        }
    }
}
