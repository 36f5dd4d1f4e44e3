//! Live stream playback controller
//!
//! A `LivePlayer` holds at most one `PlaybackSession`. The session binds a
//! channel to a media element through the `StreamEngineAdapter`, keeps the
//! buffering and fullscreen state in sync with the host, and runs the broken
//! stream report flow. Everything is single-threaded: the host calls
//! `pump(now)` once per UI turn and the session applies whatever settled
//! since the last turn.
//!
//! Platform capabilities are traits (`MediaElement`, `EngineBackend`,
//! `FullscreenHost`, `PageHost`, `ReportSink`) so the same core runs under
//! the desktop shell and under tests.

mod buffering;
mod engine;
mod fullscreen;
mod media;
mod player;
mod report;
mod session;

#[cfg(test)]
pub mod testing;

pub use buffering::BufferingMonitor;
pub use engine::{
    AdaptiveEngine, EngineBackend, EngineConfig, EngineEvent, EngineHandle, PlaybackPath,
    StartQuality, StreamEngineAdapter,
};
pub use fullscreen::{
    EscapeAction, FullscreenApi, FullscreenController, FullscreenError, FullscreenHost,
    FullscreenSignal, FullscreenState,
};
pub use media::{
    DecodedFrame, ListenerId, Listeners, MediaElement, MediaEvent, MediaEventKind, MediaSink,
    HLS_MIME,
};
pub use player::{LivePlayer, SurfaceFactory};
pub use report::{
    BrokenStreamReport, PendingReport, ReportChannel, ReportError, ReportIcon, ReportOutcome,
    ReportSink, ReportState, REPORT_COOLDOWN,
};
pub use session::{
    PageHost, PlaybackServices, PlaybackSession, PlayerSurfaces, SessionNotice,
    NARROW_VIEWPORT_WIDTH,
};
