//! Tests for the playback session and player instance

use std::rc::Rc;
use std::time::{Duration, Instant};

use super::*;
use crate::models::{Channel, NationalSubCategory};
use crate::playback::engine::EngineEvent;
use crate::playback::player::LivePlayer;
use crate::playback::report::{ReportError, REPORT_COOLDOWN};
use crate::playback::testing::{
    FakeEngineBackend, FakeFullscreenHost, FakeMedia, FakePage, FakeReportSink, PlayPolicy,
};

struct Rig {
    media: FakeMedia,
    host: FakeFullscreenHost,
    page: FakePage,
    engine: FakeEngineBackend,
    reporter: FakeReportSink,
}

impl Rig {
    fn new() -> Self {
        Self::with(FakeMedia::new(), FakeEngineBackend::supported())
    }

    fn with(media: FakeMedia, engine: FakeEngineBackend) -> Self {
        Self {
            media,
            host: FakeFullscreenHost::new(&[FullscreenApi::Standard]),
            page: FakePage::default(),
            engine,
            reporter: FakeReportSink::new(),
        }
    }

    fn surfaces(&self) -> PlayerSurfaces {
        PlayerSurfaces {
            media: Box::new(self.media.clone()),
            fullscreen: Box::new(self.host.clone()),
            page: Box::new(self.page.clone()),
        }
    }

    fn services(&self) -> PlaybackServices {
        PlaybackServices {
            engine: Rc::new(self.engine.clone()),
            reporter: Rc::new(self.reporter.clone()),
            engine_config: EngineConfig::default(),
        }
    }

    fn open(&self, channel: Channel) -> PlaybackSession {
        PlaybackSession::open(channel, self.surfaces(), self.services())
    }

    fn player(&self) -> LivePlayer {
        let media = self.media.clone();
        let host = self.host.clone();
        let page = self.page.clone();
        LivePlayer::new(
            Box::new(move || PlayerSurfaces {
                media: Box::new(media.clone()),
                fullscreen: Box::new(host.clone()),
                page: Box::new(page.clone()),
            }),
            self.services(),
        )
    }

    fn listeners(&self) -> usize {
        self.media.listener_count() + self.host.listener_count()
    }
}

fn english_channel() -> Channel {
    Channel::national("c1", "News One", "", "https://x/live.m3u8", NationalSubCategory::English)
        .unwrap()
}

fn regional_channel() -> Channel {
    Channel::regional(
        "r1",
        "State News",
        "",
        "https://x/r1.m3u8",
        vec!["Bihar".to_string(), "Jharkhand".to_string()],
    )
    .unwrap()
}

#[test]
fn test_open_then_close_leaves_nothing_attached() {
    for channel in [english_channel(), regional_channel()] {
        let rig = Rig::new();
        let mut session = rig.open(channel);
        assert!(rig.listeners() > 0);
        assert_eq!(rig.engine.live_engines(), 1);
        assert!(rig.page.state().scroll_locked);

        assert!(session.close());
        assert_eq!(rig.listeners(), 0);
        assert_eq!(rig.engine.live_engines(), 0);
        assert!(!rig.page.state().scroll_locked);
    }
}

#[test]
fn test_close_twice_destroys_engine_once() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());

    assert!(session.close());
    assert!(!session.close());
    drop(session);

    assert_eq!(rig.engine.state().destroyed, 1);
    assert_eq!(rig.page.state().closed, vec!["c1".to_string()]);
}

#[test]
fn test_drop_closes_session() {
    let rig = Rig::new();
    {
        let _session = rig.open(english_channel());
    }
    assert_eq!(rig.engine.live_engines(), 0);
    assert_eq!(rig.listeners(), 0);
    assert_eq!(rig.page.state().closed.len(), 1);
}

#[test]
fn test_engine_receives_live_tuning() {
    let rig = Rig::new();
    let _session = rig.open(english_channel());
    let config = rig.engine.state().last_config.clone().unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(rig.engine.state().loaded_sources, vec!["https://x/live.m3u8".to_string()]);
}

#[test]
fn test_buffering_follows_playing_and_waiting() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());
    let now = Instant::now();
    assert!(session.is_buffering());

    session.pump(now);
    assert!(session.is_buffering());

    rig.media.dispatch(MediaEvent::Playing);
    session.pump(now);
    assert!(!session.is_buffering());

    rig.media.dispatch(MediaEvent::Waiting);
    session.pump(now);
    assert!(session.is_buffering());

    rig.media.dispatch(MediaEvent::Playing);
    rig.media.dispatch(MediaEvent::Stalled);
    session.pump(now);
    assert!(session.is_buffering());
}

#[test]
fn test_events_after_close_do_not_mutate() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());
    session.close();

    rig.media.dispatch(MediaEvent::Playing);
    rig.engine.emit(EngineEvent::ManifestParsed);
    session.pump(Instant::now());

    assert!(session.is_buffering());
    assert_eq!(rig.media.state().play_calls, 0);
}

#[test]
fn test_autoplay_rejection_clears_buffering_quietly() {
    let rig = Rig::with(
        FakeMedia::new().with_play_policy(PlayPolicy::Reject("NotAllowedError".into())),
        FakeEngineBackend::supported(),
    );
    let mut session = rig.open(english_channel());

    rig.engine.emit(EngineEvent::ManifestParsed);
    let notices = session.pump(Instant::now());
    // settlement lands in the element queue during this turn
    let more = session.pump(Instant::now());

    assert!(notices.is_empty() && more.is_empty());
    assert!(!session.is_buffering());
    assert!(session.is_alive());
}

#[test]
fn test_native_path_starts_on_metadata() {
    let rig = Rig::with(
        FakeMedia::new()
            .with_native_hls()
            .with_play_policy(PlayPolicy::Succeed),
        FakeEngineBackend::unsupported(),
    );
    let mut session = rig.open(english_channel());
    assert_eq!(session.playback_path(), PlaybackPath::Native);
    assert_eq!(rig.media.state().src.as_deref(), Some("https://x/live.m3u8"));

    rig.media.dispatch(MediaEvent::LoadedMetadata);
    session.pump(Instant::now());
    assert_eq!(rig.media.state().play_calls, 1);

    session.pump(Instant::now());
    assert!(!session.is_buffering());
}

#[test]
fn test_no_playback_path_stays_buffering() {
    let rig = Rig::with(FakeMedia::new(), FakeEngineBackend::unsupported());
    let mut session = rig.open(english_channel());
    session.pump(Instant::now());

    assert_eq!(session.playback_path(), PlaybackPath::Unavailable);
    assert!(session.is_buffering());
    assert!(session.is_alive());
}

#[test]
fn test_toggle_mute_twice_restores() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());
    let original = session.is_muted();

    assert_eq!(session.toggle_mute(), !original);
    assert_eq!(rig.media.state().muted, !original);
    assert_eq!(session.mute_label(), "Unmute");

    assert_eq!(session.toggle_mute(), original);
    assert_eq!(rig.media.state().muted, original);
    assert_eq!(session.mute_label(), "Mute");
}

#[test]
fn test_fullscreen_reflects_host_events() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());
    let now = Instant::now();

    assert_eq!(session.toggle_fullscreen(), Some(FullscreenApi::Standard));
    assert!(!session.is_fullscreen());
    session.pump(now);
    assert!(session.is_fullscreen());
    assert_eq!(session.fullscreen_label(), "Exit Fullscreen");
    assert_eq!(session.escape_action(), EscapeAction::DeferToHost);

    // user pressed the platform's own exit
    rig.host.set_fullscreen_externally(false);
    session.pump(now);
    assert_eq!(session.fullscreen_state(), FullscreenState::Normal);
    assert_eq!(session.escape_action(), EscapeAction::ClosePlayer);
}

#[test]
fn test_report_scenario_success_then_cooldown() {
    let rig = Rig::with(
        FakeMedia::new().with_play_policy(PlayPolicy::Succeed),
        FakeEngineBackend::supported(),
    );
    let mut session = rig.open(english_channel());
    let start = Instant::now();
    assert!(session.is_buffering());

    rig.engine.emit(EngineEvent::ManifestParsed);
    session.pump(start);
    session.pump(start);
    assert!(!session.is_buffering());

    assert!(session.report());
    assert_eq!(session.report_state(), ReportState::Submitting);
    assert!(!session.report());
    assert_eq!(rig.reporter.submitted().len(), 1);
    assert_eq!(rig.reporter.submitted()[0].channel_id, "c1");
    assert_eq!(rig.reporter.submitted()[0].channel_name, "News One");

    rig.reporter.resolve(Ok(()));
    let success_at = start + Duration::from_millis(250);
    assert_eq!(session.pump(success_at), vec![SessionNotice::ReportSucceeded]);
    assert_eq!(session.report_label(), "REPORTED");
    assert_eq!(session.report_icon(), ReportIcon::Check);

    assert!(!session.report());
    session.pump(success_at + Duration::from_millis(2999));
    assert!(!session.report_enabled());

    session.pump(success_at + REPORT_COOLDOWN);
    assert_eq!(session.report_state(), ReportState::Idle);
    assert_eq!(rig.reporter.submitted().len(), 1);
}

#[test]
fn test_report_failure_alerts_and_allows_resubmit() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());

    session.report();
    rig.reporter.resolve(Err(ReportError::Rejected("503".into())));
    let notices = session.pump(Instant::now());
    assert!(matches!(notices.as_slice(), [SessionNotice::ReportFailed(_)]));
    assert_eq!(session.report_state(), ReportState::Idle);

    assert!(session.report());
    assert_eq!(rig.reporter.submitted().len(), 2);
}

#[test]
fn test_close_cancels_pending_report() {
    let rig = Rig::new();
    let mut session = rig.open(english_channel());
    session.report();
    session.close();

    rig.reporter.resolve(Ok(()));
    assert!(session.pump(Instant::now()).is_empty());
    assert_eq!(session.report_state(), ReportState::Idle);
    assert!(!session.report());
}

#[test]
fn test_narrow_viewport_shortens_labels_only() {
    let rig = Rig::new();
    let mut session = rig.open(regional_channel());

    session.set_viewport_width(1024.0);
    assert_eq!(session.report_label(), "REPORT NOT WORKING");
    session.set_viewport_width(375.0);
    assert!(session.is_narrow());
    assert_eq!(session.report_label(), "REPORT");
    assert_eq!(session.playback_path(), PlaybackPath::Engine);
    assert_eq!(session.subcategory_display(), "Bihar, Jharkhand");
}

#[test]
fn test_player_replaces_session_without_leaks() {
    let rig = Rig::new();
    let mut player = rig.player();

    assert!(player.open(Some(english_channel())));
    assert!(player.open(Some(regional_channel())));

    assert_eq!(rig.engine.state().created, 2);
    assert_eq!(rig.engine.live_engines(), 1);
    // one buffering set plus four change listeners
    assert_eq!(rig.media.listener_count(), 3);
    assert_eq!(rig.host.listener_count(), 4);
    assert_eq!(rig.page.state().closed, vec!["c1".to_string()]);
    assert_eq!(player.session().map(|s| s.channel().id()), Some("r1"));

    assert!(player.close());
    assert!(!player.close());
    assert_eq!(rig.listeners(), 0);
    assert_eq!(rig.engine.live_engines(), 0);
}

#[test]
fn test_player_open_none_is_noop() {
    let rig = Rig::new();
    let mut player = rig.player();
    assert!(!player.open(None));
    assert!(!player.is_open());
    assert_eq!(rig.engine.state().created, 0);
    assert!(player.pump(Instant::now()).is_empty());
}

#[test]
fn test_escape_closes_only_when_not_fullscreen() {
    let rig = Rig::new();
    let mut player = rig.player();
    player.open(Some(english_channel()));

    if let Some(session) = player.session_mut() {
        session.toggle_fullscreen();
    }
    player.pump(Instant::now());
    assert!(!player.handle_escape());
    assert!(player.is_open());

    rig.host.set_fullscreen_externally(false);
    player.pump(Instant::now());
    assert!(player.handle_escape());
    assert!(!player.is_open());
    assert_eq!(rig.engine.live_engines(), 0);
}

#[test]
fn test_close_while_fullscreen_leaves_fullscreen() {
    let rig = Rig::new();
    let mut player = rig.player();
    player.open(Some(english_channel()));

    if let Some(session) = player.session_mut() {
        session.toggle_fullscreen();
    }
    player.pump(Instant::now());
    assert!(player.session().is_some_and(|s| s.is_fullscreen()));

    assert!(player.close());
    assert_eq!(rig.host.exits(), vec![FullscreenApi::Standard]);
    assert!(!rig.host.is_fullscreen());
    assert_eq!(rig.host.listener_count(), 0);
}

#[test]
fn test_close_in_normal_mode_does_not_exit() {
    let rig = Rig::new();
    let mut player = rig.player();
    player.open(Some(english_channel()));
    player.close();
    assert!(rig.host.exits().is_empty());
}
