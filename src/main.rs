//! Live News Player
//! A desktop player for live Indian news channels

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod catalog;
mod config;
mod error;
mod ffmpeg_player;
mod models;
mod playback;
mod surface;

use api::{BackendClient, HttpReporter, UnconfiguredReporter};
use config::*;
use ffmpeg_player::FfmpegBackend;
use models::*;
use playback::{
    LivePlayer, PlaybackPath, PlaybackServices, PlayerSurfaces, ReportIcon, ReportSink,
    SessionNotice,
};
use surface::{ShellPage, VideoFeed, VideoSurface, WindowFullscreen};

/// Background task messages
enum TaskResult {
    ChannelsLoaded(Vec<Channel>),
}

/// Buttons of the player window, applied after the window is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
enum PlayerAction {
    Report,
    ToggleMute,
    ToggleFullscreen,
    Close,
}

fn main() -> Result<(), eframe::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("live_news_player=info")),
        )
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 700.0])
            .with_min_inner_size([360.0, 480.0]),
        vsync: true,
        hardware_acceleration: eframe::HardwareAcceleration::Preferred,
        ..Default::default()
    };

    eframe::run_native(
        "Live News Player",
        options,
        Box::new(|cc| Ok(Box::new(LiveNewsApp::new(&cc.egui_ctx)))),
    )
}

struct LiveNewsApp {
    config: AppConfig,
    preferences: JsonPreferenceStore,
    current_tab: Tab,

    // Catalog
    channels: Vec<Channel>,
    loading: bool,
    status_message: String,
    task_sender: Sender<TaskResult>,
    task_receiver: Receiver<TaskResult>,

    // Player
    player: LivePlayer,
    page: ShellPage,
    video_feed: Rc<RefCell<Option<VideoFeed>>>,
    texture: Option<egui::TextureHandle>,
    report_alert: Option<String>,
    content_rect: egui::Rect,

    // Settings form
    backend_url_input: String,
    backend_key_input: String,
    external_player_input: String,
    applied_font_size: Option<u32>,
}

impl LiveNewsApp {
    fn new(ctx: &egui::Context) -> Self {
        let config = AppConfig::load();
        let preferences = JsonPreferenceStore::open_default();
        let current_tab = match load_content_preference(&preferences) {
            ContentPreference::National => Tab::National,
            ContentPreference::Regional => Tab::Regional,
        };

        let page = ShellPage::new();
        let video_feed = Rc::new(RefCell::new(None));
        let player = Self::build_player(ctx, &config, &page, &video_feed);
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            backend_url_input: config.backend_url.clone(),
            backend_key_input: config.backend_key.clone(),
            external_player_input: config.external_player.clone(),
            config,
            preferences,
            current_tab,
            channels: Vec::new(),
            loading: false,
            status_message: String::new(),
            task_sender,
            task_receiver,
            player,
            page,
            video_feed,
            texture: None,
            report_alert: None,
            content_rect: egui::Rect::EVERYTHING,
            applied_font_size: None,
        };
        app.load_catalog();
        app
    }

    fn build_player(
        ctx: &egui::Context,
        config: &AppConfig,
        page: &ShellPage,
        video_feed: &Rc<RefCell<Option<VideoFeed>>>,
    ) -> LivePlayer {
        let reporter: Rc<dyn ReportSink> = match BackendClient::from_config(config) {
            Some(client) => Rc::new(HttpReporter::new(client)),
            None => Rc::new(UnconfiguredReporter),
        };
        let services = PlaybackServices {
            engine: Rc::new(FfmpegBackend::new(&config.user_agent)),
            reporter,
            engine_config: config.engine.clone(),
        };

        let ctx = ctx.clone();
        let external_player = config.external_player.clone();
        let page = page.clone();
        let video_feed = Rc::clone(video_feed);
        let make_surfaces = Box::new(move || {
            let media = VideoSurface::new(&external_player);
            *video_feed.borrow_mut() = Some(media.feed());
            PlayerSurfaces {
                media: Box::new(media),
                fullscreen: Box::new(WindowFullscreen::new(&ctx)),
                page: Box::new(page.clone()),
            }
        });

        LivePlayer::new(make_surfaces, services)
    }

    fn load_catalog(&mut self) {
        self.loading = true;
        self.status_message = "Loading channels...".to_string();

        let client = BackendClient::from_config(&self.config);
        let local = AppConfig::local_catalog_path();
        let sender = self.task_sender.clone();
        thread::spawn(move || {
            let channels = catalog::load_channels(client.as_ref(), &local);
            let _ = sender.send(TaskResult::ChannelsLoaded(channels));
        });
    }

    fn select_tab(&mut self, tab: Tab) {
        if self.current_tab == tab {
            return;
        }
        self.current_tab = tab;

        let pref = match tab {
            Tab::National => ContentPreference::National,
            Tab::Regional => ContentPreference::Regional,
            Tab::Settings => return,
        };
        if let Err(e) = save_content_preference(&self.preferences, pref) {
            warn!("Could not save content preference: {}", e);
        }
    }

    fn open_channel(&mut self, channel: Option<Channel>) {
        if self.player.open(channel) {
            self.texture = None;
        }
    }

    fn apply_settings(&mut self) {
        self.config.backend_url = self.backend_url_input.trim().to_string();
        self.config.backend_key = self.backend_key_input.trim().to_string();
        self.config.external_player = self.external_player_input.trim().to_string();

        match self.config.save() {
            Ok(()) => self.status_message = "Settings saved".to_string(),
            Err(e) => {
                warn!("Could not save settings: {}", e);
                self.status_message = format!("Could not save settings: {}", e);
            }
        }
    }

    fn apply_style(&mut self, ctx: &egui::Context) {
        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        if self.applied_font_size == Some(self.config.font_size) {
            return;
        }
        self.applied_font_size = Some(self.config.font_size);
        let size = self.config.font_size as f32;
        ctx.style_mut(|style| {
            for (text_style, font_id) in style.text_styles.iter_mut() {
                font_id.size = match text_style {
                    egui::TextStyle::Heading => size * 1.4,
                    egui::TextStyle::Small => size * 0.8,
                    _ => size,
                };
            }
        });
    }

    fn process_notices(&mut self, notices: Vec<SessionNotice>) {
        for notice in notices {
            match notice {
                SessionNotice::ReportSucceeded => {
                    self.status_message = "Thanks, the stream was reported".to_string();
                }
                SessionNotice::ReportFailed(message) => {
                    self.report_alert = Some(message);
                }
            }
        }
    }
}

impl eframe::App for LiveNewsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::ChannelsLoaded(channels) => {
                    self.status_message = format!("{} channels", channels.len());
                    self.channels = channels;
                    self.loading = false;
                }
            }
        }

        let notices = self.player.pump(Instant::now());
        self.process_notices(notices);

        if let Some(channel_id) = self.page.take_closed() {
            info!("Player closed for {}", channel_id);
            // A replacement session may already own the feed
            if !self.player.is_open() {
                self.texture = None;
                *self.video_feed.borrow_mut() = None;
            }
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) && self.report_alert.is_none() {
            if !self.player.handle_escape() {
                // The window plays the host's part and leaves fullscreen itself
                if let Some(session) = self.player.session_mut() {
                    if session.is_fullscreen() {
                        session.toggle_fullscreen();
                    }
                }
            }
        }

        // Request repaint while loading or while a player is open
        if self.loading || self.player.is_open() {
            ctx.request_repaint();
        }

        self.apply_style(ctx);

        let fullscreen = self.player.session().is_some_and(|s| s.is_fullscreen());
        if !fullscreen {
            self.show_top_panel(ctx);
            egui::TopBottomPanel::bottom("bottom_panel").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    if self.loading {
                        ui.spinner();
                    }
                    ui.label(&self.status_message);
                });
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.content_rect = ui.max_rect();
            if fullscreen {
                return;
            }
            egui::ScrollArea::vertical()
                .enable_scrolling(!self.page.is_scroll_locked())
                .auto_shrink([false, false])
                .show(ui, |ui| match self.current_tab {
                    Tab::National => self.show_national_tab(ui),
                    Tab::Regional => self.show_regional_tab(ui),
                    Tab::Settings => self.show_settings_tab(ui),
                });
        });

        if let Some(session) = self.player.session_mut() {
            session.set_viewport_width(self.content_rect.width());
        }

        self.show_player(ctx, fullscreen);
        self.show_report_alert(ctx);
    }
}

impl LiveNewsApp {
    fn show_top_panel(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("📺 Live News");
                ui.separator();

                let mut tab = self.current_tab;
                ui.selectable_value(&mut tab, Tab::National, "NATIONAL");
                ui.selectable_value(&mut tab, Tab::Regional, "REGIONAL");
                ui.selectable_value(&mut tab, Tab::Settings, "⚙ SETTINGS");
                self.select_tab(tab);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.add_enabled(!self.loading, egui::Button::new("⟳ Reload")).clicked() {
                        self.load_catalog();
                    }
                });
            });
        });
    }

    fn show_national_tab(&mut self, ui: &mut egui::Ui) {
        let groups = catalog::group_national(&self.channels);
        if groups.is_empty() {
            self.show_empty(ui);
            return;
        }

        let mut selected = None;
        for (sub_category, channels) in &groups {
            ui.add_space(8.0);
            ui.heading(sub_category.as_str());
            ui.separator();
            if let Some(channel) = Self::channel_grid(ui, channels) {
                selected = Some(channel);
            }
        }
        self.open_channel(selected);
    }

    fn show_regional_tab(&mut self, ui: &mut egui::Ui) {
        let groups = catalog::group_regional(&self.channels);
        if groups.is_empty() {
            self.show_empty(ui);
            return;
        }

        let mut selected = None;
        for (state, channels) in &groups {
            ui.add_space(8.0);
            ui.heading(state);
            ui.separator();
            if let Some(channel) = Self::channel_grid(ui, channels) {
                selected = Some(channel);
            }
        }
        self.open_channel(selected);
    }

    fn show_empty(&self, ui: &mut egui::Ui) {
        ui.add_space(40.0);
        ui.vertical_centered(|ui| {
            if self.loading {
                ui.spinner();
            } else {
                ui.label("No channels available right now.");
            }
        });
    }

    /// Returns the channel whose card was clicked
    fn channel_grid(ui: &mut egui::Ui, channels: &[Channel]) -> Option<Channel> {
        let mut clicked = None;
        ui.horizontal_wrapped(|ui| {
            for channel in channels {
                let response = ui
                    .add_sized([180.0, 56.0], egui::Button::new(channel.name()))
                    .on_hover_text(channel.sub_category().display());
                if response.clicked() {
                    clicked = Some(channel.clone());
                }
            }
        });
        clicked
    }

    fn show_settings_tab(&mut self, ui: &mut egui::Ui) {
        ui.heading("Backend");
        egui::Grid::new("backend_settings").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
            ui.label("URL:");
            ui.text_edit_singleline(&mut self.backend_url_input);
            ui.end_row();

            ui.label("API key:");
            ui.add(egui::TextEdit::singleline(&mut self.backend_key_input).password(true));
            ui.end_row();
        });
        if !self.config.has_backend() {
            ui.label(format!(
                "Without a backend, channels are read from {}",
                AppConfig::local_catalog_path().display()
            ));
        }

        ui.add_space(12.0);
        ui.heading("Playback");
        egui::Grid::new("playback_settings").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
            ui.label("External player:");
            ui.text_edit_singleline(&mut self.external_player_input)
                .on_hover_text("Used when the internal engine is unavailable, e.g. mpv or ffplay");
            ui.end_row();

            ui.label("Low latency:");
            ui.checkbox(&mut self.config.engine.low_latency, "");
            ui.end_row();

            ui.label("Max buffer (s):");
            ui.add(egui::Slider::new(&mut self.config.engine.max_buffer_seconds, 2..=60));
            ui.end_row();
        });

        ui.add_space(12.0);
        ui.heading("Appearance");
        ui.horizontal(|ui| {
            ui.checkbox(&mut self.config.dark_mode, "Dark mode");
            ui.add(egui::Slider::new(&mut self.config.font_size, 10..=24).text("Font size"));
        });

        ui.add_space(16.0);
        if ui.button("💾 Save").clicked() {
            self.apply_settings();
            // New sessions pick up the new backend and player settings
            self.player.close();
            self.player = Self::build_player(ui.ctx(), &self.config, &self.page, &self.video_feed);
            self.load_catalog();
        }
    }

    fn show_player(&mut self, ctx: &egui::Context, fullscreen: bool) {
        let Some(session) = self.player.session() else {
            return;
        };

        // Check for new frames
        let frame = self.video_feed.borrow().as_ref().and_then(VideoFeed::take_frame);
        if let Some(frame) = frame {
            let image = egui::ColorImage::from_rgb(
                [frame.width as usize, frame.height as usize],
                &frame.data,
            );
            self.texture = Some(ctx.load_texture("video_frame", image, egui::TextureOptions::LINEAR));
        }

        let mut action = None;
        let mut open = true;
        let mut window = egui::Window::new(session.channel().name())
            .id(egui::Id::new("player_window"))
            .collapsible(false)
            .resizable(true)
            .default_size([860.0, 540.0]);
        window = if fullscreen {
            window.title_bar(false).fixed_rect(self.content_rect)
        } else {
            window.open(&mut open)
        };

        window.show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(session.subcategory_display()).weak());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("✖ Close").clicked() {
                        action = Some(PlayerAction::Close);
                    }
                    if ui.button(session.fullscreen_label()).clicked() {
                        action = Some(PlayerAction::ToggleFullscreen);
                    }
                    let mute_icon = if session.is_muted() { "🔇" } else { "🔊" };
                    if ui.button(format!("{} {}", mute_icon, session.mute_label())).clicked() {
                        action = Some(PlayerAction::ToggleMute);
                    }

                    let report = ui.add_enabled_ui(session.report_enabled(), |ui| {
                        ui.horizontal(|ui| {
                            let label = match session.report_icon() {
                                ReportIcon::Spinner => {
                                    ui.spinner();
                                    session.report_label().to_string()
                                }
                                ReportIcon::Check => format!("✔ {}", session.report_label()),
                                ReportIcon::Attention => format!("⚠ {}", session.report_label()),
                            };
                            ui.button(label).clicked()
                        })
                        .inner
                    });
                    if report.inner {
                        action = Some(PlayerAction::Report);
                    }
                });
            });
            ui.separator();

            ui.vertical_centered(|ui| {
                // Render video or status
                if let Some(ref texture) = self.texture {
                    let available = ui.available_size();
                    let tex_size = texture.size_vec2();
                    let aspect = tex_size.x / tex_size.y;

                    let (width, height) = if available.x / available.y > aspect {
                        (available.y * aspect * 0.95, available.y * 0.95)
                    } else {
                        (available.x * 0.95, available.x / aspect * 0.95)
                    };
                    ui.image((texture.id(), egui::vec2(width, height)));
                } else {
                    ui.add_space(50.0);
                    if session.playback_path() == PlaybackPath::Native && !session.is_buffering() {
                        ui.label("Playing in external player");
                    } else if session.playback_path() == PlaybackPath::Unavailable {
                        ui.label("This stream cannot be played here");
                    }
                }

                if session.is_buffering() {
                    ui.add_space(10.0);
                    ui.spinner();
                }
            });
        });

        if !open {
            action = Some(PlayerAction::Close);
        }

        let Some(action) = action else {
            return;
        };
        match action {
            PlayerAction::Close => {
                self.player.close();
            }
            PlayerAction::Report => {
                if let Some(session) = self.player.session_mut() {
                    session.report();
                }
            }
            PlayerAction::ToggleMute => {
                if let Some(session) = self.player.session_mut() {
                    session.toggle_mute();
                }
            }
            PlayerAction::ToggleFullscreen => {
                if let Some(session) = self.player.session_mut() {
                    if session.toggle_fullscreen().is_none() {
                        self.status_message = "Fullscreen is not available".to_string();
                    }
                }
            }
        }
    }

    fn show_report_alert(&mut self, ctx: &egui::Context) {
        let Some(message) = self.report_alert.clone() else {
            return;
        };

        egui::Window::new("⚠ Report")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(&message);
                ui.add_space(8.0);
                ui.vertical_centered(|ui| {
                    if ui.button("OK").clicked() || ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        self.report_alert = None;
                    }
                });
            });
    }
}
