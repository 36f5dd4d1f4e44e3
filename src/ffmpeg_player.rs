// Adaptive engine backed by ffmpeg-next
// Requires FFmpeg libraries: libavcodec, libavformat, libavutil, libswscale
//
// To install FFmpeg development libraries:
// - Ubuntu/Debian: sudo apt install libavcodec-dev libavformat-dev libavutil-dev libswscale-dev libavdevice-dev
// - Fedora: sudo dnf install ffmpeg-devel
// - macOS: brew install ffmpeg
// - Windows: Download from https://ffmpeg.org and set FFMPEG_DIR environment variable

#[cfg(feature = "internal-player")]
mod engine_impl {
    use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
    use std::thread;
    use std::time::{Duration, Instant};
    use tracing::{debug, info, warn};

    extern crate ffmpeg_next as ffmpeg;
    use ffmpeg::format::Pixel;
    use ffmpeg::media::Type;
    use ffmpeg::software::scaling::{context::Context as ScalingContext, flag::Flags};
    use ffmpeg::util::frame::video::Video as VideoFrame;

    use crate::playback::{
        AdaptiveEngine, DecodedFrame, EngineBackend, EngineConfig, EngineEvent, MediaElement,
        MediaEvent, MediaSink, StartQuality,
    };

    /// Commands to send to the decode thread
    enum EngineCommand {
        Stop,
    }

    pub struct FfmpegBackend {
        user_agent: String,
    }

    impl FfmpegBackend {
        pub fn new(user_agent: &str) -> Self {
            // Initialize FFmpeg
            ffmpeg::init().ok();
            Self {
                user_agent: user_agent.to_string(),
            }
        }
    }

    impl EngineBackend for FfmpegBackend {
        fn is_supported(&self) -> bool {
            true
        }

        fn create(&self, config: &EngineConfig) -> Box<dyn AdaptiveEngine> {
            Box::new(FfmpegEngine {
                config: config.clone(),
                user_agent: self.user_agent.clone(),
                source: None,
                sink: None,
                command_sender: None,
                event_receiver: None,
                destroyed: false,
            })
        }
    }

    /// One decode thread feeding one media element
    pub struct FfmpegEngine {
        config: EngineConfig,
        user_agent: String,
        source: Option<String>,
        sink: Option<MediaSink>,
        command_sender: Option<Sender<EngineCommand>>,
        event_receiver: Option<Receiver<EngineEvent>>,
        destroyed: bool,
    }

    impl FfmpegEngine {
        fn start_if_ready(&mut self) {
            if self.destroyed || self.command_sender.is_some() {
                return;
            }
            let (Some(url), Some(sink)) = (self.source.clone(), self.sink.clone()) else {
                return;
            };

            let (cmd_tx, cmd_rx) = channel();
            let (evt_tx, evt_rx) = channel();
            self.command_sender = Some(cmd_tx);
            self.event_receiver = Some(evt_rx);

            let config = self.config.clone();
            let user_agent = self.user_agent.clone();
            thread::spawn(move || {
                decode_thread(url, user_agent, config, sink, cmd_rx, evt_tx);
            });
        }
    }

    impl AdaptiveEngine for FfmpegEngine {
        fn load_source(&mut self, url: &str) {
            self.source = Some(url.to_string());
            self.start_if_ready();
        }

        fn attach_media(&mut self, media: &mut dyn MediaElement) {
            self.sink = Some(media.media_sink());
            self.start_if_ready();
        }

        fn next_event(&mut self) -> Option<EngineEvent> {
            let receiver = self.event_receiver.as_ref()?;
            match receiver.try_recv() {
                Ok(event) => Some(event),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.event_receiver = None;
                    None
                }
            }
        }

        fn destroy(&mut self) {
            if let Some(ref sender) = self.command_sender {
                let _ = sender.send(EngineCommand::Stop);
            }
            self.command_sender = None;
            self.event_receiver = None;
            self.sink = None;
            self.destroyed = true;
        }
    }

    impl Drop for FfmpegEngine {
        fn drop(&mut self) {
            self.destroy();
        }
    }

    fn input_options(config: &EngineConfig, user_agent: &str) -> ffmpeg::Dictionary<'static> {
        // Set options for network streams
        let mut options = ffmpeg::Dictionary::new();
        options.set("user_agent", user_agent);
        options.set("reconnect", "1");
        options.set("reconnect_streamed", "1");
        options.set("reconnect_delay_max", "5");
        options.set("timeout", "5000000"); // 5 second timeout
        options.set("live_start_index", &format!("-{}", config.live_sync_segments));
        options.set(
            "max_delay",
            &(u64::from(config.max_buffer_seconds) * 1_000_000).to_string(),
        );
        if config.low_latency {
            options.set("fflags", "nobuffer");
            options.set("flags", "low_delay");
        }
        options
    }

    fn decode_thread(
        url: String,
        user_agent: String,
        config: EngineConfig,
        sink: MediaSink,
        cmd_rx: Receiver<EngineCommand>,
        evt_tx: Sender<EngineEvent>,
    ) {
        debug!(
            "Opening {} (bandwidth estimate {} bps)",
            url, config.initial_bandwidth_estimate
        );

        // Open input; for HLS this reads the top-level playlist
        let mut ictx = match ffmpeg::format::input_with_dictionary(&url, input_options(&config, &user_agent)) {
            Ok(ctx) => ctx,
            Err(e) => {
                let _ = evt_tx.send(EngineEvent::Error(format!("Failed to open stream: {}", e)));
                return;
            }
        };

        // Variants show up as separate video streams
        let video_stream_index = match config.start_quality {
            StartQuality::Lowest => ictx
                .streams()
                .find(|s| s.parameters().medium() == Type::Video)
                .map(|s| s.index()),
            StartQuality::Auto => ictx.streams().best(Type::Video).map(|s| s.index()),
        };
        let Some(video_stream_index) = video_stream_index else {
            let _ = evt_tx.send(EngineEvent::Error("No video stream found".to_string()));
            return;
        };

        let decoder = ictx
            .stream(video_stream_index)
            .ok_or_else(|| "video stream vanished".to_string())
            .and_then(|stream| {
                ffmpeg::codec::context::Context::from_parameters(stream.parameters())
                    .map_err(|e| e.to_string())
            })
            .and_then(|ctx| ctx.decoder().video().map_err(|e| e.to_string()));
        let mut decoder = match decoder {
            Ok(d) => d,
            Err(e) => {
                let _ = evt_tx.send(EngineEvent::Error(format!("Failed to create decoder: {}", e)));
                return;
            }
        };

        if evt_tx.send(EngineEvent::ManifestParsed).is_err() {
            return;
        }

        // Get video dimensions
        let width = decoder.width();
        let height = decoder.height();

        // Scale to reasonable size if too large
        let (target_width, target_height) = if width > 1280 || height > 720 {
            let scale = f64::min(1280.0 / width as f64, 720.0 / height as f64);
            ((width as f64 * scale) as u32, (height as f64 * scale) as u32)
        } else {
            (width, height)
        };

        // Create scaler to convert to RGB24
        let mut scaler = match ScalingContext::get(
            decoder.format(),
            width,
            height,
            Pixel::RGB24,
            target_width,
            target_height,
            Flags::BILINEAR,
        ) {
            Ok(s) => s,
            Err(e) => {
                let _ = evt_tx.send(EngineEvent::Error(format!("Failed to create scaler: {}", e)));
                return;
            }
        };

        let frame_duration = Duration::from_secs_f64(1.0 / 30.0); // Target 30fps display
        let mut last_frame_time = Instant::now();
        let mut flowing = false;
        let mut stopped = false;

        // Packet processing loop
        for (stream, packet) in ictx.packets() {
            if let Ok(EngineCommand::Stop) = cmd_rx.try_recv() {
                stopped = true;
                break;
            }

            // Only process video packets
            if stream.index() != video_stream_index {
                continue;
            }

            // Decode packet
            if decoder.send_packet(&packet).is_err() {
                continue;
            }

            let mut decoded = VideoFrame::empty();
            while decoder.receive_frame(&mut decoded).is_ok() {
                // Scale to RGB24
                let mut rgb_frame = VideoFrame::empty();
                if scaler.run(&decoded, &mut rgb_frame).is_err() {
                    continue;
                }

                // Copy frame data (handling stride)
                let data = rgb_frame.data(0);
                let stride = rgb_frame.stride(0);
                let mut frame_data = Vec::with_capacity((target_width * target_height * 3) as usize);
                for y in 0..target_height as usize {
                    let row_start = y * stride;
                    let row_end = row_start + (target_width as usize * 3);
                    frame_data.extend_from_slice(&data[row_start..row_end]);
                }

                sink.present(DecodedFrame {
                    width: target_width,
                    height: target_height,
                    data: frame_data,
                    pts: decoded.pts().unwrap_or(0),
                });

                if !flowing {
                    flowing = true;
                    if !sink.emit(MediaEvent::Playing) {
                        return;
                    }
                }

                // Rate limiting to avoid overwhelming the UI
                let elapsed = last_frame_time.elapsed();
                if elapsed < frame_duration {
                    thread::sleep(frame_duration - elapsed);
                }
                last_frame_time = Instant::now();
            }
        }

        if stopped {
            debug!("Decode thread stopped for {}", url);
        } else {
            info!("Stream ended: {}", url);
            sink.emit(MediaEvent::Waiting);
            if evt_tx.send(EngineEvent::Error("stream ended".to_string())).is_err() {
                warn!("Engine gone before end of stream was reported");
            }
        }
    }
}

// Stub implementation when internal-player feature is disabled
#[cfg(not(feature = "internal-player"))]
mod engine_impl {
    use crate::playback::{AdaptiveEngine, EngineBackend, EngineConfig, EngineEvent, MediaElement};

    pub struct FfmpegBackend;

    impl FfmpegBackend {
        pub fn new(_user_agent: &str) -> Self {
            Self
        }
    }

    impl EngineBackend for FfmpegBackend {
        fn is_supported(&self) -> bool {
            false
        }

        fn create(&self, _config: &EngineConfig) -> Box<dyn AdaptiveEngine> {
            Box::new(DisabledEngine { reported: false })
        }
    }

    pub struct DisabledEngine {
        reported: bool,
    }

    impl AdaptiveEngine for DisabledEngine {
        fn load_source(&mut self, _url: &str) {}
        fn attach_media(&mut self, _media: &mut dyn MediaElement) {}

        fn next_event(&mut self) -> Option<EngineEvent> {
            if self.reported {
                return None;
            }
            self.reported = true;
            Some(EngineEvent::Error(
                "Internal player not enabled. Build with --features internal-player".to_string(),
            ))
        }

        fn destroy(&mut self) {}
    }
}

// Re-export
pub use engine_impl::*;
