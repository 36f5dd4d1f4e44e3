//! Buffering indicator derived from media element events

use super::media::{ListenerId, MediaElement, MediaEvent, MediaEventKind};

const WATCHED: [MediaEventKind; 3] = [
    MediaEventKind::Waiting,
    MediaEventKind::Stalled,
    MediaEventKind::Playing,
];

pub struct BufferingMonitor {
    buffering: bool,
    listeners: Vec<ListenerId>,
}

impl BufferingMonitor {
    /// Starts in the buffering state: nothing is flowing yet
    pub fn attach(media: &mut dyn MediaElement) -> Self {
        Self {
            buffering: true,
            listeners: WATCHED.iter().map(|kind| media.add_listener(*kind)).collect(),
        }
    }

    pub fn is_buffering(&self) -> bool {
        self.buffering
    }

    pub fn is_attached(&self) -> bool {
        !self.listeners.is_empty()
    }

    pub fn observe(&mut self, event: &MediaEvent) {
        if !self.is_attached() {
            return;
        }
        match event {
            MediaEvent::Waiting | MediaEvent::Stalled => self.buffering = true,
            MediaEvent::Playing => self.buffering = false,
            _ => {}
        }
    }

    /// Playback will not start on its own (e.g. autoplay refused)
    pub fn clear(&mut self) {
        if self.is_attached() {
            self.buffering = false;
        }
    }

    pub fn detach(&mut self, media: &mut dyn MediaElement) {
        for id in self.listeners.drain(..) {
            media.remove_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::testing::FakeMedia;

    #[test]
    fn test_playing_and_waiting_flip_state() {
        let mut media = FakeMedia::new();
        let mut monitor = BufferingMonitor::attach(&mut media);
        assert!(monitor.is_buffering());
        assert_eq!(media.listener_count(), 3);

        monitor.observe(&MediaEvent::Playing);
        assert!(!monitor.is_buffering());
        monitor.observe(&MediaEvent::LoadedMetadata);
        assert!(!monitor.is_buffering());
        monitor.observe(&MediaEvent::Stalled);
        assert!(monitor.is_buffering());
        monitor.observe(&MediaEvent::Playing);
        monitor.observe(&MediaEvent::Waiting);
        assert!(monitor.is_buffering());
    }

    #[test]
    fn test_detached_monitor_ignores_events() {
        let mut media = FakeMedia::new();
        let mut monitor = BufferingMonitor::attach(&mut media);
        monitor.detach(&mut media);
        assert_eq!(media.listener_count(), 0);

        monitor.observe(&MediaEvent::Playing);
        monitor.clear();
        assert!(monitor.is_buffering());
    }
}
