//! Response completion detection
//!
//! Platforms stream their answers into the page. Sampling the page on an
//! interval gives a sequence of [`Snapshot`]s; a response is streaming while
//! the platform shows its streaming indicator or the text changed within the
//! last `stable_polls` samples, and complete once neither holds.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::config::ReaderConfig;

/// One sample of the latest response area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub content: String,
    /// Platform's own "still generating" indicator is visible
    pub indicator: bool,
}

impl Snapshot {
    pub fn new(content: impl Into<String>, indicator: bool) -> Self {
        Self {
            content: content.into(),
            indicator,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    Started,
    Completed(String),
}

/// Turns snapshots into start/complete events
#[derive(Debug, Clone)]
pub struct ResponseDetector {
    stable_polls: u32,
    last_content: String,
    /// Samples since the content last changed; `None` before any change
    polls_since_change: Option<u32>,
    streaming: bool,
    last_completed: Option<String>,
}

impl ResponseDetector {
    pub fn new(stable_polls: u32) -> Self {
        Self {
            stable_polls: stable_polls.max(1),
            last_content: String::new(),
            polls_since_change: None,
            streaming: false,
            last_completed: None,
        }
    }

    pub fn from_config(config: &ReaderConfig) -> Self {
        Self::new(config.stable_polls)
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn latest_content(&self) -> Option<&str> {
        (!self.last_content.is_empty()).then_some(self.last_content.as_str())
    }

    pub fn observe(&mut self, snapshot: Snapshot) -> Option<ReaderEvent> {
        if snapshot.content != self.last_content {
            self.last_content = snapshot.content;
            self.polls_since_change = Some(0);
        } else if let Some(polls) = self.polls_since_change.as_mut() {
            *polls = polls.saturating_add(1);
        }

        let recently_changed = matches!(self.polls_since_change, Some(n) if n < self.stable_polls);
        let streaming_now = snapshot.indicator || recently_changed;

        match (self.streaming, streaming_now) {
            (false, true) => {
                self.streaming = true;
                tracing::debug!("Response started");
                Some(ReaderEvent::Started)
            }
            (true, false) => {
                self.streaming = false;
                let content = self.last_content.clone();
                if content.is_empty() || self.last_completed.as_ref() == Some(&content) {
                    return None;
                }
                self.last_completed = Some(content.clone());
                tracing::debug!(chars = content.len(), "Response complete");
                Some(ReaderEvent::Completed(content))
            }
            _ => None,
        }
    }
}

/// Something that can be sampled for the latest response
pub trait SnapshotSource: Send + 'static {
    /// Current state of the page; `None` once the page is gone
    fn sample(&mut self) -> Option<Snapshot>;
}

/// Poll `source` every `poll_interval`, yielding detector events
///
/// Polling stops when the source is exhausted or the receiver is dropped.
pub fn watch<S: SnapshotSource>(
    mut source: S,
    mut detector: ResponseDetector,
    poll_interval: Duration,
) -> mpsc::Receiver<ReaderEvent> {
    let (tx, rx) = mpsc::channel(16);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(snapshot) = source.sample() else {
                break;
            };
            if let Some(event) = detector.observe(snapshot) {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn feed(detector: &mut ResponseDetector, samples: &[(&str, bool)]) -> Vec<ReaderEvent> {
        samples
            .iter()
            .filter_map(|(text, indicator)| detector.observe(Snapshot::new(*text, *indicator)))
            .collect()
    }

    #[test]
    fn test_completes_after_stable_polls() {
        let mut detector = ResponseDetector::new(3);
        let events = feed(
            &mut detector,
            &[("", false), ("Hel", false), ("Hello", false), ("Hello", false), ("Hello", false)],
        );
        assert_eq!(events, vec![ReaderEvent::Started]);
        assert!(detector.is_streaming());

        let events = feed(&mut detector, &[("Hello", false)]);
        assert_eq!(events, vec![ReaderEvent::Completed("Hello".to_string())]);
        assert!(!detector.is_streaming());
    }

    #[test]
    fn test_indicator_keeps_response_streaming() {
        let mut detector = ResponseDetector::new(1);
        let events = feed(
            &mut detector,
            &[("Thinking", true), ("Thinking", true), ("Thinking", true)],
        );
        assert_eq!(events, vec![ReaderEvent::Started]);

        let events = feed(&mut detector, &[("Thinking", false)]);
        assert_eq!(events, vec![ReaderEvent::Completed("Thinking".to_string())]);
    }

    #[test]
    fn test_empty_and_repeated_content_is_not_reported() {
        let mut detector = ResponseDetector::new(1);
        assert_eq!(feed(&mut detector, &[("", true), ("", false)]), vec![ReaderEvent::Started]);

        feed(&mut detector, &[("Done", false), ("Done", false)]);
        // Indicator flicker over the same text does not complete it twice
        let events = feed(&mut detector, &[("Done", true), ("Done", false)]);
        assert_eq!(events, vec![ReaderEvent::Started]);
    }

    #[test]
    fn test_idle_page_produces_no_events() {
        let mut detector = ResponseDetector::new(3);
        assert!(feed(&mut detector, &[("", false), ("", false), ("", false)]).is_empty());
        assert!(detector.latest_content().is_none());
    }

    struct Script(VecDeque<Snapshot>);

    impl SnapshotSource for Script {
        fn sample(&mut self) -> Option<Snapshot> {
            self.0.pop_front()
        }
    }

    #[tokio::test]
    async fn test_watch_streams_events_until_source_ends() {
        let script = Script(
            [("A", false), ("AB", false), ("AB", false), ("AB", false)]
                .into_iter()
                .map(|(t, i)| Snapshot::new(t, i))
                .collect(),
        );

        let mut events = watch(script, ResponseDetector::new(2), Duration::from_millis(1));

        assert_eq!(events.recv().await, Some(ReaderEvent::Started));
        assert_eq!(events.recv().await, Some(ReaderEvent::Completed("AB".to_string())));
        assert_eq!(events.recv().await, None);
    }
}
