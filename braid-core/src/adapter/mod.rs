//! Messaging between the engine and platform tabs
//!
//! The engine sends [`TabCommand`]s through a [`TabMessenger`]; the tab side
//! answers each with a [`TabReply`]. A [`TabBridge`] is the tab-side
//! handler: it drives a [`ChatAdapter`] for prompt injection and a
//! [`ResponseDetector`] for reading the latest answer.

pub mod reader;

pub use reader::{ReaderEvent, ResponseDetector, Snapshot, SnapshotSource};

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::Platform;
use crate::tabs::{TabId, TabRegistry, TabStatus};
use crate::Result;

/// Command addressed to one tab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabCommand {
    /// Place a prompt in the composer, optionally submitting it
    InjectPrompt { prompt: String, auto_send: bool },
    /// Return the latest response text
    ReadResponse,
    /// Report platform and streaming state
    GetStatus,
}

/// Tab answer to a [`TabCommand`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TabReply {
    Injected { success: bool, sent: bool },
    Response { content: String, streaming: bool },
    Status { platform: Platform, streaming: bool, ready: bool },
}

/// One completed platform answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformResponse {
    pub id: String,
    pub platform: Platform,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl PlatformResponse {
    pub fn new(platform: Platform, content: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            platform,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Channel that carries commands to tabs
///
/// `Err` means the command was not delivered.
#[async_trait]
pub trait TabMessenger: Send + Sync {
    async fn send(&self, tab_id: TabId, command: TabCommand) -> Result<TabReply>;
}

/// Page-level control of a chat platform's composer
pub trait ChatAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    /// Place text in the composer; false when the composer is missing
    fn inject(&mut self, text: &str) -> bool;

    /// Press the submit control; false when it is missing or disabled
    fn trigger_send(&mut self) -> bool;
}

/// Delivers prompts to whichever tab currently serves a platform
#[derive(Clone)]
pub struct PromptRouter {
    tabs: Arc<TabRegistry>,
    messenger: Arc<dyn TabMessenger>,
}

impl PromptRouter {
    pub fn new(tabs: Arc<TabRegistry>, messenger: Arc<dyn TabMessenger>) -> Self {
        Self { tabs, messenger }
    }

    pub fn tabs(&self) -> &Arc<TabRegistry> {
        &self.tabs
    }

    /// Best-effort delivery of `prompt` to `platform`
    ///
    /// Returns whether a tab accepted it. A tab that accepted is marked busy.
    pub async fn route(&self, platform: Platform, prompt: &str, auto_send: bool) -> bool {
        let Some(tab) = self.tabs.get_by_platform(platform) else {
            tracing::warn!(%platform, "No connected tab for platform, prompt not sent");
            return false;
        };

        let command = TabCommand::InjectPrompt {
            prompt: prompt.to_string(),
            auto_send,
        };

        match self.messenger.send(tab.tab_id, command).await {
            Ok(TabReply::Injected { success: true, sent }) => {
                self.tabs.update_status(tab.tab_id, TabStatus::Busy);
                tracing::debug!(tab_id = tab.tab_id, %platform, submitted = sent, "Prompt delivered");
                true
            }
            Ok(reply) => {
                tracing::warn!(tab_id = tab.tab_id, %platform, ?reply, "Tab did not accept prompt");
                false
            }
            Err(e) => {
                tracing::warn!(tab_id = tab.tab_id, %platform, error = %e, "Prompt delivery failed");
                false
            }
        }
    }
}

/// Tab-side handler for background commands
pub struct TabBridge<A> {
    adapter: A,
    detector: ResponseDetector,
    last_response: Option<String>,
}

impl<A: ChatAdapter> TabBridge<A> {
    pub fn new(adapter: A, detector: ResponseDetector) -> Self {
        Self {
            adapter,
            detector,
            last_response: None,
        }
    }

    /// Feed a page sample to the detector, returning any event it produces
    ///
    /// Completed responses are remembered for `ReadResponse`.
    pub fn observe(&mut self, snapshot: Snapshot) -> Option<ReaderEvent> {
        let event = self.detector.observe(snapshot);
        if let Some(ReaderEvent::Completed(text)) = &event {
            self.last_response = Some(text.clone());
        }
        event
    }

    pub fn handle(&mut self, command: TabCommand) -> TabReply {
        match command {
            TabCommand::InjectPrompt { prompt, auto_send } => {
                let success = self.adapter.inject(&prompt);
                let sent = success && auto_send && self.adapter.trigger_send();
                TabReply::Injected { success, sent }
            }
            TabCommand::ReadResponse => TabReply::Response {
                content: self
                    .last_response
                    .clone()
                    .or_else(|| self.detector.latest_content().map(str::to_string))
                    .unwrap_or_default(),
                streaming: self.detector.is_streaming(),
            },
            TabCommand::GetStatus => TabReply::Status {
                platform: self.adapter.platform(),
                streaming: self.detector.is_streaming(),
                ready: true,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct FakeComposer {
        text: Option<String>,
        submitted: bool,
        has_send_button: bool,
    }

    impl ChatAdapter for FakeComposer {
        fn platform(&self) -> Platform {
            Platform::Claude
        }

        fn inject(&mut self, text: &str) -> bool {
            self.text = Some(text.to_string());
            true
        }

        fn trigger_send(&mut self) -> bool {
            self.submitted = self.has_send_button;
            self.has_send_button
        }
    }

    struct ScriptedMessenger {
        reply: Mutex<Option<Result<TabReply>>>,
    }

    #[async_trait]
    impl TabMessenger for ScriptedMessenger {
        async fn send(&self, tab_id: TabId, _command: TabCommand) -> Result<TabReply> {
            self.reply.lock().take().unwrap_or_else(|| {
                Err(Error::Delivery {
                    tab_id,
                    reason: "no reply scripted".to_string(),
                })
            })
        }
    }

    fn router(reply: Result<TabReply>) -> PromptRouter {
        let tabs = Arc::new(TabRegistry::new());
        tabs.register(5, Platform::Claude, "https://claude.ai/");
        PromptRouter::new(
            tabs,
            Arc::new(ScriptedMessenger {
                reply: Mutex::new(Some(reply)),
            }),
        )
    }

    #[test]
    fn test_tab_command_wire_format() {
        let json = serde_json::to_value(TabCommand::InjectPrompt {
            prompt: "hi".to_string(),
            auto_send: true,
        })
        .unwrap();
        assert_eq!(json["type"], "inject_prompt");
        assert_eq!(json["auto_send"], true);

        let reply: TabReply = serde_json::from_str(r#"{"type":"injected","success":true,"sent":false}"#).unwrap();
        assert_eq!(reply, TabReply::Injected { success: true, sent: false });
    }

    #[test]
    fn test_bridge_injects_and_submits_only_in_auto_mode() {
        let mut bridge = TabBridge::new(
            FakeComposer {
                has_send_button: true,
                ..Default::default()
            },
            ResponseDetector::new(3),
        );

        let manual = bridge.handle(TabCommand::InjectPrompt {
            prompt: "Draft intro".to_string(),
            auto_send: false,
        });
        assert_eq!(manual, TabReply::Injected { success: true, sent: false });
        assert!(!bridge.adapter.submitted);

        let auto = bridge.handle(TabCommand::InjectPrompt {
            prompt: "Draft intro".to_string(),
            auto_send: true,
        });
        assert_eq!(auto, TabReply::Injected { success: true, sent: true });
        assert_eq!(bridge.adapter.text.as_deref(), Some("Draft intro"));
    }

    #[test]
    fn test_bridge_reports_status_and_latest_response() {
        let mut bridge = TabBridge::new(FakeComposer::default(), ResponseDetector::new(1));

        assert_eq!(
            bridge.handle(TabCommand::GetStatus),
            TabReply::Status {
                platform: Platform::Claude,
                streaming: false,
                ready: true
            }
        );

        bridge.observe(Snapshot::new("Answer", true));
        bridge.observe(Snapshot::new("Answer", false));
        assert_eq!(
            bridge.handle(TabCommand::ReadResponse),
            TabReply::Response {
                content: "Answer".to_string(),
                streaming: false
            }
        );
    }

    #[tokio::test]
    async fn test_router_marks_tab_busy_on_delivery() {
        let router = router(Ok(TabReply::Injected { success: true, sent: true }));
        assert!(router.route(Platform::Claude, "prompt", true).await);
        assert_eq!(router.tabs().get(5).unwrap().status, TabStatus::Busy);
    }

    #[tokio::test]
    async fn test_router_failures_are_not_sent() {
        let failed = router(Err(Error::Delivery {
            tab_id: 5,
            reason: "closed".to_string(),
        }));
        assert!(!failed.route(Platform::Claude, "prompt", false).await);
        assert_eq!(failed.tabs().get(5).unwrap().status, TabStatus::Connected);

        let refused = router(Ok(TabReply::Injected { success: false, sent: false }));
        assert!(!refused.route(Platform::Claude, "prompt", false).await);

        let no_tab = router(Ok(TabReply::Injected { success: true, sent: false }));
        assert!(!no_tab.route(Platform::Gemini, "prompt", false).await);
    }
}
