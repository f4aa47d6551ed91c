//! Registry of browser tabs bound to chat platforms
//!
//! Rebuilt from scratch every process start; tabs announce themselves when
//! their content script loads and are dropped when the tab closes.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::platform::Platform;

/// Browser tab identifier
pub type TabId = u64;

/// Liveness of a tab connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    /// Idle and able to take a prompt
    Connected,
    /// Currently working on a prompt
    Busy,
    /// Known but not reachable
    Disconnected,
}

/// A live binding between a tab and a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabConnection {
    pub tab_id: TabId,
    pub platform: Platform,
    pub url: String,
    pub status: TabStatus,
    pub last_seen: DateTime<Utc>,
}

impl TabConnection {
    pub fn is_reachable(&self) -> bool {
        self.status != TabStatus::Disconnected
    }
}

/// Tracks which tab shows which platform
#[derive(Debug, Default)]
pub struct TabRegistry {
    /// Connections in registration order
    connections: RwLock<Vec<TabConnection>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a tab as connected, overwriting any previous record in place
    pub fn register(&self, tab_id: TabId, platform: Platform, url: impl Into<String>) {
        let connection = TabConnection {
            tab_id,
            platform,
            url: url.into(),
            status: TabStatus::Connected,
            last_seen: Utc::now(),
        };

        let mut connections = self.connections.write();
        match connections.iter_mut().find(|c| c.tab_id == tab_id) {
            Some(existing) => *existing = connection,
            None => connections.push(connection),
        }

        tracing::debug!(tab_id, %platform, "Tab registered");
    }

    /// Forget a tab (it was closed)
    pub fn unregister(&self, tab_id: TabId) -> Option<TabConnection> {
        let mut connections = self.connections.write();
        let index = connections.iter().position(|c| c.tab_id == tab_id)?;
        tracing::debug!(tab_id, "Tab unregistered");
        Some(connections.remove(index))
    }

    /// Update a tab's status and refresh its last-seen time
    ///
    /// Returns false if the tab is unknown.
    pub fn update_status(&self, tab_id: TabId, status: TabStatus) -> bool {
        let mut connections = self.connections.write();
        match connections.iter_mut().find(|c| c.tab_id == tab_id) {
            Some(conn) => {
                conn.status = status;
                conn.last_seen = Utc::now();
                true
            }
            None => false,
        }
    }

    /// The tab that handles a platform: first reachable one in registration order
    pub fn get_by_platform(&self, platform: Platform) -> Option<TabConnection> {
        self.connections
            .read()
            .iter()
            .find(|c| c.platform == platform && c.is_reachable())
            .cloned()
    }

    pub fn get(&self, tab_id: TabId) -> Option<TabConnection> {
        self.connections.read().iter().find(|c| c.tab_id == tab_id).cloned()
    }

    pub fn platform_for_tab(&self, tab_id: TabId) -> Option<Platform> {
        self.get(tab_id).map(|c| c.platform)
    }

    /// All tabs that are not disconnected
    pub fn list_connected(&self) -> Vec<TabConnection> {
        self.connections
            .read()
            .iter()
            .filter(|c| c.is_reachable())
            .cloned()
            .collect()
    }
}
