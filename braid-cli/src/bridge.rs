//! JSON-lines bridge between the engine and a browser host
//!
//! Every line on stdin is an [`Inbound`] envelope and every line on stdout an
//! [`Outbound`] one. Tab commands are written out as `tab_command` envelopes
//! and answered by `tab_reply` envelopes carrying the same `request_id`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use braid_core::{
    ApiRequest, ApiResponse, Config, ContentMessage, Dispatcher, Error, GitBackend, Store, TabCommand, TabId,
    TabMessenger, TabRegistry, TabReply, VersionControl, WorkflowEngine,
};
use braid_db::Database;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot};

/// A line read from the host
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    Content {
        tab_id: TabId,
        message: ContentMessage,
    },
    Api {
        #[serde(default)]
        id: Value,
        request: ApiRequest,
    },
    TabReply {
        request_id: u64,
        reply: TabReply,
    },
}

/// A line written to the host
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outbound {
    ApiResult {
        id: Value,
        ok: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<ApiResponse>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    TabCommand {
        request_id: u64,
        tab_id: TabId,
        command: TabCommand,
    },
}

impl Outbound {
    fn api_result(id: Value, result: braid_core::Result<ApiResponse>) -> Self {
        match result {
            Ok(data) => Outbound::ApiResult {
                id,
                ok: true,
                data: Some(data),
                error: None,
            },
            Err(e) => Outbound::ApiResult {
                id,
                ok: false,
                data: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// [`TabMessenger`] that writes commands to stdout and waits for the host's reply
pub struct StdioMessenger {
    outbound: mpsc::UnboundedSender<Outbound>,
    pending: Mutex<HashMap<u64, oneshot::Sender<TabReply>>>,
    next_request_id: AtomicU64,
    timeout: Duration,
}

impl StdioMessenger {
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>, timeout: Duration) -> Self {
        Self {
            outbound,
            pending: Mutex::new(HashMap::new()),
            next_request_id: AtomicU64::new(0),
            timeout,
        }
    }

    /// Hand a reply to the command waiting on it
    ///
    /// Returns false when nothing is waiting, e.g. after a timeout.
    pub fn resolve(&self, request_id: u64, reply: TabReply) -> bool {
        match self.pending.lock().remove(&request_id) {
            Some(tx) => tx.send(reply).is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl TabMessenger for StdioMessenger {
    async fn send(&self, tab_id: TabId, command: TabCommand) -> braid_core::Result<TabReply> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(request_id, tx);

        let envelope = Outbound::TabCommand {
            request_id,
            tab_id,
            command,
        };
        if self.outbound.send(envelope).is_err() {
            self.pending.lock().remove(&request_id);
            return Err(Error::Delivery {
                tab_id,
                reason: "bridge output closed".to_string(),
            });
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(Error::Delivery {
                tab_id,
                reason: "reply dropped".to_string(),
            }),
            Err(_) => {
                self.pending.lock().remove(&request_id);
                Err(Error::Delivery {
                    tab_id,
                    reason: format!("no reply within {:?}", self.timeout),
                })
            }
        }
    }
}

/// Serve the engine over stdin/stdout until stdin closes
pub async fn serve(config: &Config) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(Database::new(config.database_path()).await?);
    let vcs: Arc<dyn VersionControl> = Arc::new(GitBackend::new(config.repos_dir(), &config.git));

    tracing::info!(data_dir = %config.storage.data_dir.display(), "Bridge listening on stdio");
    run(tokio::io::stdin(), tokio::io::stdout(), store, vcs, config).await?;
    tracing::info!("Bridge input closed, shutting down");

    Ok(())
}

/// Run the bridge over arbitrary streams, returning the output once input ends
pub async fn run<R, W>(
    input: R,
    output: W,
    store: Arc<dyn Store>,
    vcs: Arc<dyn VersionControl>,
    config: &Config,
) -> anyhow::Result<W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(output, out_rx));

    let messenger = Arc::new(StdioMessenger::new(out_tx.clone(), config.bridge.delivery_timeout));
    let engine = WorkflowEngine::new(
        store,
        vcs,
        Arc::new(TabRegistry::new()),
        messenger.clone(),
        config.git.target_branch.clone(),
    );
    let dispatcher = Dispatcher::new(Arc::new(engine), config.workflow.send_mode);

    // Unbounded so the reader always gets through to `tab_reply` lines
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_loop(input, messenger, in_tx));

    dispatch_loop(&dispatcher, in_rx, &out_tx).await;
    reader.await??;

    // The engine holds the last messenger, and with it a sender
    drop(dispatcher);
    drop(out_tx);
    Ok(writer.await??)
}

async fn read_loop<R: AsyncRead + Unpin>(
    input: R,
    messenger: Arc<StdioMessenger>,
    inbound: mpsc::UnboundedSender<Inbound>,
) -> std::io::Result<()> {
    let mut lines = BufReader::new(input).lines();

    while let Some(line) = lines.next_line().await? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<Inbound>(trimmed) {
            // Replies bypass the dispatch queue, which may be blocked waiting on them
            Ok(Inbound::TabReply { request_id, reply }) => {
                if !messenger.resolve(request_id, reply) {
                    tracing::warn!(request_id, "Reply for unknown or expired tab command");
                }
            }
            Ok(message) => {
                if inbound.send(message).is_err() {
                    break;
                }
            }
            Err(e) => tracing::warn!(error = %e, line = trimmed, "Ignoring malformed bridge message"),
        }
    }

    Ok(())
}

async fn dispatch_loop(
    dispatcher: &Dispatcher,
    mut inbound: mpsc::UnboundedReceiver<Inbound>,
    outbound: &mpsc::UnboundedSender<Outbound>,
) {
    while let Some(message) = inbound.recv().await {
        match message {
            Inbound::Content { tab_id, message } => match dispatcher.handle_content(tab_id, message).await {
                Ok(outcome) => tracing::debug!(tab_id, ?outcome, "Handled tab message"),
                Err(e) => tracing::warn!(tab_id, error = %e, "Tab message failed"),
            },
            Inbound::Api { id, request } => {
                let result = dispatcher.handle_api(request).await;
                if let Err(e) = &result {
                    tracing::debug!(%id, error = %e, "API request failed");
                }
                if outbound.send(Outbound::api_result(id, result)).is_err() {
                    break;
                }
            }
            Inbound::TabReply { request_id, .. } => {
                tracing::debug!(request_id, "Tab reply reached dispatch queue");
            }
        }
    }
}

async fn write_loop<W: AsyncWrite + Unpin>(
    mut output: W,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
) -> std::io::Result<W> {
    while let Some(message) = outbound.recv().await {
        let mut line = match serde_json::to_string(&message) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode bridge message");
                continue;
            }
        };
        line.push('\n');
        output.write_all(line.as_bytes()).await?;
        output.flush().await?;
    }

    Ok(output)
}
