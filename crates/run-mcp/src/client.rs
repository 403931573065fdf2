use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use run_types::RunError;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

use crate::wire::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(90);
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(90);
pub const EVALUATE_TIMEOUT: Duration = Duration::from_secs(90);

/// Default line-buffer limit a well-behaved frame should fit under.
/// Past this, the reader falls back to raw 8 KiB chunked reads and
/// discards any bytes trailing the first newline found in the chunk
/// that closes the frame — a deliberately accepted rare edge case,
/// not a bug to be engineered away.
const LINE_LIMIT: usize = 64 * 1024;
const CHUNK_SIZE: usize = 8 * 1024;

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub pid: Option<u32>,
    pub last_error: Option<String>,
}

/// JSON-RPC 2.0 stdio client for the browser automation subprocess.
/// One client owns exactly one subprocess for the duration of a run;
/// on subprocess death no reconnection is attempted.
pub struct McpClient {
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    pending: PendingMap,
    next_id: AtomicU64,
    connected: AtomicBool,
    pid: Mutex<Option<u32>>,
    last_error: Mutex<Option<String>>,
    reader_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl McpClient {
    /// Spawns the subprocess but does not yet perform the `initialize`
    /// handshake — call `initialize` once after construction.
    pub async fn spawn(command: &str, args: &[String]) -> Result<Arc<Self>, RunError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| RunError::SubprocessError {
            command: format!("{command} {}", args.join(" ")),
            code: None,
            stderr: e.to_string(),
        })?;

        let pid = child.id();
        let stdin = child.stdin.take();
        let stdout = child.stdout.take().ok_or_else(|| {
            RunError::McpProtocolError("subprocess did not expose a stdout pipe".to_string())
        })?;
        let stderr = child.stderr.take();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        let client = Arc::new(Self {
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(stdin),
            pending: pending.clone(),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
            pid: Mutex::new(pid),
            last_error: Mutex::new(None),
            reader_handle: Mutex::new(None),
        });

        let reader_client = client.clone();
        let reader_handle = tokio::spawn(async move {
            reader_client.read_responses(stdout).await;
        });
        *client.reader_handle.lock().await = Some(reader_handle);

        if let Some(mut stderr) = stderr {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                if stderr.read_to_end(&mut buf).await.is_ok() && !buf.is_empty() {
                    tracing::warn!(
                        stderr = %String::from_utf8_lossy(&buf),
                        "mcp subprocess stderr"
                    );
                }
            });
        }

        Ok(client)
    }

    async fn read_responses(&self, mut stdout: ChildStdout) {
        let mut carry = Vec::new();
        loop {
            match read_frame(&mut stdout, &mut carry).await {
                Ok(Some(bytes)) => {
                    let line = String::from_utf8_lossy(&bytes);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<JsonRpcResponse>(line) {
                        Ok(response) => {
                            let Some(id) = response.id else {
                                tracing::debug!("mcp notification ignored: {line}");
                                continue;
                            };
                            let sender = self.pending.lock().await.remove(&id);
                            if let Some(sender) = sender {
                                let _ = sender.send(response);
                            } else {
                                tracing::warn!(id, "mcp response for unknown request id");
                            }
                        }
                        Err(err) => {
                            tracing::error!(error = %err, "failed to parse mcp response line");
                        }
                    }
                }
                Ok(None) => {
                    self.mark_disconnected("mcp subprocess stdout closed").await;
                    break;
                }
                Err(err) => {
                    self.mark_disconnected(&format!("mcp stdout read error: {err}")).await;
                    break;
                }
            }
        }
    }

    async fn mark_disconnected(&self, reason: &str) {
        self.connected.store(false, Ordering::SeqCst);
        *self.last_error.lock().await = Some(reason.to_string());
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            drop(sender);
        }
    }

    pub async fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.connected.load(Ordering::SeqCst),
            pid: *self.pid.lock().await,
            last_error: self.last_error.lock().await.clone(),
        }
    }

    async fn call(&self, method: &str, params: Value, call_timeout: Duration) -> Result<Value, RunError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(RunError::McpDisconnected(
                self.last_error
                    .lock()
                    .await
                    .clone()
                    .unwrap_or_else(|| "subprocess not connected".to_string()),
            ));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = JsonRpcRequest::new(id, method, params);
        let mut line = serde_json::to_string(&request)
            .map_err(|e| RunError::McpProtocolError(e.to_string()))?;
        line.push('\n');

        {
            let mut guard = self.stdin.lock().await;
            let Some(stdin) = guard.as_mut() else {
                self.pending.lock().await.remove(&id);
                return Err(RunError::McpDisconnected("stdin already closed".to_string()));
            };
            if let Err(e) = stdin.write_all(line.as_bytes()).await {
                self.pending.lock().await.remove(&id);
                return Err(RunError::McpDisconnected(e.to_string()));
            }
            if let Err(e) = stdin.flush().await {
                self.pending.lock().await.remove(&id);
                return Err(RunError::McpDisconnected(e.to_string()));
            }
        }

        let started = Instant::now();
        match timeout(call_timeout, rx).await {
            Ok(Ok(response)) => {
                if let Some(error) = response.error {
                    return Err(RunError::McpProtocolError(format!(
                        "{} (code {})",
                        error.message, error.code
                    )));
                }
                Ok(response.result.unwrap_or(Value::Null))
            }
            Ok(Err(_recv_closed)) => {
                self.pending.lock().await.remove(&id);
                Err(RunError::McpDisconnected(
                    "mcp reader task ended before a response arrived".to_string(),
                ))
            }
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(RunError::McpTimeout {
                    method: method.to_string(),
                    elapsed_ms: started.elapsed().as_millis() as u64,
                })
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), RunError> {
        let notification = JsonRpcNotification::new(method, params);
        let mut line = serde_json::to_string(&notification)
            .map_err(|e| RunError::McpProtocolError(e.to_string()))?;
        line.push('\n');
        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err(RunError::McpDisconnected("stdin already closed".to_string()));
        };
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| RunError::McpDisconnected(e.to_string()))?;
        stdin
            .flush()
            .await
            .map_err(|e| RunError::McpDisconnected(e.to_string()))
    }

    pub async fn initialize(&self) -> Result<Value, RunError> {
        let result = self
            .call(
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "run-orchestrator", "version": env!("CARGO_PKG_VERSION") },
                }),
                DEFAULT_TIMEOUT,
            )
            .await?;
        self.notify("notifications/initialized", json!({})).await?;
        Ok(result)
    }

    pub async fn call_tool(&self, name: &str, arguments: Value, call_timeout: Duration) -> Result<Value, RunError> {
        self.call("tools/call", json!({ "name": name, "arguments": arguments }), call_timeout)
            .await
    }

    pub async fn navigate(&self, url: &str) -> Result<Value, RunError> {
        self.call_tool("browser_navigate", json!({ "url": url }), DEFAULT_TIMEOUT).await
    }

    pub async fn screenshot(&self, path: &str, full_page: bool) -> Result<Value, RunError> {
        self.call_tool(
            "browser_take_screenshot",
            json!({ "fullPage": full_page, "filename": path }),
            SCREENSHOT_TIMEOUT,
        )
        .await
    }

    pub async fn snapshot(&self) -> Result<Value, RunError> {
        self.call_tool("browser_snapshot", json!({}), SNAPSHOT_TIMEOUT).await
    }

    pub async fn evaluate(&self, expression: &str) -> Result<Value, RunError> {
        self.call_tool("browser_evaluate", json!({ "expression": expression }), EVALUATE_TIMEOUT)
            .await
    }

    pub async fn console_messages(&self) -> Result<Value, RunError> {
        self.call_tool("browser_console_messages", json!({}), DEFAULT_TIMEOUT).await
    }

    pub async fn click(&self, selector: &str) -> Result<Value, RunError> {
        self.call_tool("browser_click", json!({ "selector": selector }), DEFAULT_TIMEOUT).await
    }

    pub async fn type_text(&self, selector: &str, text: &str) -> Result<Value, RunError> {
        self.call_tool(
            "browser_type",
            json!({ "selector": selector, "text": text }),
            DEFAULT_TIMEOUT,
        )
        .await
    }

    pub async fn scroll(&self, direction: &str, amount: Option<i64>) -> Result<Value, RunError> {
        self.call_tool(
            "browser_scroll",
            json!({ "direction": direction, "amount": amount }),
            DEFAULT_TIMEOUT,
        )
        .await
    }

    pub async fn press_key(&self, key: &str) -> Result<Value, RunError> {
        self.call_tool("browser_press_key", json!({ "key": key }), DEFAULT_TIMEOUT).await
    }

    pub async fn hover(&self, selector: &str) -> Result<Value, RunError> {
        self.call_tool("browser_hover", json!({ "selector": selector }), DEFAULT_TIMEOUT).await
    }

    pub async fn wait_for(&self, condition: &str, timeout_ms: Option<u64>) -> Result<Value, RunError> {
        let call_timeout = timeout_ms
            .map(|ms| Duration::from_millis(ms).max(DEFAULT_TIMEOUT))
            .unwrap_or(DEFAULT_TIMEOUT);
        self.call_tool(
            "browser_wait_for",
            json!({ "condition": condition, "timeoutMs": timeout_ms }),
            call_timeout,
        )
        .await
    }

    pub async fn start_recording(&self, path: &str) -> Result<Value, RunError> {
        self.call_tool("browser_start_recording", json!({ "videoPath": path }), DEFAULT_TIMEOUT)
            .await
    }

    pub async fn stop_recording(&self) -> Result<Value, RunError> {
        self.call_tool("browser_stop_recording", json!({}), DEFAULT_TIMEOUT).await
    }

    /// Cancels the reader task, closes stdin, and terminates the
    /// child with a 5 s grace period before kill. Safe to call once;
    /// a second call observes an already-absent child and is a no-op.
    pub async fn disconnect(&self) {
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        self.stdin.lock().await.take();

        let mut guard = self.child.lock().await;
        let Some(mut child) = guard.take() else {
            return;
        };
        drop(guard);

        match timeout(Duration::from_secs(5), child.wait()).await {
            Ok(_) => {}
            Err(_) => {
                let _ = child.kill().await;
                let _ = child.wait().await;
            }
        }
        self.connected.store(false, Ordering::SeqCst);
    }
}

async fn read_frame<R: AsyncRead + Unpin>(stdout: &mut R, carry: &mut Vec<u8>) -> std::io::Result<Option<Vec<u8>>> {
    loop {
        if let Some(pos) = carry.iter().position(|&b| b == b'\n') {
            let rest = carry.split_off(pos + 1);
            let mut line = std::mem::replace(carry, rest);
            line.truncate(line.len() - 1);
            return Ok(Some(line));
        }
        if carry.len() > LINE_LIMIT {
            return read_oversized(stdout, std::mem::take(carry)).await;
        }
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = stdout.read(&mut chunk).await?;
        if n == 0 {
            if carry.is_empty() {
                return Ok(None);
            }
            return Ok(Some(std::mem::take(carry)));
        }
        chunk.truncate(n);
        carry.extend_from_slice(&chunk);
    }
}

/// Past `LINE_LIMIT`, switch to raw 8 KiB reads. Bytes in the chunk
/// that completes the frame, past the newline, are discarded rather
/// than carried forward — matching the documented behavior of the
/// reference client this protocol was modeled on.
async fn read_oversized<R: AsyncRead + Unpin>(stdout: &mut R, mut carry: Vec<u8>) -> std::io::Result<Option<Vec<u8>>> {
    loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = stdout.read(&mut chunk).await?;
        if n == 0 {
            return Ok(Some(carry));
        }
        chunk.truncate(n);
        if let Some(pos) = chunk.iter().position(|&b| b == b'\n') {
            carry.extend_from_slice(&chunk[..pos]);
            return Ok(Some(carry));
        }
        carry.extend_from_slice(&chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt as _;

    #[test]
    fn default_timeouts_match_documented_values() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(60));
        assert_eq!(SCREENSHOT_TIMEOUT, Duration::from_secs(90));
        assert_eq!(SNAPSHOT_TIMEOUT, Duration::from_secs(90));
    }

    #[tokio::test]
    async fn read_frame_returns_a_normal_short_line() {
        let (mut writer, mut reader) = tokio::io::duplex(1024);
        writer.write_all(b"{\"id\":1}\n").await.unwrap();
        let mut carry = Vec::new();
        let line = read_frame(&mut reader, &mut carry).await.unwrap().unwrap();
        assert_eq!(line, b"{\"id\":1}");
    }

    #[tokio::test]
    async fn read_frame_carries_partial_writes_across_reads() {
        let (mut writer, mut reader) = tokio::io::duplex(1024);
        let mut carry = Vec::new();
        let handle = tokio::spawn(async move {
            writer.write_all(b"{\"id\":").await.unwrap();
            tokio::task::yield_now().await;
            writer.write_all(b"2}\n").await.unwrap();
        });
        let line = read_frame(&mut reader, &mut carry).await.unwrap().unwrap();
        assert_eq!(line, b"{\"id\":2}");
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_frame_discards_bytes_past_the_closing_newline() {
        let (mut writer, mut reader) = tokio::io::duplex(1 << 20);
        let oversized_payload = "x".repeat(LINE_LIMIT + 1024);
        let handle = tokio::spawn(async move {
            writer.write_all(oversized_payload.as_bytes()).await.unwrap();
            writer.write_all(b"\nGARBAGE-FROM-NEXT-FRAME").await.unwrap();
        });
        let mut carry = Vec::new();
        let line = read_frame(&mut reader, &mut carry).await.unwrap().unwrap();
        assert!(line.len() >= LINE_LIMIT);
        assert!(!String::from_utf8_lossy(&line).contains("GARBAGE"));
        handle.await.unwrap();
    }
}
