//! Local OAuth2 redirect capture.
//!
//! [`CallbackListener`] is a single-shot HTTP listener on the loopback
//! interface. It binds synchronously so a busy port is detected before the
//! user is sent to the browser, serves exactly one request on the expected
//! path, and unbinds when [`CallbackListener::wait`] returns (the listener
//! is consumed).
//!
//! [`CodeReceiver`] abstracts over how the redirect reaches us: the loopback
//! listener, or the user pasting the redirect URL by hand.

use async_trait::async_trait;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::CallbackError;

/// Default callback port.
pub const DEFAULT_CALLBACK_PORT: u16 = 8888;

/// Default callback path.
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";

/// Default time to wait for the browser redirect.
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Time a client gets to send its request head.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest request head read from a client.
const MAX_REQUEST_BYTES: usize = 8192;

const SUCCESS_PAGE: &str = "<!DOCTYPE html><html><head><title>Grocer</title></head>\
<body style=\"font-family: sans-serif; text-align: center; padding-top: 4em\">\
<h1>Authorization successful!</h1>\
<p>You can close this window and return to the terminal.</p></body></html>";

const DENIED_PAGE: &str = "<!DOCTYPE html><html><head><title>Grocer</title></head>\
<body style=\"font-family: sans-serif; text-align: center; padding-top: 4em\">\
<h1>Authorization was not completed</h1>\
<p>Return to the terminal for details.</p></body></html>";

// ============================================================================
// Callback Parameters
// ============================================================================

/// Query parameters delivered to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// State token echoed by the provider.
    pub state: Option<String>,
    /// OAuth error code, e.g. `access_denied`.
    pub error: Option<String>,
    /// Human-readable error description.
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Extracts parameters from a parsed URL.
    pub fn from_url(url: &Url) -> Self {
        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    /// Parses a full redirect URL as pasted by the user.
    pub fn from_redirect(text: &str) -> Result<Self, CallbackError> {
        let text = text.trim();
        let url = Url::parse(text)
            .map_err(|e| CallbackError::Malformed(format!("not a URL ({e}): {text}")))?;
        if url.query().is_none() {
            return Err(CallbackError::Malformed(
                "redirect URL has no query string".to_string(),
            ));
        }
        Ok(Self::from_url(&url))
    }

    /// Returns true if the provider reported an error.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// Listener
// ============================================================================

/// Single-use loopback listener for the OAuth2 redirect.
#[derive(Debug)]
pub struct CallbackListener {
    listener: std::net::TcpListener,
    path: String,
    port: u16,
}

impl CallbackListener {
    /// Binds `127.0.0.1:port`. Port 0 picks a free port.
    pub fn bind(port: u16, path: &str) -> Result<Self, CallbackError> {
        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
        let listener =
            std::net::TcpListener::bind(addr).map_err(|source| CallbackError::Bind { port, source })?;
        listener.set_nonblocking(true)?;
        let port = listener.local_addr()?.port();

        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        debug!(port, path = %path, "Callback listener bound");
        Ok(Self {
            listener,
            path,
            port,
        })
    }

    /// Bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register with the authorization request.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, self.path)
    }

    /// Waits for the redirect, serving exactly one request on the callback path.
    ///
    /// Requests for other paths get a 404 and do not end the wait. The
    /// socket is closed when this returns.
    pub async fn wait(self, timeout: Duration) -> Result<CallbackParams, CallbackError> {
        let listener = TcpListener::from_std(self.listener)?;
        let path = self.path;

        let result = tokio::time::timeout(timeout, accept_callback(&listener, &path)).await;
        drop(listener);
        debug!(port = self.port, "Callback listener closed");

        match result {
            Ok(params) => params,
            Err(_) => Err(CallbackError::Timeout(timeout)),
        }
    }
}

async fn accept_callback(listener: &TcpListener, path: &str) -> Result<CallbackParams, CallbackError> {
    // Browsers open idle preconnects, so each connection is served on its own task.
    let mut connections = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                connections.spawn(serve_connection(stream, peer, path.to_string()));
            }
            Some(joined) = connections.join_next() => {
                if let Ok(Some(params)) = joined {
                    return Ok(params);
                }
            }
        }
    }
}

/// Answers one connection; returns the parameters if it was the callback.
async fn serve_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    path: String,
) -> Option<CallbackParams> {
    let target =
        match tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_target(&mut stream)).await {
            Ok(Ok(Some(target))) => target,
            Ok(Ok(None)) => {
                respond(&mut stream, "400 Bad Request", "Bad request").await;
                return None;
            }
            Ok(Err(e)) => {
                debug!(peer = %peer, error = %e, "Dropped callback connection");
                return None;
            }
            Err(_) => {
                debug!(peer = %peer, "Dropped idle callback connection");
                return None;
            }
        };

    let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
        respond(&mut stream, "400 Bad Request", "Bad request").await;
        return None;
    };

    if url.path() != path {
        debug!(path = %url.path(), "Ignoring request for unexpected path");
        respond(&mut stream, "404 Not Found", "Not found").await;
        return None;
    }

    let params = CallbackParams::from_url(&url);
    let page = if params.is_error() { DENIED_PAGE } else { SUCCESS_PAGE };
    respond(&mut stream, "200 OK", page).await;
    info!("Authorization callback received");
    Some(params)
}

/// Reads the request head and returns the target of a GET request.
async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") && buf.len() < MAX_REQUEST_BYTES {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let mut parts = head.lines().next().unwrap_or_default().split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) if target.starts_with('/') => Ok(Some(target.to_string())),
        _ => Ok(None),
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!(error = %e, "Failed to write callback response");
    }
    let _ = stream.shutdown().await;
}

// ============================================================================
// Code Receivers
// ============================================================================

/// A way of obtaining the redirect parameters.
#[async_trait]
pub trait CodeReceiver: Send {
    /// Redirect URI to put in the authorization request.
    fn redirect_uri(&self) -> String;

    /// Port the redirect is expected on.
    fn port(&self) -> u16;

    /// Waits for the redirect parameters.
    async fn receive(self: Box<Self>, timeout: Duration) -> Result<CallbackParams, CallbackError>;
}

/// Receives the redirect on a loopback [`CallbackListener`].
#[derive(Debug)]
pub struct LoopbackReceiver {
    listener: CallbackListener,
}

impl LoopbackReceiver {
    /// Wraps a bound listener.
    pub fn new(listener: CallbackListener) -> Self {
        Self { listener }
    }
}

#[async_trait]
impl CodeReceiver for LoopbackReceiver {
    fn redirect_uri(&self) -> String {
        self.listener.redirect_uri()
    }

    fn port(&self) -> u16 {
        self.listener.port()
    }

    async fn receive(self: Box<Self>, timeout: Duration) -> Result<CallbackParams, CallbackError> {
        self.listener.wait(timeout).await
    }
}

/// Prompt that returns the redirect URL the user pasted.
pub type RedirectPrompt = Box<dyn FnOnce() -> std::io::Result<String> + Send>;

/// Receives the redirect URL by asking the user to paste it.
///
/// Used when the callback port cannot be bound. The browser will fail to
/// load the redirect page, but its address bar holds the full URL
/// including `code` and `state`.
pub struct ManualEntryReceiver {
    redirect_uri: String,
    port: u16,
    prompt: RedirectPrompt,
}

impl ManualEntryReceiver {
    /// Creates a receiver for `port`/`path` that reads input with `prompt`.
    pub fn new(port: u16, path: &str, prompt: RedirectPrompt) -> Self {
        Self {
            redirect_uri: format!("http://localhost:{port}{path}"),
            port,
            prompt,
        }
    }
}

#[async_trait]
impl CodeReceiver for ManualEntryReceiver {
    fn redirect_uri(&self) -> String {
        self.redirect_uri.clone()
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn receive(self: Box<Self>, timeout: Duration) -> Result<CallbackParams, CallbackError> {
        let prompt = self.prompt;
        let pasted = tokio::time::timeout(timeout, tokio::task::spawn_blocking(prompt))
            .await
            .map_err(|_| CallbackError::Timeout(timeout))?
            .map_err(|e| CallbackError::Malformed(format!("prompt task failed: {e}")))??;
        CallbackParams::from_redirect(&pasted)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn get(port: u16, target: &str) -> (u16, String) {
        let response = reqwest::get(format!("http://127.0.0.1:{port}{target}"))
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    #[test]
    fn test_params_from_redirect() {
        let params =
            CallbackParams::from_redirect("http://localhost:8888/callback?code=abc&state=xyz")
                .unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
        assert!(!params.is_error());
    }

    #[test]
    fn test_params_error() {
        let params = CallbackParams::from_redirect(
            "http://localhost:8888/callback?error=access_denied&error_description=User%20said%20no&state=s",
        )
        .unwrap();
        assert!(params.is_error());
        assert_eq!(params.error_description.as_deref(), Some("User said no"));
    }

    #[test]
    fn test_bare_code_rejected() {
        assert!(CallbackParams::from_redirect("abc123").is_err());
        assert!(CallbackParams::from_redirect("http://localhost:8888/callback").is_err());
    }

    #[tokio::test]
    async fn test_listener_single_use() {
        let listener = CallbackListener::bind(0, "/callback").unwrap();
        let port = listener.port();
        assert_eq!(listener.redirect_uri(), format!("http://localhost:{port}/callback"));

        let waiter = tokio::spawn(listener.wait(Duration::from_secs(5)));

        let (status, _) = get(port, "/favicon.ico").await;
        assert_eq!(status, 404);

        let (status, body) = get(port, "/callback?code=abc&state=xyz").await;
        assert_eq!(status, 200);
        assert!(body.contains("Authorization successful"));

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));

        // Unbound after the first callback.
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_callback() {
        let listener = CallbackListener::bind(0, "/callback").unwrap();
        let port = listener.port();
        let waiter = tokio::spawn(listener.wait(Duration::from_secs(5)));

        // Connected but never sends a request, like a browser preconnect.
        let _idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let (status, _) = get(port, "/callback?code=abc&state=xyz").await;
        assert_eq!(status, 200);

        let params = waiter.await.unwrap().unwrap();
        assert_eq!(params.code.as_deref(), Some("abc"));
        assert_eq!(params.state.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_listener_timeout() {
        let listener = CallbackListener::bind(0, "callback").unwrap();
        let port = listener.port();
        let err = listener.wait(Duration::from_millis(50)).await.unwrap_err();
        assert!(matches!(err, CallbackError::Timeout(_)));
        assert!(TcpStream::connect(("127.0.0.1", port)).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let first = CallbackListener::bind(0, "/callback").unwrap();
        let err = CallbackListener::bind(first.port(), "/callback").unwrap_err();
        assert!(matches!(err, CallbackError::Bind { .. }));
    }

    #[tokio::test]
    async fn test_manual_entry_receiver() {
        let receiver = ManualEntryReceiver::new(
            8888,
            "/callback",
            Box::new(|| Ok("http://localhost:8888/callback?code=c1&state=s1\n".to_string())),
        );
        assert_eq!(receiver.redirect_uri(), "http://localhost:8888/callback");
        let params = Box::new(receiver)
            .receive(Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(params.code.as_deref(), Some("c1"));
    }
}
