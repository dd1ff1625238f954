//! Development server: static files plus the live-reload channel.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    body::{to_bytes, Body},
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::livereload::{livereload_script, ReloadHub, ReloadMessage};

const INJECT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve (the build output).
    pub root: PathBuf,

    /// Host to bind to.
    pub host: String,

    /// Preferred port; when taken, the OS picks a free one instead.
    pub port: u16,

    /// Open browser on start.
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            host: "127.0.0.1".to_string(),
            port: 3000,
            open: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    Bind(String, String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    /// Create a new development server pushing through `hub`.
    pub fn new(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Bind the listener without serving yet.
    ///
    /// The bound address is known before any request is handled, so the
    /// orchestrator can resolve the loopback base URL against the port that
    /// was actually obtained.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let requested = format!("{}:{}", self.config.host, self.config.port);

        let listener = match TcpListener::bind(&requested).await {
            Ok(listener) => listener,
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::warn!("Port {} is taken, letting the OS pick one", self.config.port);
                TcpListener::bind((self.config.host.as_str(), 0))
                    .await
                    .map_err(|e| ServerError::Bind(requested.clone(), e.to_string()))?
            }
            Err(e) => return Err(ServerError::Bind(requested, e.to_string())),
        };

        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(requested, e.to_string()))?;

        Ok(BoundServer {
            listener,
            addr,
            config: self.config,
            hub: self.hub,
        })
    }
}

/// A server that has bound its port but is not serving yet.
pub struct BoundServer {
    listener: TcpListener,
    addr: SocketAddr,
    config: DevServerConfig,
    hub: ReloadHub,
}

impl BoundServer {
    /// The address actually bound.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve until externally terminated.
    pub async fn serve(self) -> Result<(), ServerError> {
        let app = router(&self.config.root, self.hub);

        tracing::info!(
            "Serving {} at http://{}",
            self.config.root.display(),
            self.addr
        );

        if self.config.open {
            let _ = open::that(format!("http://{}", self.addr));
        }

        axum::serve(self.listener, app)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))
    }
}

fn router(root: &std::path::Path, hub: ReloadHub) -> Router {
    let serve_dir = ServeDir::new(root).append_index_html_on_directories(true);

    Router::new()
        .route("/__livereload", get(ws_handler))
        .route("/__livereload.js", get(script_handler))
        .fallback_service(serve_dir)
        .layer(middleware::from_fn(inject_livereload))
        .with_state(hub)
}

/// Handler for the live-reload WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<ReloadHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward hub messages to one connected client.
async fn handle_ws(mut socket: WebSocket, hub: ReloadHub) {
    let mut rx = hub.subscribe();

    let msg = serde_json::to_string(&ReloadMessage::Connected).unwrap();
    if socket.send(Message::Text(msg.into())).await.is_err() {
        return;
    }

    while let Ok(reload_msg) = rx.recv().await {
        let json = serde_json::to_string(&reload_msg).unwrap();
        if socket.send(Message::Text(json.into())).await.is_err() {
            break;
        }
    }
}

/// Handler for the live-reload client script.
async fn script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        livereload_script(),
    )
}

/// Attach the reload script to every served HTML page, the way
/// browser-sync splices itself into proxied responses.
async fn inject_livereload(req: Request, next: Next) -> Response {
    let res = next.run(req).await;

    let is_html = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html {
        return res;
    }

    let (mut parts, body) = res.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to buffer HTML response: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = String::from_utf8_lossy(&bytes);
    let page = inject_into(&html);

    // Recomputed by hyper for the new full body.
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(page))
}

/// Splice the script tag in front of `</body>`, or append when the page
/// has no closing tag.
fn inject_into(html: &str) -> String {
    match html.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], INJECT_TAG, &html[idx..]),
        None => format!("{}{}", html, INJECT_TAG),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn injects_before_closing_body() {
        let page = inject_into("<html><body><h1>hi</h1></body></html>");
        assert_eq!(
            page,
            format!("<html><body><h1>hi</h1>{}</body></html>", INJECT_TAG)
        );
    }

    #[test]
    fn appends_when_body_tag_is_missing() {
        let page = inject_into("<h1>bare fragment</h1>");
        assert!(page.ends_with(INJECT_TAG));
    }

    #[tokio::test]
    async fn bind_reports_the_actual_port() {
        let server = DevServer::new(
            DevServerConfig {
                port: 0,
                ..Default::default()
            },
            ReloadHub::new(),
        );

        let bound = server.bind().await.unwrap();
        assert_ne!(bound.addr().port(), 0);
    }

    #[tokio::test]
    async fn falls_back_when_the_port_is_taken() {
        let first = DevServer::new(
            DevServerConfig {
                port: 0,
                ..Default::default()
            },
            ReloadHub::new(),
        )
        .bind()
        .await
        .unwrap();
        let taken = first.addr().port();

        let second = DevServer::new(
            DevServerConfig {
                port: taken,
                ..Default::default()
            },
            ReloadHub::new(),
        )
        .bind()
        .await
        .unwrap();

        assert_ne!(second.addr().port(), taken);
    }
}
