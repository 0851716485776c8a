//! Demo remote shell server.
//!
//! Run with: cargo run -p shell-server -- --tcp 127.0.0.1:2222
//!
//! Then open http://localhost:3000 in your browser, or connect with
//! `nc 127.0.0.1 2222`.

mod commands;
mod config;

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Context as _;
use axum::{Router, response::Html, routing::get};
use clap::Parser;
use remote_shell_postprocess::TransformerRegistry;
use remote_shell_session::SessionManager;
use remote_shell_transport::{tcp::TcpTransport, websocket::create_ws_router};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{commands::DemoCommands, config::ServerConfig};

/// Multi-user remote shell over WebSocket and raw TCP.
#[derive(Debug, Parser)]
#[command(name = "shell-server", version, about)]
struct Cli {
    /// Address for the web terminal and its WebSocket endpoint.
    #[arg(long, default_value = "127.0.0.1:3000")]
    ws: SocketAddr,

    /// Address for line-oriented TCP clients; disabled when omitted.
    #[arg(long)]
    tcp: Option<SocketAddr>,

    /// TOML file with `[session]`, `[transport]` and `[postprocess]` tables.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_thread_names(true))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load(cli.config.as_deref())?;

    let registry = Arc::new(TransformerRegistry::with_builtins_saving_to(
        &config.postprocess.output_dir,
    )?);
    let manager = Arc::new(SessionManager::new(DemoCommands, registry, config.session));

    if let Some(addr) = cli.tcp {
        let listener = std::net::TcpListener::bind(addr)
            .with_context(|| format!("failed to bind tcp transport on {addr}"))?;
        let transport = TcpTransport::new(Arc::clone(&manager), config.transport.clone());
        std::thread::Builder::new()
            .name("tcp-acceptor".to_string())
            .spawn(move || {
                if let Err(e) = transport.serve(&listener) {
                    tracing::error!(error = %e, "tcp transport stopped");
                }
            })
            .context("failed to start tcp acceptor")?;
    }

    // Build router
    let app = Router::new()
        .route("/", get(index_handler))
        .merge(create_ws_router(Arc::clone(&manager), config.transport))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(cli.ws)
        .await
        .with_context(|| format!("failed to bind web server on {}", cli.ws))?;
    tracing::info!("Server listening on http://{}", cli.ws);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let interrupted = manager.shutdown();
    tracing::info!(interrupted, "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Remote Shell</title>
    <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/xterm@5.3.0/css/xterm.css" />
    <script src="https://cdn.jsdelivr.net/npm/xterm@5.3.0/lib/xterm.js"></script>
    <script src="https://cdn.jsdelivr.net/npm/xterm-addon-fit@0.8.0/lib/xterm-addon-fit.js"></script>
    <style>
        body { margin: 0; padding: 20px; background: #1e1e1e; font-family: system-ui, sans-serif; }
        h1 { color: #fff; margin-bottom: 10px; }
        #terminal-container { width: 100%; height: calc(100vh - 100px); }
        .status { color: #888; font-size: 14px; margin-bottom: 10px; }
        .connected { color: #4a4; }
        .disconnected { color: #a44; }
    </style>
</head>
<body>
    <h1>Remote Shell</h1>
    <div class="status" id="status">Connecting...</div>
    <div id="terminal-container"></div>

    <script>
        const term = new Terminal({ cursorBlink: true, fontSize: 14 });
        const fitAddon = new FitAddon.FitAddon();
        term.loadAddon(fitAddon);
        term.open(document.getElementById('terminal-container'));
        fitAddon.fit();

        const status = document.getElementById('status');
        const encoder = new TextEncoder();
        let ws;
        let line = '';

        function send(msg) {
            if (ws && ws.readyState === WebSocket.OPEN) {
                ws.send(JSON.stringify(msg));
            }
        }

        function sendInput(text) {
            const bytes = encoder.encode(text);
            send({ type: 'input', data: btoa(String.fromCharCode(...bytes)) });
        }

        function connect() {
            const protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
            ws = new WebSocket(`${protocol}//${window.location.host}/ws`);

            ws.onopen = () => {
                status.textContent = 'Connected';
                status.className = 'status connected';
                const { cols, rows } = term;
                send({ type: 'hello', cols, rows, term: 'xterm-256color' });
            };

            ws.onclose = () => {
                status.textContent = 'Disconnected - reload to start a new session';
                status.className = 'status disconnected';
            };

            ws.onmessage = (event) => {
                const msg = JSON.parse(event.data);
                if (msg.type === 'output') {
                    term.write(Uint8Array.from(atob(msg.data), (c) => c.charCodeAt(0)));
                } else if (msg.type === 'session_ended') {
                    term.writeln(`\r\n[Session ended]`);
                } else if (msg.type === 'error') {
                    term.writeln(`\r\n[Error: ${msg.message}]\r\n`);
                }
            };
        }

        // The server reads whole lines; edit locally and send on enter.
        term.onData((data) => {
            for (const ch of data) {
                if (ch === '\r') {
                    term.write('\r\n');
                    sendInput(line + '\r');
                    line = '';
                } else if (ch === '\x7f') {
                    if (line.length > 0) {
                        line = line.slice(0, -1);
                        term.write('\b \b');
                    }
                } else if (ch === '\x03') {
                    line = '';
                    term.write('^C\r\n');
                    sendInput('\x03\r');
                } else if (ch === '\x04' && line.length === 0) {
                    sendInput('\x04');
                } else if (ch >= ' ') {
                    line += ch;
                    term.write(ch);
                }
            }
        });

        window.addEventListener('resize', () => {
            fitAddon.fit();
            const { cols, rows } = term;
            send({ type: 'resize', cols, rows });
        });

        connect();
    </script>
</body>
</html>
"#;
