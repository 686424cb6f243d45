use std::path::PathBuf;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_escape::best_time_store::{BestTimeStore, FileBestTimeStore};
use maze_escape::config::ServerConfig;
use maze_escape::constants::{OUTBOUND_QUEUE_DEPTH, TICK_MS};
use maze_escape::input::{classify_swipe, Command};
use maze_escape::maze::generate_maze;
use maze_escape::protocol::{parse_client_message, ParsedClientMessage};
use maze_escape::rng::Rng;
use maze_escape::server_utils::format_best;
use maze_escape::session::{MoveOutcome, Session};
use maze_escape::types::SessionStatus;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};

/// Best time shared by every connection. Only a strictly lower time replaces
/// the current one; accepted records go to the file writer task.
#[derive(Clone, Debug)]
struct SharedBestTime {
    best_ms: Arc<std::sync::Mutex<Option<u64>>>,
    writes: mpsc::UnboundedSender<u64>,
}

impl SharedBestTime {
    fn new(best_ms: Option<u64>, writes: mpsc::UnboundedSender<u64>) -> Self {
        Self {
            best_ms: Arc::new(std::sync::Mutex::new(best_ms)),
            writes,
        }
    }
}

impl BestTimeStore for SharedBestTime {
    fn load(&self) -> Option<u64> {
        *self.best_ms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn save(&mut self, best_ms: u64) {
        let mut current = self.best_ms.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*current, Some(existing) if existing <= best_ms) {
            return;
        }
        *current = Some(best_ms);
        if self.writes.send(best_ms).is_err() {
            tracing::warn!(best_ms, "best-time writer is gone; record kept in memory only");
        }
    }
}

/// Persists records on the blocking pool, coalescing bursts to the lowest time.
fn spawn_best_time_writer(
    mut store: FileBestTimeStore,
    mut writes: mpsc::UnboundedReceiver<u64>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(mut best_ms) = writes.recv().await {
            while let Ok(next) = writes.try_recv() {
                best_ms = best_ms.min(next);
            }
            store = match tokio::task::spawn_blocking(move || {
                store.save(best_ms);
                store
            })
            .await
            {
                Ok(store) => store,
                Err(error) => {
                    tracing::error!(%error, "best-time writer failed");
                    return;
                }
            };
        }
    })
}

#[derive(Clone)]
struct AppState {
    store: SharedBestTime,
    grid_size: usize,
}

#[derive(Clone, Debug)]
enum OutboundMessage {
    Text(String),
    Close { code: u16, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// Per-socket game: one session and the seed its current maze came from.
struct Connection {
    session: Session<SharedBestTime>,
    seed: u32,
    grid_size: usize,
    dirty: bool,
    tx: mpsc::Sender<OutboundMessage>,
    open: bool,
    /// Set when a control message could not be queued; pending output is dropped.
    overflowed: bool,
    closed: Arc<Notify>,
}

impl Connection {
    fn send(&mut self, message: &Value, policy: QueuePolicy) {
        if !self.open {
            return;
        }
        let failed = self
            .tx
            .try_send(OutboundMessage::Text(message.to_string()))
            .is_err();
        if failed && policy == QueuePolicy::DisconnectOnFull {
            tracing::warn!("outbound queue full, closing connection");
            self.overflowed = true;
            self.shut();
        }
    }

    fn close(&mut self, code: u16, reason: &str) {
        let _ = self.tx.try_send(OutboundMessage::Close {
            code,
            reason: reason.to_string(),
        });
        self.shut();
    }

    /// Stops the ticker and wakes the read loop so the socket is released.
    fn shut(&mut self) {
        self.open = false;
        self.closed.notify_one();
    }

    fn send_maze_init(&mut self) {
        let message = json!({
            "type": "maze_init",
            "maze": self.session.maze().to_maze_init(),
            "seed": self.seed,
        });
        self.send(&message, QueuePolicy::DisconnectOnFull);
    }

    fn send_state(&mut self) {
        let message = json!({
            "type": "state",
            "snapshot": self.session.snapshot(),
        });
        self.send(&message, QueuePolicy::DropOnFull);
        self.dirty = false;
    }

    fn send_error(&mut self, message: &str) {
        self.send(
            &json!({
                "type": "error",
                "message": message,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }

    fn regenerate(&mut self, seed: Option<u32>) {
        let mut rng = seed.map(Rng::new).unwrap_or_else(Rng::from_entropy);
        match generate_maze(self.grid_size, &mut rng) {
            Ok(maze) => {
                self.session.regenerate(maze);
                self.seed = rng.seed();
                tracing::info!(seed = self.seed, size = self.grid_size, "maze regenerated");
                self.send_maze_init();
                self.dirty = true;
            }
            Err(error) => {
                tracing::error!(%error, "failed to regenerate maze");
                self.send_error(&error.to_string());
            }
        }
    }

    fn report_move(&mut self, outcome: MoveOutcome) {
        match outcome {
            MoveOutcome::Blocked => {
                self.send(&json!({ "type": "blocked" }), QueuePolicy::DropOnFull);
            }
            MoveOutcome::Won {
                elapsed_ms,
                new_record,
            } => {
                let message = json!({
                    "type": "won",
                    "elapsedMs": elapsed_ms,
                    "bestMs": self.session.best_ms(),
                    "newRecord": new_record,
                    "moves": self.session.moves(),
                });
                self.send(&message, QueuePolicy::DisconnectOnFull);
            }
            MoveOutcome::Moved | MoveOutcome::Ignored => {}
        }
        if outcome.accepted() {
            self.dirty = true;
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::Move(dir) => self.session.queue_move(dir),
            Command::TogglePause => self.dirty |= self.session.toggle_pause(),
            Command::Start => self.dirty |= self.session.start(),
            Command::Reset => {
                self.session.reset();
                self.dirty = true;
            }
            Command::Regenerate => self.regenerate(None),
            Command::Close => self.close(1000, "closed by client"),
        }
    }

    fn handle_message(&mut self, raw: &str) {
        let Some(message) = parse_client_message(raw) else {
            self.send_error("invalid message");
            return;
        };
        match message {
            ParsedClientMessage::Command(command) => self.apply_command(command),
            ParsedClientMessage::Swipe { dx, dy } => {
                if let Some(dir) = classify_swipe(dx, dy) {
                    self.session.queue_move(dir);
                }
            }
            ParsedClientMessage::Regenerate { seed } => self.regenerate(seed),
            ParsedClientMessage::Ping { t } => {
                self.send(
                    &json!({
                        "type": "pong",
                        "t": t,
                    }),
                    QueuePolicy::DisconnectOnFull,
                );
            }
        }
    }

    fn tick(&mut self) {
        if let Some(outcome) = self.session.step(TICK_MS) {
            self.report_move(outcome);
        }
        if self.dirty || self.session.status() == SessionStatus::Running {
            self.send_state();
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();
    let file_store = FileBestTimeStore::new(config.best_time_path.clone());
    let (writes_tx, writes_rx) = mpsc::unbounded_channel();
    let store = SharedBestTime::new(file_store.load(), writes_tx);
    tracing::info!(
        path = %config.best_time_path.display(),
        best_ms = ?store.load(),
        "best-time store opened"
    );
    let _best_time_writer = spawn_best_time_writer(file_store, writes_rx);

    let state = AppState {
        store,
        grid_size: config.grid_size,
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/best", get(best_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir(config.static_dir.clone()) {
        let index_file = static_dir.join("index.html");
        tracing::info!(root = %static_dir.display(), "serving static files");
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        tracing::warn!("static file root not found; serving the API only");
        app
    };

    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(%bind_addr, %error, "failed to bind server socket");
            std::process::exit(1);
        }
    };

    tracing::info!(port = config.port, grid_size = config.grid_size, "listening");
    if let Err(error) = axum::serve(listener, app).await {
        tracing::error!(%error, "server runtime failed");
        std::process::exit(1);
    }
}

fn resolve_static_dir(configured: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = configured {
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn best_handler(State(state): State<AppState>) -> impl IntoResponse {
    let best_ms = state.store.load();
    Json(json!({
        "bestMs": best_ms,
        "formatted": format_best(best_ms),
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let (tx, mut rx) = mpsc::channel::<OutboundMessage>(OUTBOUND_QUEUE_DEPTH);

    let mut rng = Rng::from_entropy();
    let maze = match generate_maze(state.grid_size, &mut rng) {
        Ok(maze) => maze,
        Err(error) => {
            tracing::error!(%error, "failed to generate maze for new connection");
            return;
        }
    };
    tracing::info!(seed = rng.seed(), size = state.grid_size, "connection opened");

    let closed = Arc::new(Notify::new());
    let connection = Arc::new(Mutex::new(Connection {
        session: Session::new(maze, state.store.clone()),
        seed: rng.seed(),
        grid_size: state.grid_size,
        dirty: true,
        tx: tx.clone(),
        open: true,
        overflowed: false,
        closed: closed.clone(),
    }));
    {
        let mut guard = connection.lock().await;
        guard.send_maze_init();
        guard.send_state();
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            let should_close = matches!(outbound, OutboundMessage::Close { .. });
            let result = match outbound {
                OutboundMessage::Text(payload) => {
                    ws_sender.send(Message::Text(payload.into())).await
                }
                OutboundMessage::Close { code, reason } => {
                    let frame = CloseFrame {
                        code,
                        reason: reason.into(),
                    };
                    ws_sender.send(Message::Close(Some(frame))).await
                }
            };
            if result.is_err() || should_close {
                break;
            }
        }
    });

    let ticker = {
        let connection = connection.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
            loop {
                interval.tick().await;
                let mut guard = connection.lock().await;
                if !guard.open {
                    break;
                }
                guard.tick();
            }
        })
    };

    loop {
        let received = tokio::select! {
            received = ws_receiver.next() => received,
            _ = closed.notified() => break,
        };
        let Some(Ok(message)) = received else {
            break;
        };

        let mut guard = connection.lock().await;
        match message {
            Message::Text(raw) => guard.handle_message(raw.as_str()),
            Message::Binary(raw) => match std::str::from_utf8(&raw) {
                Ok(text) => guard.handle_message(text),
                Err(_) => guard.send_error("invalid utf8 message"),
            },
            Message::Close(_) => break,
            _ => {}
        }
        if !guard.open {
            break;
        }
    }

    ticker.abort();
    let overflowed = {
        let mut guard = connection.lock().await;
        guard.open = false;
        tracing::info!(
            seed = guard.seed,
            moves = guard.session.moves(),
            status = ?guard.session.status(),
            "connection closed"
        );
        guard.overflowed
    };
    drop(connection);
    drop(tx);
    if overflowed {
        writer.abort();
    }
    let _ = writer.await;
}
