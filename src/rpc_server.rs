//! TabSync RPC Server: JSON-RPC over stdin/stdout for the extension host.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"command.openTab", "params":{"deviceId":"...","url":"..."}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//! Browser actions the host must perform are pushed as
//! {"event":"tabs.create", "params":{...}} lines.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tabsync::app::App;
use tabsync::database::connection::Database;
use tabsync::managers::tab_manager::{TabAction, TabManager};
use tabsync::platform;
use tabsync::rpc_handler::{handle_method, RpcState};
use tabsync::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use tabsync::store::firestore::FirestoreFactory;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self {
            window_start: Instant::now(),
            request_count: 0,
            max_per_second,
        }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

/// Stdout carries the protocol, so logs go to stderr.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabsync=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn emit(line: Value) {
    println!("{}", line);
}

#[tokio::main]
async fn main() {
    init_tracing();

    let dir = platform::get_data_dir();
    if let Err(e) = std::fs::create_dir_all(&dir) {
        warn!(path = %dir.display(), error = %e, "Could not create data directory");
    }
    let db = match Database::open(dir.join("tabsync.db")) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(error = %e, "Failed to open local database");
            std::process::exit(1);
        }
    };

    let mut settings = SettingsEngine::new(None);
    if let Err(e) = settings.load() {
        warn!(error = %e, "Failed to load settings, using defaults");
    }
    let sync_settings = settings.get_settings().sync.clone();

    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<TabAction>();
    let tabs = Arc::new(TabManager::forwarding(action_tx));
    tokio::spawn(async move {
        while let Some(action) = action_rx.recv().await {
            match serde_json::to_value(&action) {
                Ok(line) => emit(line),
                Err(e) => warn!(error = %e, "Could not encode tab action"),
            }
        }
    });

    let factory = FirestoreFactory {
        poll_interval: sync_settings.poll_interval(),
    };
    let mut app = App::new(db, tabs.clone(), Box::new(factory), sync_settings);
    match app.startup().await {
        Ok(state) => info!(?state, "TabSync started"),
        Err(e) => warn!(error = %e, "Startup did not complete"),
    }

    let state = RpcState {
        app: AsyncMutex::new(app),
        tabs,
        settings: Mutex::new(settings),
    };

    emit(json!({"event": "ready", "version": env!("CARGO_PKG_VERSION")}));

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read from stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                emit(json!({"id": null, "error": format!("parse error: {}", e)}));
                continue;
            }
        };
        let id = req.get("id").cloned().unwrap_or(Value::Null);

        if !rate_limiter.check() {
            emit(json!({"id": id, "error": "rate limit exceeded"}));
            continue;
        }

        let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
        let params = req.get("params").cloned().unwrap_or(json!({}));

        let response = match handle_method(&state, method, &params).await {
            Ok(val) => json!({"id": id, "result": val}),
            Err(err) => json!({"id": id, "error": err}),
        };
        emit(response);
    }

    state.app.lock().await.shutdown();
    info!("TabSync stopped");
}
