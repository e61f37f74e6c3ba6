// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Router;
use axum::http::HeaderName;
use axum::http::StatusCode;
use axum::http::header::CACHE_CONTROL;
use axum::http::header::CONTENT_TYPE;
use axum::response::Html;
use axum::routing::get;
use axum::routing::post;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::signal::ctrl_c;
use tokio::time::sleep;

use crate::audio::AudioButton;
use crate::backend::Backend;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::config::Config;
use crate::drill::driver::record_session;
use crate::drill::driver::start_polling;
use crate::drill::get::get_handler;
use crate::drill::post::audio_handler;
use crate::drill::post::key_handler;
use crate::drill::post::post_handler;
use crate::drill::state::MutableState;
use crate::drill::state::ServerState;
use crate::drill::state::Stage;
use crate::drill::state::Timers;
use crate::error::Fallible;
use crate::journal::Journal;
use crate::review::session::ReviewSession;
use crate::timer::TokioScheduler;
use crate::types::timestamp::Timestamp;

pub struct ReviewOptions {
    pub session_id: String,
    pub deck_id: Option<String>,
    pub config: Config,
}

pub async fn start_server(options: ReviewOptions) -> Fallible<()> {
    let ReviewOptions {
        session_id,
        deck_id,
        config,
    } = options;
    let backend = Arc::new(Backend::new(&config.server));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let journal = Journal::open(&config.journal)?;

    log::debug!("Loading session {session_id} from {}", config.server);
    let stage = load_stage(
        &backend,
        &session_id,
        config.timing.again_delay(),
        clock.now(),
    )
    .await;

    let state = ServerState {
        session_id,
        deck_id,
        timing: config.timing.clone(),
        backend,
        clock,
        scheduler: Arc::new(TokioScheduler::new()),
        mutable: Arc::new(Mutex::new(MutableState {
            stage,
            audio: AudioButton::new(),
            timers: Timers::default(),
            journal,
            journaled: false,
            streak_pending: false,
        })),
    };
    {
        let mut guard = state.lock();
        let mutable: &mut MutableState = &mut guard;
        if let Stage::Active(_) = mutable.stage {
            start_polling(&state, mutable);
        }
    }

    let app = router(state.clone());
    let bind = format!("127.0.0.1:{}", config.port);

    if config.open_browser {
        // Open the browser once the server accepts connections.
        let url = format!("http://{bind}/");
        let target = bind.clone();
        tokio::spawn(async move {
            loop {
                if let Ok(stream) = TcpStream::connect(&target).await {
                    drop(stream);
                    break;
                }
                sleep(Duration::from_millis(1)).await;
            }
            if let Err(e) = open::that(&url) {
                log::warn!("Could not open the browser: {e}");
            }
        });
    }

    log::info!("Review server listening on http://{bind}/");
    let listener = TcpListener::bind(&bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Keep whatever was reviewed before the server stopped.
    let mut guard = state.lock();
    let mutable: &mut MutableState = &mut guard;
    mutable.timers.cancel_all();
    record_session(&state, mutable, false);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = ctrl_c().await {
        log::error!("Could not listen for shutdown: {e}");
        std::future::pending::<()>().await;
    }
    log::info!("Shutting down");
}

/// Fetches the session's cards and builds the initial stage.
pub async fn load_stage(
    backend: &Backend,
    session_id: &str,
    again_delay: Duration,
    now: Timestamp,
) -> Stage {
    match backend.review_cards(session_id).await {
        Ok(cards) if cards.is_empty() => {
            log::info!("No cards to review in session {session_id}.");
            Stage::Empty
        }
        Ok(cards) => {
            log::debug!("Loaded {} cards.", cards.len());
            match ReviewSession::new(cards, again_delay, now) {
                Ok(session) => Stage::Active(session),
                Err(e) => Stage::Failed(e.to_string()),
            }
        }
        Err(e) => {
            log::error!("Could not load session {session_id}: {e}");
            Stage::Failed(e.to_string())
        }
    }
}

pub fn router(state: ServerState) -> Router {
    let app = Router::new();
    let app = app.route("/", get(get_handler));
    let app = app.route("/", post(post_handler));
    let app = app.route("/key", post(key_handler));
    let app = app.route("/audio", post(audio_handler));
    let app = app.route("/script.js", get(script));
    let app = app.route("/style.css", get(stylesheet));
    let app = app.fallback(not_found_handler);
    app.with_state(state)
}

async fn script() -> (StatusCode, [(HeaderName, &'static str); 1], &'static str) {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/javascript")],
        include_str!("script.js"),
    )
}

async fn stylesheet() -> (StatusCode, [(HeaderName, &'static str); 2], &'static [u8]) {
    let bytes = include_bytes!("style.css");
    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, "text/css"),
            (CACHE_CONTROL, "public, max-age=604800, immutable"),
        ],
        bytes,
    )
}

async fn not_found_handler() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html("Not Found".to_string()))
}
