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

//! A stand-in for the vocabulary backend, for tests.

use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use axum::routing::post;
use portpicker::pick_unused_port;
use serde_json::Value;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::net::TcpStream;
use tokio::time::sleep;

use crate::error::ErrorReport;
use crate::error::Fallible;

/// Requests for this session id fail with a server error.
pub const BROKEN_SESSION: &str = "broken";

#[derive(Default)]
struct MockData {
    cards: Vec<Value>,
    due: Vec<Value>,
    fail_due: bool,
    streak: Option<u32>,
    answers: Vec<Value>,
    due_polls: usize,
}

type Shared = Arc<Mutex<MockData>>;

#[derive(Clone)]
pub struct MockBackend {
    port: u16,
    data: Shared,
}

impl MockBackend {
    pub async fn start() -> Fallible<Self> {
        let data: Shared = Arc::new(Mutex::new(MockData::default()));
        let app = Router::new()
            .route("/srs/review/data/{session_id}", get(review_data))
            .route(
                "/srs/api/review/refresh-due/{session_id}",
                get(refresh_due),
            )
            .route("/srs/api/statistics", get(statistics))
            .route("/srs/api/review/answer", post(answer))
            .with_state(data.clone());
        let port = free_port()?;
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self { port, data })
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn set_cards(&self, cards: Vec<Value>) {
        self.data.lock().unwrap().cards = cards;
    }

    pub fn set_due(&self, cards: Vec<Value>) {
        self.data.lock().unwrap().due = cards;
    }

    pub fn fail_due(&self) {
        self.data.lock().unwrap().fail_due = true;
    }

    pub fn set_streak(&self, streak: u32) {
        self.data.lock().unwrap().streak = Some(streak);
    }

    pub fn answers(&self) -> Vec<Value> {
        self.data.lock().unwrap().answers.clone()
    }

    pub fn due_polls(&self) -> usize {
        self.data.lock().unwrap().due_polls
    }
}

pub fn card_json(id: i64, english: &str, russian: &str) -> Value {
    json!({
        "id": id,
        "english_word": english,
        "russian_word": russian,
        "sentences": "",
        "get_download": 0,
    })
}

pub fn free_port() -> Fallible<u16> {
    pick_unused_port().ok_or_else(|| ErrorReport::new("no free port"))
}

/// Waits until something listens on the port.
pub async fn wait_for_port(port: u16) {
    loop {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)).await {
            drop(stream);
            break;
        }
        sleep(Duration::from_millis(1)).await;
    }
}

async fn review_data(State(data): State<Shared>, Path(session_id): Path<String>) -> Response {
    if session_id == BROKEN_SESSION {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let cards = data.lock().unwrap().cards.clone();
    Json(cards).into_response()
}

async fn refresh_due(State(data): State<Shared>, Path(_session_id): Path<String>) -> Response {
    let mut data = data.lock().unwrap();
    data.due_polls += 1;
    if data.fail_due {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    Json(json!({ "success": true, "new_due_cards": data.due })).into_response()
}

async fn statistics(State(data): State<Shared>) -> Response {
    match data.lock().unwrap().streak {
        Some(streak) => {
            Json(json!({ "success": true, "statistics": { "streak": streak } })).into_response()
        }
        None => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
    }
}

async fn answer(State(data): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    data.lock().unwrap().answers.push(body);
    Json(json!({ "success": true }))
}
