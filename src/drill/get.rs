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

use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Html;
use axum::response::IntoResponse;
use axum::response::Redirect;
use axum::response::Response;
use maud::Markup;
use maud::html;

use crate::audio::AudioButton;
use crate::drill::driver::reset_audio;
use crate::drill::state::MutableState;
use crate::drill::state::ServerState;
use crate::drill::state::Stage;
use crate::drill::template::page_template;
use crate::review::session::Face;
use crate::review::session::Phase;
use crate::review::session::ReviewSession;
use crate::review::stats::Summary;
use crate::types::card::Card;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

pub async fn get_handler(State(state): State<ServerState>) -> Response {
    let mut guard = state.lock();
    let mutable: &mut MutableState = &mut guard;
    let now = state.clock.now();
    let showing_card = matches!(&mutable.stage, Stage::Active(session) if session.face().is_some());
    if showing_card {
        // Loading the page drops the old audio element mid-playback.
        reset_audio(mutable);
    }
    match &mutable.stage {
        Stage::Empty | Stage::Exited => Redirect::to(&state.deck_url()).into_response(),
        Stage::Failed(message) => page(render_failure(&state, message), false),
        Stage::Active(session) => {
            let body = match session.phase() {
                Phase::Card(face) => render_card(&state, session, *face, &mutable.audio),
                Phase::Interstitial(notice) => render_notice(session, notice.message()),
                Phase::Waiting { since, until } => render_wait(session, *since, *until, now),
                Phase::Polling => render_notice(session, "Checking for newly due cards…"),
                Phase::Complete(summary) => render_completion(&state, summary),
            };
            let refresh = match session.phase() {
                Phase::Card(_) => false,
                Phase::Complete(_) => mutable.streak_pending,
                _ => true,
            };
            page(body, refresh)
        }
    }
}

fn page(body: Markup, refresh: bool) -> Response {
    let html = page_template(body, refresh);
    (StatusCode::OK, Html(html.into_string())).into_response()
}

fn render_failure(state: &ServerState, message: &str) -> Markup {
    html! {
        div.root {
            div.error {
                h1 { "Could not load this review session" }
                p.message { (message) }
                a.back-link href=(state.deck_url()) { "Return to deck" }
            }
        }
    }
}

fn render_card(state: &ServerState, session: &ReviewSession, face: Face, audio: &AudioButton) -> Markup {
    let Some(card) = session.current_card() else {
        return html! {};
    };
    let (done, total) = session.progress();
    let percent = if total == 0 { 100 } else { (done * 100) / total };
    let progress_style = format!("width: {percent}%;");
    html! {
        div.root {
            div.card {
                div.header {
                    div.progress-label {
                        (format!("{done} / {total}"))
                    }
                    div.progress-bar {
                        div.progress-fill style=(progress_style) {}
                    }
                }
                div.content {
                    div.front {
                        (card.html_front())
                        @if card.get_download {
                            (render_audio(state, card, audio))
                        }
                    }
                    @if face == Face::Back {
                        div.back {
                            (card.html_back())
                        }
                    }
                }
                div.controls {
                    form action="/" method="post" {
                        @match face {
                            Face::Front => {
                                button id="reveal" type="submit" name="action" value="Reveal" title="Show the answer. Shortcut: space or enter." {
                                    "Show answer"
                                }
                            }
                            Face::Back => {
                                div.grades {
                                    @for rating in Rating::ALL {
                                        (render_rating(rating))
                                    }
                                }
                            }
                        }
                        div.spacer {}
                        (exit_button(session))
                    }
                }
            }
        }
    }
}

fn render_rating(rating: Rating) -> Markup {
    let [digit, letter] = rating.shortcuts();
    let title = format!("Shortcut: {digit} or {letter}.");
    html! {
        button id=(rating.as_str()) type="submit" name="action" value=(rating.label()) data-difficulty=(rating.as_str()) title=(title) {
            (rating.label())
        }
    }
}

fn render_audio(state: &ServerState, card: &Card, audio: &AudioButton) -> Markup {
    html! {
        div.audio {
            button id="play-audio" type="button" disabled[audio.disabled()] {
                (audio.label())
            }
            audio id="pronunciation" preload="auto" src=(state.backend.pronunciation_url(card)) {}
        }
    }
}

/// Leaving asks for confirmation once something has been reviewed.
fn exit_button(session: &ReviewSession) -> Markup {
    let confirm = if session.is_partway() {
        Some("Leave this review session? Your progress so far is kept.")
    } else {
        None
    };
    html! {
        button id="exit" type="submit" name="action" value="Exit" data-confirm=[confirm] {
            "Exit"
        }
    }
}

fn render_notice(session: &ReviewSession, text: &str) -> Markup {
    html! {
        div.root {
            div.notice {
                p { (text) }
                form action="/" method="post" {
                    (exit_button(session))
                }
            }
        }
    }
}

fn render_wait(session: &ReviewSession, since: Timestamp, until: Timestamp, now: Timestamp) -> Markup {
    let remaining = now.until(until);
    let window = since.until(until).as_secs_f64();
    let elapsed = if window > 0.0 {
        (1.0 - remaining.as_secs_f64() / window).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let progress_style = format!("width: {}%;", (elapsed * 100.0).round());
    let pending = session.pending_count();
    let noun = if pending == 1 { "card" } else { "cards" };
    html! {
        div.root {
            div.waiting {
                h1 { "Waiting for failed cards" }
                p {
                    (format!("{pending} {noun} will come back in {}.", format_remaining(remaining)))
                }
                div.progress-bar {
                    div.progress-fill style=(progress_style) {}
                }
                form action="/" method="post" {
                    button id="skip-wait" type="submit" name="action" value="SkipWait" {
                        "Review now"
                    }
                    (exit_button(session))
                }
            }
        }
    }
}

/// Formats a duration as `m:ss`, rounding up to the next second.
fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn render_completion(state: &ServerState, summary: &Summary) -> Markup {
    html! {
        div.root {
            div.finished {
                div.icon { (summary.feedback.icon()) }
                h1 { "Session Completed" }
                p.feedback { (summary.feedback.message()) }
                table.stats {
                    tr {
                        th { "Reviewed" }
                        td id="total-reviewed" { (summary.total_reviewed) }
                    }
                    @for rating in Rating::ALL {
                        tr {
                            th { (rating.label()) }
                            td id=(format!("stat-{}", rating.as_str())) { (summary.stats.count(rating)) }
                        }
                    }
                    tr {
                        th { "Success rate" }
                        td id="success-rate" { (format!("{}%", summary.success_percent())) }
                    }
                    @if let Some(streak) = summary.streak {
                        tr {
                            th { "Streak" }
                            td id="streak" { (format!("{streak} days")) }
                        }
                    }
                }
                a.back-link href=(state.deck_url()) { "Back to deck" }
            }
        }
    }
}
