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

use axum::Form;
use axum::Json;
use axum::extract::State;
use axum::response::Redirect;
use serde::Deserialize;
use serde::Serialize;

use crate::audio::AudioEvent;
use crate::audio::AudioState;
use crate::drill::driver::apply_step;
use crate::drill::driver::record_session;
use crate::drill::driver::submit_rating;
use crate::drill::state::MutableState;
use crate::drill::state::ServerState;
use crate::drill::state::Stage;
use crate::drill::state::Timers;
use crate::error::Fallible;
use crate::review::keymap::KeyAction;
use crate::review::keymap::key_action;
use crate::review::session::Step;
use crate::types::rating::Rating;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
pub enum Action {
    Reveal,
    Again,
    Hard,
    Good,
    Easy,
    SkipWait,
    Exit,
}

impl Action {
    pub fn rating(&self) -> Option<Rating> {
        match self {
            Action::Again => Some(Rating::Again),
            Action::Hard => Some(Rating::Hard),
            Action::Good => Some(Rating::Good),
            Action::Easy => Some(Rating::Easy),
            _ => None,
        }
    }
}

impl From<KeyAction> for Action {
    fn from(value: KeyAction) -> Self {
        match value {
            KeyAction::Reveal => Action::Reveal,
            KeyAction::Rate(Rating::Again) => Action::Again,
            KeyAction::Rate(Rating::Hard) => Action::Hard,
            KeyAction::Rate(Rating::Good) => Action::Good,
            KeyAction::Rate(Rating::Easy) => Action::Easy,
        }
    }
}

/// Where the browser goes after an action.
#[derive(PartialEq, Eq, Debug)]
pub enum Outcome {
    Stay,
    Leave(String),
}

#[derive(Deserialize)]
pub struct FormData {
    action: Action,
}

pub async fn post_handler(
    State(state): State<ServerState>,
    Form(form): Form<FormData>,
) -> Redirect {
    redirect(&state, action_handler(&state, form.action))
}

#[derive(Deserialize)]
pub struct KeyData {
    key: String,
    #[serde(default)]
    typing: bool,
}

pub async fn key_handler(State(state): State<ServerState>, Form(form): Form<KeyData>) -> Redirect {
    let face = match &state.lock().stage {
        Stage::Active(session) => session.face(),
        _ => None,
    };
    match key_action(face, &form.key, form.typing) {
        Some(action) => redirect(&state, action_handler(&state, action.into())),
        None => Redirect::to("/"),
    }
}

fn redirect(state: &ServerState, outcome: Fallible<Outcome>) -> Redirect {
    match outcome {
        Ok(Outcome::Stay) => Redirect::to("/"),
        Ok(Outcome::Leave(url)) => Redirect::to(&url),
        Err(e) => {
            log::error!("{e}");
            match state.lock().stage {
                Stage::Exited => Redirect::to(&state.deck_url()),
                _ => Redirect::to("/"),
            }
        }
    }
}

pub fn action_handler(state: &ServerState, action: Action) -> Fallible<Outcome> {
    let mut guard = state.lock();
    let mutable: &mut MutableState = &mut guard;
    let now = state.clock.now();
    if action == Action::Exit {
        log::info!("Leaving the session");
        mutable.timers.cancel_all();
        let unfinished = matches!(&mutable.stage, Stage::Active(session) if !session.is_complete());
        if unfinished {
            record_session(state, mutable, false);
        }
        mutable.stage = Stage::Exited;
        return Ok(Outcome::Leave(state.deck_url()));
    }
    let session = match &mut mutable.stage {
        Stage::Active(session) => session,
        Stage::Empty | Stage::Exited => return Ok(Outcome::Leave(state.deck_url())),
        Stage::Failed(_) => return Ok(Outcome::Stay),
    };
    let step = match action {
        Action::Reveal => {
            session.reveal();
            Step::Unchanged
        }
        Action::SkipWait => {
            Timers::cancel(&mut mutable.timers.countdown);
            session.skip_wait(now)
        }
        _ => {
            let Some(rating) = action.rating() else {
                return Ok(Outcome::Stay);
            };
            let card_id = session.current_card().map(|card| card.id);
            let step = session.rate(rating, now);
            if let (Some(card_id), true) = (card_id, step != Step::Unchanged) {
                submit_rating(state, card_id, rating);
            }
            step
        }
    };
    apply_step(state, mutable, step);
    Ok(Outcome::Stay)
}

#[derive(Deserialize)]
pub struct AudioData {
    event: AudioEvent,
}

#[derive(Serialize, PartialEq, Eq, Debug)]
pub struct AudioView {
    pub state: AudioState,
    pub label: &'static str,
    pub disabled: bool,
    /// Whether the page should start playback.
    pub play: bool,
}

pub async fn audio_handler(
    State(state): State<ServerState>,
    Json(data): Json<AudioData>,
) -> Json<AudioView> {
    Json(audio_event(&state, data.event))
}

pub fn audio_event(state: &ServerState, event: AudioEvent) -> AudioView {
    let mut guard = state.lock();
    let mutable: &mut MutableState = &mut guard;
    // The page may not raise the server's own events.
    let accepted = matches!(
        event,
        AudioEvent::Play | AudioEvent::Started | AudioEvent::Ended | AudioEvent::Failed
    );
    let changed = accepted && mutable.audio.apply(event);
    let play = changed && event == AudioEvent::Play;
    if play {
        let generation = mutable.audio.generation();
        let task_state = state.clone();
        Timers::cancel(&mut mutable.timers.audio);
        let handle = state.scheduler.schedule(
            state.timing.audio_timeout(),
            Box::new(move || {
                let mut mutable = task_state.lock();
                if mutable.audio.time_out(generation) {
                    log::debug!("Pronunciation timed out");
                }
            }),
        );
        mutable.timers.audio = Some(handle);
    } else if mutable.audio.state() == AudioState::Idle {
        Timers::cancel(&mut mutable.timers.audio);
    }
    AudioView {
        state: mutable.audio.state(),
        label: mutable.audio.label(),
        disabled: mutable.audio.disabled(),
        play,
    }
}
