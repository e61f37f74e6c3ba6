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

//! Carries out what session transitions ask for: timers, polls, rating
//! submission and completion.

use crate::audio::AudioEvent;
use crate::drill::state::MutableState;
use crate::drill::state::ServerState;
use crate::drill::state::Stage;
use crate::drill::state::Timers;
use crate::journal::SessionEntry;
use crate::review::session::Notice;
use crate::review::session::Poll;
use crate::review::session::ReviewSession;
use crate::review::session::Step;
use crate::types::card::CardId;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

pub fn apply_step(state: &ServerState, mutable: &mut MutableState, step: Step) {
    // The countdown only runs while waiting.
    match step {
        Step::Unchanged | Step::Wait { .. } => {}
        _ => Timers::cancel(&mut mutable.timers.countdown),
    }
    match step {
        Step::Unchanged => {}
        Step::ShowCard => reset_audio(mutable),
        Step::Interstitial(notice) => {
            let delay = match notice {
                Notice::ReviewingFailed => state.timing.reviewing_failed_notice(),
                Notice::ContinuingReview => state.timing.continuing_review_notice(),
            };
            Timers::cancel(&mut mutable.timers.notice);
            let task_state = state.clone();
            let handle = state.scheduler.schedule(
                delay,
                Box::new(move || {
                    with_session(&task_state, |session, now| session.end_interstitial(now))
                }),
            );
            mutable.timers.notice = Some(handle);
        }
        Step::Wait { until } => {
            if mutable.timers.countdown.is_none() {
                log::debug!("Starting countdown until {}", until.to_rfc3339());
                let task_state = state.clone();
                let handle = state.scheduler.schedule_repeating(
                    state.timing.countdown_tick(),
                    Box::new(move || with_session(&task_state, |session, now| session.tick(now))),
                );
                mutable.timers.countdown = Some(handle);
            }
        }
        Step::FinalPoll => {
            tokio::spawn(poll_due_cards(state.clone(), Poll::Final));
        }
        Step::Complete => complete(state, mutable),
    }
}

/// Puts the pronunciation button back to idle. A new page has a fresh audio
/// element, so whatever the old one was doing is gone.
pub fn reset_audio(mutable: &mut MutableState) {
    mutable.audio.apply(AudioEvent::CardChanged);
    Timers::cancel(&mut mutable.timers.audio);
}

/// Runs a transition on the active session, if there is one, and applies
/// its step.
fn with_session(state: &ServerState, f: impl FnOnce(&mut ReviewSession, Timestamp) -> Step) {
    let mut guard = state.lock();
    let mutable: &mut MutableState = &mut guard;
    let now = state.clock.now();
    let step = match &mut mutable.stage {
        Stage::Active(session) => f(session, now),
        _ => return,
    };
    apply_step(state, mutable, step);
}

/// Starts the periodic due-card poll.
pub fn start_polling(state: &ServerState, mutable: &mut MutableState) {
    Timers::cancel(&mut mutable.timers.poll);
    let task_state = state.clone();
    let handle = state.scheduler.schedule_repeating(
        state.timing.poll_interval(),
        Box::new(move || {
            tokio::spawn(poll_due_cards(task_state.clone(), Poll::Periodic));
        }),
    );
    mutable.timers.poll = Some(handle);
}

/// Asks the backend for newly due cards. A failed poll counts as "no new
/// cards", so the session can still complete.
pub async fn poll_due_cards(state: ServerState, poll: Poll) {
    let cards = match state.backend.refresh_due(&state.session_id).await {
        Ok(cards) => cards,
        Err(e) => {
            log::warn!("Due-card poll failed: {e}");
            Vec::new()
        }
    };
    log::debug!("{poll:?} poll returned {} cards.", cards.len());
    with_session(&state, move |session, _| session.on_due_cards(cards, poll));
}

pub fn submit_rating(state: &ServerState, card_id: CardId, rating: Rating) {
    let state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = state
            .backend
            .submit_rating(&state.session_id, card_id, rating)
            .await
        {
            log::warn!("Could not submit rating for card {card_id}: {e}");
        }
    });
}

fn complete(state: &ServerState, mutable: &mut MutableState) {
    log::info!("Session completed");
    Timers::cancel(&mut mutable.timers.poll);
    Timers::cancel(&mut mutable.timers.notice);
    record_session(state, mutable, true);
    mutable.streak_pending = true;
    let state = state.clone();
    tokio::spawn(async move {
        let streak = match state.backend.streak().await {
            Ok(streak) => streak,
            Err(e) => {
                log::warn!("Could not fetch streak: {e}");
                None
            }
        };
        let mut guard = state.lock();
        let mutable: &mut MutableState = &mut guard;
        mutable.streak_pending = false;
        if let (Some(streak), Stage::Active(session)) = (streak, &mut mutable.stage) {
            session.set_streak(streak);
        }
    });
}

/// Writes the session to the journal, once.
pub fn record_session(state: &ServerState, mutable: &mut MutableState, completed: bool) {
    if mutable.journaled {
        return;
    }
    let Stage::Active(session) = &mutable.stage else {
        return;
    };
    let entry = SessionEntry {
        session_id: &state.session_id,
        started_at: session.started_at(),
        ended_at: state.clock.now(),
        completed,
        stats: *session.stats(),
        reviews: session.history(),
    };
    match mutable.journal.record_session(&entry) {
        Ok(()) => mutable.journaled = true,
        Err(e) => log::error!("Could not journal session: {e}"),
    }
}
