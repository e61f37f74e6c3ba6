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
use std::sync::MutexGuard;

use crate::audio::AudioButton;
use crate::backend::Backend;
use crate::clock::Clock;
use crate::config::Timing;
use crate::journal::Journal;
use crate::review::session::ReviewSession;
use crate::timer::Scheduler;
use crate::timer::TimerHandle;

#[derive(Clone)]
pub struct ServerState {
    pub session_id: String,
    pub deck_id: Option<String>,
    pub timing: Timing,
    pub backend: Arc<Backend>,
    pub clock: Arc<dyn Clock>,
    pub scheduler: Arc<dyn Scheduler>,
    pub mutable: Arc<Mutex<MutableState>>,
}

pub enum Stage {
    Active(ReviewSession),
    /// The backend had no cards for this session.
    Empty,
    /// The initial fetch failed.
    Failed(String),
    Exited,
}

pub struct MutableState {
    pub stage: Stage,
    pub audio: AudioButton,
    pub timers: Timers,
    pub journal: Journal,
    /// Whether the session has been written to the journal.
    pub journaled: bool,
    /// Whether the completion screen is still waiting on the streak.
    pub streak_pending: bool,
}

/// Handles of the timers currently running. Each slot holds at most one
/// timer.
#[derive(Default)]
pub struct Timers {
    pub poll: Option<TimerHandle>,
    pub countdown: Option<TimerHandle>,
    pub notice: Option<TimerHandle>,
    pub audio: Option<TimerHandle>,
}

impl Timers {
    pub fn cancel(slot: &mut Option<TimerHandle>) {
        if let Some(handle) = slot.take() {
            handle.cancel();
        }
    }

    pub fn cancel_all(&mut self) {
        Self::cancel(&mut self.poll);
        Self::cancel(&mut self.countdown);
        Self::cancel(&mut self.notice);
        Self::cancel(&mut self.audio);
    }
}

impl ServerState {
    pub fn lock(&self) -> MutexGuard<'_, MutableState> {
        // A panic in another handler leaves the state usable.
        self.mutable.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn deck_url(&self) -> String {
        self.backend.deck_url(self.deck_id.as_deref())
    }
}
