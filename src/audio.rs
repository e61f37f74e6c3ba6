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

//! The pronunciation button. One audio element is shared by every card; its
//! button goes `Idle -> Loading -> Playing -> Idle`.

use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioState {
    #[default]
    Idle,
    Loading,
    Playing,
}

/// Events reported by the page, plus the two the server raises itself.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEvent {
    /// The button was clicked.
    Play,
    /// The `play()` promise resolved.
    Started,
    Ended,
    /// The `play()` promise rejected, or the media element errored.
    Failed,
    /// The safety timeout fired.
    TimedOut,
    CardChanged,
}

fn transition(state: AudioState, event: AudioEvent) -> AudioState {
    use AudioEvent::*;
    use AudioState::*;
    match (state, event) {
        (_, CardChanged) => Idle,
        (Idle, Play) => Loading,
        (Loading, Started) => Playing,
        (Loading | Playing, Ended | Failed | TimedOut) => Idle,
        (state, _) => state,
    }
}

#[derive(Default)]
pub struct AudioButton {
    state: AudioState,
    /// Bumped on every accepted play, so a timeout armed for an earlier play
    /// cannot cut a later one short.
    generation: u64,
}

impl AudioButton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> AudioState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Applies an event. Returns true if the state changed.
    pub fn apply(&mut self, event: AudioEvent) -> bool {
        let next = transition(self.state, event);
        let new_play = self.state == AudioState::Idle && next == AudioState::Loading;
        if new_play || event == AudioEvent::CardChanged {
            self.generation += 1;
        }
        let changed = next != self.state;
        self.state = next;
        changed
    }

    /// The safety timeout for play number `generation` fired.
    pub fn time_out(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.apply(AudioEvent::TimedOut)
    }

    pub fn label(&self) -> &'static str {
        match self.state {
            AudioState::Idle => "🔊 Listen",
            AudioState::Loading => "Loading…",
            AudioState::Playing => "Playing…",
        }
    }

    pub fn disabled(&self) -> bool {
        self.state != AudioState::Idle
    }
}
