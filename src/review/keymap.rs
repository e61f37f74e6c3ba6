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

//! Keyboard shortcuts. Which keys do anything depends on the face of the
//! current card.

use crate::review::session::Face;
use crate::types::rating::Rating;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum KeyAction {
    Reveal,
    Rate(Rating),
}

/// Maps a key press to an action. `face` is `None` when no card is shown.
/// Keys typed into a text input never trigger anything.
pub fn key_action(face: Option<Face>, key: &str, typing: bool) -> Option<KeyAction> {
    if typing {
        return None;
    }
    match face? {
        Face::Front => match key {
            " " | "Space" | "Spacebar" | "Enter" => Some(KeyAction::Reveal),
            _ => None,
        },
        Face::Back => {
            let mut chars = key.chars();
            let c = chars.next()?.to_ascii_lowercase();
            if chars.next().is_some() {
                return None;
            }
            Rating::ALL
                .into_iter()
                .find(|rating| rating.shortcuts().contains(&c))
                .map(KeyAction::Rate)
        }
    }
}
