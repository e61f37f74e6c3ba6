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

use std::fmt::Display;
use std::fmt::Formatter;

use maud::Markup;
use maud::html;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;

use crate::sentences::parse_sentences;

/// A card's identifier. Unique within a session.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(i64);

impl CardId {
    #[cfg(test)]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> i64 {
        self.0
    }
}

impl Display for CardId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A vocabulary card, as sent by the backend. Cards are never modified
/// locally.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub english_word: String,
    pub russian_word: String,
    /// Example usage, one sentence per line.
    #[serde(default, deserialize_with = "nullable_string")]
    pub sentences: String,
    /// Whether a pronunciation file exists for this card.
    #[serde(default, deserialize_with = "flag")]
    pub get_download: bool,
}

impl Card {
    #[cfg(test)]
    pub fn new(id: i64, english_word: impl Into<String>, russian_word: impl Into<String>) -> Self {
        Self {
            id: CardId::new(id),
            english_word: english_word.into(),
            russian_word: russian_word.into(),
            sentences: String::new(),
            get_download: false,
        }
    }

    #[cfg(test)]
    pub fn with_sentences(mut self, sentences: impl Into<String>) -> Self {
        self.sentences = sentences.into();
        self
    }

    /// The name of the pronunciation file: the lowercased word with
    /// whitespace runs joined by underscores.
    pub fn pronunciation_file(&self) -> String {
        let word = self
            .english_word
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");
        format!("pronunciation_en_{word}.mp3")
    }

    pub fn html_front(&self) -> Markup {
        html! {
            div.word { (self.english_word) }
        }
    }

    pub fn html_back(&self) -> Markup {
        let lines = parse_sentences(&self.sentences);
        html! {
            div.translation { (self.russian_word) }
            @if !lines.is_empty() {
                div.examples {
                    @for line in &lines {
                        (line.html())
                    }
                }
            }
        }
    }
}

fn nullable_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.unwrap_or_default())
}

/// The backend sends flags either as booleans or as 0/1 integers.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
        Null(()),
    }
    let value = Flag::deserialize(deserializer)?;
    Ok(match value {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
        Flag::Null(()) => false,
    })
}
