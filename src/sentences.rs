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

//! Splitting a card's example sentences into tagged lines.

use maud::Markup;
use maud::PreEscaped;
use maud::html;

/// Markup that separates sentences, besides newlines.
const BREAKS: [&str; 4] = ["<br>", "<br/>", "<br />", "</p>"];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    /// Lines containing any Cyrillic character are Russian.
    pub fn detect(text: &str) -> Self {
        if text.chars().any(is_cyrillic) {
            Language::Russian
        } else {
            Language::English
        }
    }

    pub fn class(&self) -> &'static str {
        match self {
            Language::English => "example-english",
            Language::Russian => "example-russian",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct ExampleLine {
    pub text: String,
    pub language: Language,
}

impl ExampleLine {
    pub fn html(&self) -> Markup {
        html! {
            p class=(self.language.class()) { (PreEscaped(&self.text)) }
        }
    }
}

fn is_cyrillic(c: char) -> bool {
    ('\u{0400}'..='\u{04FF}').contains(&c)
}

pub fn parse_sentences(sentences: &str) -> Vec<ExampleLine> {
    normalize_breaks(sentences)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ExampleLine {
            text: line.to_string(),
            language: Language::detect(line),
        })
        .collect()
}

/// Replaces break tags with newlines and drops opening paragraph tags. Tags
/// are matched case-insensitively.
fn normalize_breaks(text: &str) -> String {
    // ASCII lowercasing preserves byte offsets, so indices into `lower` are
    // valid in `text`.
    let lower = text.to_ascii_lowercase();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    'outer: while i < text.len() {
        let rest = &lower[i..];
        for tag in BREAKS {
            if rest.starts_with(tag) {
                out.push('\n');
                i += tag.len();
                continue 'outer;
            }
        }
        if rest.starts_with("<p>") {
            i += 3;
            continue;
        }
        let c = match text[i..].chars().next() {
            Some(c) => c,
            None => break,
        };
        out.push(c);
        i += c.len_utf8();
    }
    out
}
