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

//! Client for the vocabulary backend's review endpoints.

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::utf8_percent_encode;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::card::Card;
use crate::types::card::CardId;
use crate::types::rating::Rating;

/// Characters left alone when encoding a path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Deserialize)]
struct RefreshDueResponse {
    success: bool,
    #[serde(default)]
    new_due_cards: Vec<Card>,
}

#[derive(Deserialize)]
struct StatisticsResponse {
    success: bool,
    statistics: Option<Statistics>,
}

#[derive(Deserialize)]
struct Statistics {
    streak: Option<u32>,
}

#[derive(Serialize)]
struct AnswerRequest<'a> {
    session_id: &'a str,
    card_id: CardId,
    difficulty: Rating,
}

pub struct Backend {
    client: Client,
    base: String,
}

impl Backend {
    pub fn new(base: &str) -> Self {
        Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// The cards of a review session.
    pub async fn review_cards(&self, session_id: &str) -> Fallible<Vec<Card>> {
        let url = self.url(&format!("/srs/review/data/{}", segment(session_id)));
        let cards: Vec<Card> = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(cards)
    }

    /// Cards that became due since the session started.
    pub async fn refresh_due(&self, session_id: &str) -> Fallible<Vec<Card>> {
        let url = self.url(&format!(
            "/srs/api/review/refresh-due/{}",
            segment(session_id)
        ));
        let response: RefreshDueResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return fail("backend could not refresh due cards.");
        }
        Ok(response.new_due_cards)
    }

    /// The user's current review streak, in days.
    pub async fn streak(&self) -> Fallible<Option<u32>> {
        let response: StatisticsResponse = self
            .client
            .get(self.url("/srs/api/statistics"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        if !response.success {
            return fail("backend could not compute statistics.");
        }
        Ok(response.statistics.and_then(|s| s.streak))
    }

    pub async fn submit_rating(
        &self,
        session_id: &str,
        card_id: CardId,
        rating: Rating,
    ) -> Fallible<()> {
        let body = AnswerRequest {
            session_id,
            card_id,
            difficulty: rating,
        };
        self.client
            .post(self.url("/srs/api/review/answer"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// The deck overview page, or the deck list when there is no deck.
    pub fn deck_url(&self, deck_id: Option<&str>) -> String {
        match deck_id {
            Some(id) if !id.trim().is_empty() => {
                self.url(&format!("/srs/decks/{}", segment(id.trim())))
            }
            _ => self.url("/srs/decks/"),
        }
    }

    pub fn pronunciation_url(&self, card: &Card) -> String {
        self.url(&format!(
            "/static/media/{}",
            segment(&card.pronunciation_file())
        ))
    }
}

fn segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}
