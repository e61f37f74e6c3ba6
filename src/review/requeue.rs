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

use crate::types::card::Card;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// A card rated "again", waiting to re-enter the deck.
#[derive(Clone, Debug)]
pub struct PendingCard {
    pub card: Card,
    pub review_after: Timestamp,
}

/// Decides which rated cards come back later in the session, and when.
pub struct RequeuePolicy {
    delay: Duration,
    pending: Vec<PendingCard>,
}

impl RequeuePolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    /// Requeues the card if it was rated "again", returning the time it
    /// becomes due. Other ratings drop the card: the backend schedules it for
    /// a later day.
    pub fn on_rated(&mut self, card: &Card, rating: Rating, now: Timestamp) -> Option<Timestamp> {
        match rating {
            Rating::Again => {
                let review_after = now.plus(self.delay);
                self.pending.push(PendingCard {
                    card: card.clone(),
                    review_after,
                });
                Some(review_after)
            }
            Rating::Hard | Rating::Good | Rating::Easy => None,
        }
    }

    /// Removes and returns the cards that are due at `now`, in the order they
    /// were rated.
    pub fn take_due(&mut self, now: Timestamp) -> Vec<Card> {
        let (due, waiting): (Vec<PendingCard>, Vec<PendingCard>) = self
            .pending
            .drain(..)
            .partition(|pending| pending.review_after <= now);
        self.pending = waiting;
        due.into_iter().map(|pending| pending.card).collect()
    }

    /// When the next pending card becomes due.
    pub fn soonest(&self) -> Option<Timestamp> {
        self.pending.iter().map(|pending| pending.review_after).min()
    }

    /// Makes every pending card due at `now`.
    pub fn force_all_due(&mut self, now: Timestamp) {
        for pending in self.pending.iter_mut() {
            pending.review_after = now;
        }
    }

    pub fn pending(&self) -> &[PendingCard] {
        &self.pending
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
