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

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Fallible;
use crate::error::fail;
use crate::review::deck::CardDeck;
use crate::review::requeue::RequeuePolicy;
use crate::review::stats::SessionStats;
use crate::review::stats::Summary;
use crate::types::card::Card;
use crate::types::card::CardId;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

/// Which side of the current card is showing.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Face {
    /// The word is shown, the answer is hidden.
    Front,
    /// The translation and examples are shown.
    Back,
}

/// A short message shown between cards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Notice {
    ReviewingFailed,
    ContinuingReview,
}

impl Notice {
    pub fn message(&self) -> &'static str {
        match self {
            Notice::ReviewingFailed => "Reviewing failed cards…",
            Notice::ContinuingReview => "New cards are due. Continuing review…",
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
pub enum Phase {
    Card(Face),
    Interstitial(Notice),
    /// Every card has been shown, but some "again" cards are not due yet.
    Waiting {
        since: Timestamp,
        until: Timestamp,
    },
    /// Waiting on the last due-card poll before completing.
    Polling,
    Complete(Summary),
}

/// Which poll a batch of due cards came from. Only the final poll can
/// complete the session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Poll {
    Periodic,
    Final,
}

/// What the caller has to do after a transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Step {
    Unchanged,
    ShowCard,
    /// Show the notice, then call `end_interstitial`.
    Interstitial(Notice),
    /// Run the countdown, calling `tick` until it moves on.
    Wait { until: Timestamp },
    /// Poll for due cards and hand the result to `on_due_cards`.
    FinalPoll,
    Complete,
}

#[derive(Clone, PartialEq, Debug)]
pub struct ReviewRecord {
    pub card_id: CardId,
    pub rating: Rating,
    pub reviewed_at: Timestamp,
}

pub struct ReviewSession {
    deck: CardDeck,
    current: usize,
    requeue: RequeuePolicy,
    reviewed_ids: HashSet<CardId>,
    phase: Phase,
    stats: SessionStats,
    history: Vec<ReviewRecord>,
    started_at: Timestamp,
}

impl ReviewSession {
    pub fn new(cards: Vec<Card>, again_delay: Duration, now: Timestamp) -> Fallible<Self> {
        let deck = CardDeck::new(cards);
        if deck.is_empty() {
            return fail("no cards to review.");
        }
        Ok(Self {
            deck,
            current: 0,
            requeue: RequeuePolicy::new(again_delay),
            reviewed_ids: HashSet::new(),
            phase: Phase::Card(Face::Front),
            stats: SessionStats::default(),
            history: Vec::new(),
            started_at: now,
        })
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn face(&self) -> Option<Face> {
        match self.phase {
            Phase::Card(face) => Some(face),
            _ => None,
        }
    }

    /// The card being shown, if any.
    pub fn current_card(&self) -> Option<&Card> {
        match self.phase {
            Phase::Card(_) => self.deck.get(self.current),
            _ => None,
        }
    }

    /// Cards shown so far and the size of the deck.
    pub fn progress(&self) -> (usize, usize) {
        (self.current, self.deck.len())
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &[ReviewRecord] {
        &self.history
    }

    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    pub fn pending_count(&self) -> usize {
        self.requeue.pending().len()
    }

    #[cfg(test)]
    pub fn deck_ids(&self) -> Vec<CardId> {
        self.deck.ids()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, Phase::Complete(_))
    }

    /// Whether leaving now would abandon reviews.
    pub fn is_partway(&self) -> bool {
        !self.history.is_empty() && !self.is_complete()
    }

    /// Flips the current card to its back. Returns false if there was no
    /// card front to flip.
    pub fn reveal(&mut self) -> bool {
        match self.phase {
            Phase::Card(Face::Front) => {
                self.phase = Phase::Card(Face::Back);
                true
            }
            _ => false,
        }
    }

    /// Rates the current card and moves to the next one. Only allowed once
    /// the answer is showing.
    pub fn rate(&mut self, rating: Rating, now: Timestamp) -> Step {
        if self.phase != Phase::Card(Face::Back) {
            log::debug!("Ignoring rating {rating}: answer not revealed.");
            return Step::Unchanged;
        }
        let card = match self.deck.get(self.current) {
            Some(card) => card.clone(),
            None => return Step::Unchanged,
        };
        self.stats.record(rating);
        self.reviewed_ids.insert(card.id);
        self.history.push(ReviewRecord {
            card_id: card.id,
            rating,
            reviewed_at: now,
        });
        match self.requeue.on_rated(&card, rating, now) {
            Some(after) => log::debug!(
                "Card {} rated {rating}, back at {}",
                card.id,
                after.to_rfc3339()
            ),
            None => log::debug!("Card {} rated {rating}", card.id),
        }
        self.current += 1;
        self.advance(now)
    }

    fn advance(&mut self, now: Timestamp) -> Step {
        if self.current < self.deck.len() {
            self.phase = Phase::Card(Face::Front);
            Step::ShowCard
        } else {
            self.process_exhausted(now)
        }
    }

    /// Called once every card in the deck has been shown.
    fn process_exhausted(&mut self, now: Timestamp) -> Step {
        let due = self.requeue.take_due(now);
        if !due.is_empty() {
            log::debug!("{} failed cards are due again.", due.len());
            self.deck.append(due);
            self.phase = Phase::Interstitial(Notice::ReviewingFailed);
            return Step::Interstitial(Notice::ReviewingFailed);
        }
        match self.requeue.soonest() {
            Some(until) => {
                log::debug!("Waiting for failed cards until {}", until.to_rfc3339());
                self.phase = Phase::Waiting { since: now, until };
                Step::Wait { until }
            }
            None => {
                self.phase = Phase::Polling;
                Step::FinalPoll
            }
        }
    }

    pub fn end_interstitial(&mut self, now: Timestamp) -> Step {
        match self.phase {
            Phase::Interstitial(_) => self.advance(now),
            _ => Step::Unchanged,
        }
    }

    /// Countdown tick: moves on once the soonest pending card is due.
    pub fn tick(&mut self, now: Timestamp) -> Step {
        match self.phase {
            Phase::Waiting { until, .. } if now >= until => self.process_exhausted(now),
            _ => Step::Unchanged,
        }
    }

    /// Makes every pending card due immediately.
    pub fn skip_wait(&mut self, now: Timestamp) -> Step {
        match self.phase {
            Phase::Waiting { .. } => {
                self.requeue.force_all_due(now);
                self.process_exhausted(now)
            }
            _ => Step::Unchanged,
        }
    }

    /// Merges cards the backend reports as newly due. Cards already shown or
    /// already queued are skipped.
    pub fn on_due_cards(&mut self, cards: Vec<Card>, poll: Poll) -> Step {
        if self.is_complete() {
            return Step::Unchanged;
        }
        let mut added = 0;
        for card in cards {
            if self.reviewed_ids.contains(&card.id) || self.deck.contains(card.id) {
                continue;
            }
            self.deck.append([card]);
            added += 1;
        }
        if added > 0 {
            log::debug!("{added} new due cards added to the session.");
        }
        match self.phase {
            Phase::Waiting { .. } | Phase::Polling if added > 0 => {
                self.phase = Phase::Interstitial(Notice::ContinuingReview);
                Step::Interstitial(Notice::ContinuingReview)
            }
            Phase::Polling if poll == Poll::Final => {
                self.phase = Phase::Complete(Summary::new(self.stats));
                log::debug!("Session completed");
                Step::Complete
            }
            _ => Step::Unchanged,
        }
    }

    pub fn set_streak(&mut self, streak: u32) {
        if let Phase::Complete(summary) = &mut self.phase {
            summary.streak = Some(streak);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEN_MINUTES: Duration = Duration::from_secs(600);

    fn cards(ids: &[i64]) -> Vec<Card> {
        ids.iter()
            .map(|id| Card::new(*id, format!("word{id}"), format!("слово{id}")))
            .collect()
    }

    fn session(ids: &[i64], now: Timestamp) -> ReviewSession {
        ReviewSession::new(cards(ids), TEN_MINUTES, now).unwrap()
    }

    fn reveal_and_rate(s: &mut ReviewSession, rating: Rating, now: Timestamp) -> Step {
        assert!(s.reveal());
        s.rate(rating, now)
    }

    fn ids(values: &[i64]) -> Vec<CardId> {
        values.iter().map(|id| CardId::new(*id)).collect()
    }

    #[test]
    fn test_empty_session_is_an_error() {
        let result = ReviewSession::new(Vec::new(), TEN_MINUTES, Timestamp::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_starts_on_front() {
        let s = session(&[1, 2], Timestamp::now());
        assert_eq!(s.phase(), &Phase::Card(Face::Front));
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(1)));
        assert_eq!(s.progress(), (0, 2));
        assert!(!s.is_partway());
    }

    #[test]
    fn test_reveal_only_from_front() {
        let mut s = session(&[1], Timestamp::now());
        assert!(s.reveal());
        assert_eq!(s.face(), Some(Face::Back));
        assert!(!s.reveal());
        assert_eq!(s.face(), Some(Face::Back));
    }

    #[test]
    fn test_rating_requires_back() {
        let now = Timestamp::now();
        let mut s = session(&[1, 2], now);
        assert_eq!(s.rate(Rating::Good, now), Step::Unchanged);
        assert_eq!(s.stats().total(), 0);
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(1)));
    }

    #[test]
    fn test_rating_advances() {
        let now = Timestamp::now();
        let mut s = session(&[1, 2], now);
        assert_eq!(reveal_and_rate(&mut s, Rating::Good, now), Step::ShowCard);
        assert_eq!(s.face(), Some(Face::Front));
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(2)));
        assert_eq!(s.progress(), (1, 2));
        assert!(s.is_partway());
    }

    #[test]
    fn test_again_waits_full_delay() {
        let t0 = Timestamp::now();
        let mut s = session(&[1], t0);
        let step = reveal_and_rate(&mut s, Rating::Again, t0);
        assert_eq!(step, Step::Wait {
            until: t0.plus(TEN_MINUTES)
        });
        assert_eq!(s.phase(), &Phase::Waiting {
            since: t0,
            until: t0.plus(TEN_MINUTES)
        });
        assert!(s.current_card().is_none());

        // A tick one second early changes nothing.
        let early = t0.plus(TEN_MINUTES - Duration::from_secs(1));
        assert_eq!(s.tick(early), Step::Unchanged);
        assert_eq!(s.deck_ids(), ids(&[1]));

        let due = t0.plus(TEN_MINUTES);
        assert_eq!(s.tick(due), Step::Interstitial(Notice::ReviewingFailed));
        assert_eq!(s.deck_ids(), ids(&[1, 1]));
        assert_eq!(s.end_interstitial(due), Step::ShowCard);
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(1)));
    }

    #[test]
    fn test_skip_wait() {
        let t0 = Timestamp::now();
        let mut s = session(&[1, 2], t0);
        reveal_and_rate(&mut s, Rating::Again, t0);
        reveal_and_rate(&mut s, Rating::Again, t0);
        assert_eq!(s.pending_count(), 2);
        let t1 = t0.plus(Duration::from_secs(5));
        assert_eq!(s.skip_wait(t1), Step::Interstitial(Notice::ReviewingFailed));
        assert_eq!(s.pending_count(), 0);
        assert_eq!(s.deck_ids(), ids(&[1, 2, 1, 2]));
        // Skipping again outside the wait does nothing.
        assert_eq!(s.skip_wait(t1), Step::Unchanged);
    }

    #[test]
    fn test_completion_requires_final_poll() {
        let now = Timestamp::now();
        let mut s = session(&[1], now);
        assert_eq!(reveal_and_rate(&mut s, Rating::Easy, now), Step::FinalPoll);
        assert_eq!(s.phase(), &Phase::Polling);
        assert!(!s.is_complete());
        assert_eq!(s.on_due_cards(Vec::new(), Poll::Final), Step::Complete);
        match s.phase() {
            Phase::Complete(summary) => {
                assert_eq!(summary.total_reviewed, 1);
                assert_eq!(summary.stats.easy, 1);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_periodic_poll_does_not_complete() {
        let now = Timestamp::now();
        let mut s = session(&[1], now);
        assert_eq!(reveal_and_rate(&mut s, Rating::Good, now), Step::FinalPoll);
        // A periodic poll sent before the deck ran out lands while polling.
        assert_eq!(s.on_due_cards(Vec::new(), Poll::Periodic), Step::Unchanged);
        assert_eq!(s.phase(), &Phase::Polling);
        assert_eq!(s.on_due_cards(Vec::new(), Poll::Final), Step::Complete);
    }

    #[test]
    fn test_final_poll_with_new_cards_continues() {
        let now = Timestamp::now();
        let mut s = session(&[1], now);
        reveal_and_rate(&mut s, Rating::Good, now);
        let step = s.on_due_cards(cards(&[1, 5]), Poll::Final);
        assert_eq!(step, Step::Interstitial(Notice::ContinuingReview));
        assert_eq!(s.deck_ids(), ids(&[1, 5]));
        assert_eq!(s.end_interstitial(now), Step::ShowCard);
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(5)));
    }

    #[test]
    fn test_poller_never_reinjects_reviewed_cards() {
        let now = Timestamp::now();
        let mut s = session(&[1, 2], now);
        reveal_and_rate(&mut s, Rating::Good, now);
        for _ in 0..3 {
            assert_eq!(s.on_due_cards(cards(&[1, 2]), Poll::Periodic), Step::Unchanged);
        }
        assert_eq!(s.deck_ids(), ids(&[1, 2]));
        // Duplicates within one response are only added once.
        s.on_due_cards(cards(&[3, 3]), Poll::Periodic);
        assert_eq!(s.deck_ids(), ids(&[1, 2, 3]));
    }

    #[test]
    fn test_new_cards_during_wait_continue_review() {
        let t0 = Timestamp::now();
        let mut s = session(&[1], t0);
        reveal_and_rate(&mut s, Rating::Again, t0);
        let t1 = t0.plus(Duration::from_secs(60));
        assert_eq!(
            s.on_due_cards(cards(&[9]), Poll::Periodic),
            Step::Interstitial(Notice::ContinuingReview)
        );
        assert_eq!(s.end_interstitial(t1), Step::ShowCard);
        assert_eq!(s.current_card().map(|c| c.id), Some(CardId::new(9)));
        // Card 1 is still pending.
        assert_eq!(s.pending_count(), 1);
    }

    #[test]
    fn test_due_cards_after_completion_are_ignored() {
        let now = Timestamp::now();
        let mut s = session(&[1], now);
        reveal_and_rate(&mut s, Rating::Good, now);
        s.on_due_cards(Vec::new(), Poll::Final);
        assert_eq!(s.on_due_cards(cards(&[7]), Poll::Periodic), Step::Unchanged);
        assert!(s.is_complete());
        assert_eq!(s.deck_ids(), ids(&[1]));
    }

    #[test]
    fn test_streak_only_set_on_completion() {
        let now = Timestamp::now();
        let mut s = session(&[1], now);
        s.set_streak(4);
        reveal_and_rate(&mut s, Rating::Good, now);
        s.on_due_cards(Vec::new(), Poll::Final);
        s.set_streak(4);
        match s.phase() {
            Phase::Complete(summary) => assert_eq!(summary.streak, Some(4)),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn test_again_then_good_scenario() {
        let t0 = Timestamp::now();
        let mut s = session(&[1, 2], t0);
        assert_eq!(reveal_and_rate(&mut s, Rating::Again, t0), Step::ShowCard);
        let t1 = t0.plus(Duration::from_secs(20));
        let step = reveal_and_rate(&mut s, Rating::Good, t1);
        assert_eq!(step, Step::Wait {
            until: t0.plus(TEN_MINUTES)
        });
        assert_eq!(s.deck_ids(), ids(&[1, 2]));
        assert_eq!(
            *s.stats(),
            SessionStats {
                again: 1,
                hard: 0,
                good: 1,
                easy: 0
            }
        );

        // Ten simulated minutes later, card 1 is back.
        let t2 = t0.plus(TEN_MINUTES);
        assert_eq!(s.tick(t2), Step::Interstitial(Notice::ReviewingFailed));
        assert_eq!(s.deck_ids(), ids(&[1, 2, 1]));
        assert_eq!(s.end_interstitial(t2), Step::ShowCard);
        assert!(!s.is_complete());

        assert_eq!(reveal_and_rate(&mut s, Rating::Good, t2), Step::FinalPoll);
        assert!(!s.is_complete());
        assert_eq!(s.on_due_cards(Vec::new(), Poll::Final), Step::Complete);
        assert_eq!(s.stats().total(), 3);
        assert_eq!(s.history().len(), 3);
    }
}
