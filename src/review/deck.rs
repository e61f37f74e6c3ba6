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

use crate::types::card::Card;
use crate::types::card::CardId;

/// The session's cards, in presentation order. Cards are only ever appended.
pub struct CardDeck {
    cards: Vec<Card>,
}

impl CardDeck {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn append(&mut self, cards: impl IntoIterator<Item = Card>) {
        self.cards.extend(cards);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.cards.iter().any(|card| card.id == id)
    }

    #[cfg(test)]
    pub fn ids(&self) -> Vec<CardId> {
        self.cards.iter().map(|card| card.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append() {
        let mut deck = CardDeck::new(vec![Card::new(1, "cat", "кошка")]);
        assert_eq!(deck.len(), 1);
        deck.append(vec![Card::new(2, "dog", "собака"), Card::new(1, "cat", "кошка")]);
        assert_eq!(deck.ids(), vec![CardId::new(1), CardId::new(2), CardId::new(1)]);
        assert_eq!(deck.get(1).map(|c| c.english_word.as_str()), Some("dog"));
        assert!(deck.get(3).is_none());
        assert!(deck.contains(CardId::new(2)));
        assert!(!deck.contains(CardId::new(3)));
    }
}
