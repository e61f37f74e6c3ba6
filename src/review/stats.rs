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

use serde::Serialize;

use crate::types::rating::Rating;

/// Rating counts for the current session.
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, Serialize)]
pub struct SessionStats {
    pub again: usize,
    pub hard: usize,
    pub good: usize,
    pub easy: usize,
}

impl SessionStats {
    pub fn record(&mut self, rating: Rating) {
        match rating {
            Rating::Again => self.again += 1,
            Rating::Hard => self.hard += 1,
            Rating::Good => self.good += 1,
            Rating::Easy => self.easy += 1,
        }
    }

    pub fn count(&self, rating: Rating) -> usize {
        match rating {
            Rating::Again => self.again,
            Rating::Hard => self.hard,
            Rating::Good => self.good,
            Rating::Easy => self.easy,
        }
    }

    pub fn total(&self) -> usize {
        self.again + self.hard + self.good + self.easy
    }

    /// The fraction of ratings that were good or easy.
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.good + self.easy) as f64 / total as f64
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Feedback {
    NeedsMoreReview,
    KeepPracticing,
    GoodProgress,
    WellDone,
}

impl Feedback {
    pub fn for_stats(stats: &SessionStats) -> Self {
        let total = stats.total();
        let success = stats.success_rate();
        if total > 0 && stats.again as f64 / total as f64 > 0.5 {
            Feedback::NeedsMoreReview
        } else if success < 0.4 {
            Feedback::KeepPracticing
        } else if success < 0.7 {
            Feedback::GoodProgress
        } else {
            Feedback::WellDone
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Feedback::NeedsMoreReview => {
                "Many of these words need more review. They will come back soon."
            }
            Feedback::KeepPracticing => "Keep practicing: every review makes the next one easier.",
            Feedback::GoodProgress => "Good progress! You remembered most of these words.",
            Feedback::WellDone => "Well done! You know these words well.",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Feedback::NeedsMoreReview => "🔁",
            Feedback::KeepPracticing => "💪",
            Feedback::GoodProgress => "👍",
            Feedback::WellDone => "🏆",
        }
    }
}

/// What the completion screen shows.
#[derive(Clone, PartialEq, Debug)]
pub struct Summary {
    pub stats: SessionStats,
    pub total_reviewed: usize,
    pub success_rate: f64,
    pub feedback: Feedback,
    /// The user's streak, if the backend could tell us.
    pub streak: Option<u32>,
}

impl Summary {
    pub fn new(stats: SessionStats) -> Self {
        Self {
            stats,
            total_reviewed: stats.total(),
            success_rate: stats.success_rate(),
            feedback: Feedback::for_stats(&stats),
            streak: None,
        }
    }

    pub fn success_percent(&self) -> u32 {
        (self.success_rate * 100.0).round() as u32
    }
}
