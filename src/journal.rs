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

//! A local record of finished review sessions.

use std::path::Path;

use rusqlite::Connection;
use rusqlite::Transaction;
use rusqlite::config::DbConfig;
use rusqlite::params;
use serde::Serialize;

use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::review::session::ReviewRecord;
use crate::review::stats::SessionStats;
use crate::types::rating::Rating;
use crate::types::timestamp::Timestamp;

pub struct Journal {
    conn: Connection,
}

/// A session, as written to the journal.
pub struct SessionEntry<'a> {
    pub session_id: &'a str,
    pub started_at: Timestamp,
    pub ended_at: Timestamp,
    /// False if the user left before the session was complete.
    pub completed: bool,
    pub stats: SessionStats,
    pub reviews: &'a [ReviewRecord],
}

#[derive(Serialize, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct History {
    pub session_count: usize,
    pub completed_session_count: usize,
    pub review_count: usize,
    pub ratings: SessionStats,
    pub last_session_ended_at: Option<Timestamp>,
}

impl Journal {
    pub fn open(path: &Path) -> Fallible<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| ErrorReport::new("invalid journal path"))?;
        let mut conn = Connection::open(path)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_ENABLE_FKEY, true)?;
        {
            let tx = conn.transaction()?;
            if !schema_exists(&tx)? {
                tx.execute_batch(include_str!("schema.sql"))?;
                tx.commit()?;
            }
        }
        Ok(Self { conn })
    }

    /// Writes a session and its reviews in one transaction.
    pub fn record_session(&mut self, entry: &SessionEntry<'_>) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "insert into sessions (session_id, started_at, ended_at, completed, again, hard, good, easy) values (?, ?, ?, ?, ?, ?, ?, ?);",
            params![
                entry.session_id,
                entry.started_at,
                entry.ended_at,
                entry.completed,
                to_sql_count(entry.stats.again)?,
                to_sql_count(entry.stats.hard)?,
                to_sql_count(entry.stats.good)?,
                to_sql_count(entry.stats.easy)?,
            ],
        )?;
        let session_row = tx.last_insert_rowid();
        for review in entry.reviews {
            tx.execute(
                "insert into reviews (session_row, card_id, rating, reviewed_at) values (?, ?, ?, ?);",
                params![
                    session_row,
                    review.card_id.into_inner(),
                    review.rating,
                    review.reviewed_at,
                ],
            )?;
        }
        tx.commit()?;
        log::debug!(
            "Journaled session {} with {} reviews.",
            entry.session_id,
            entry.reviews.len()
        );
        Ok(())
    }

    pub fn history(&self) -> Fallible<History> {
        let session_count = self.count("select count(*) from sessions;")?;
        let completed_session_count =
            self.count("select count(*) from sessions where completed = 1;")?;
        let review_count = self.count("select count(*) from reviews;")?;
        let last_session_ended_at: Option<Timestamp> =
            self.conn
                .query_row("select max(ended_at) from sessions;", [], |row| row.get(0))?;
        let mut ratings = SessionStats::default();
        let mut stmt = self
            .conn
            .prepare("select rating, count(*) from reviews group by rating;")?;
        let rows = stmt.query_map([], |row| {
            let rating: Rating = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((rating, count))
        })?;
        for row in rows {
            let (rating, count) = row?;
            let count = from_sql_count(count)?;
            match rating {
                Rating::Again => ratings.again = count,
                Rating::Hard => ratings.hard = count,
                Rating::Good => ratings.good = count,
                Rating::Easy => ratings.easy = count,
            }
        }
        Ok(History {
            session_count,
            completed_session_count,
            review_count,
            ratings,
            last_session_ended_at,
        })
    }
}

impl Journal {
    fn count(&self, sql: &str) -> Fallible<usize> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        from_sql_count(count)
    }
}

/// SQLite integers are signed.
fn to_sql_count(count: usize) -> Fallible<i64> {
    i64::try_from(count).map_err(|_| ErrorReport::new(format!("count {count} is too large.")))
}

fn from_sql_count(count: i64) -> Fallible<usize> {
    usize::try_from(count).map_err(|_| ErrorReport::new(format!("invalid count {count}.")))
}

fn schema_exists(tx: &Transaction) -> Fallible<bool> {
    let sql = "select count(*) from sqlite_master where type='table' AND name=?;";
    let count: i64 = tx.query_row(sql, ["sessions"], |row| row.get(0))?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::types::card::CardId;

    fn record(id: i64, rating: Rating, at: Timestamp) -> ReviewRecord {
        ReviewRecord {
            card_id: CardId::new(id),
            rating,
            reviewed_at: at,
        }
    }

    #[test]
    fn test_count_conversion() {
        assert_eq!(to_sql_count(3), Ok(3));
        assert_eq!(from_sql_count(3), Ok(3));
        assert!(from_sql_count(-1).is_err());
    }

    #[test]
    fn test_empty_history() -> Fallible<()> {
        let dir = tempdir()?;
        let journal = Journal::open(&dir.path().join("journal.db"))?;
        let history = journal.history()?;
        assert_eq!(history.session_count, 0);
        assert_eq!(history.review_count, 0);
        assert_eq!(history.last_session_ended_at, None);
        Ok(())
    }

    #[test]
    fn test_record_and_reopen() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("journal.db");
        let start = Timestamp::now();
        let end = start.plus(Duration::from_secs(300));
        let reviews = vec![
            record(1, Rating::Again, start),
            record(2, Rating::Good, start),
            record(1, Rating::Easy, end),
        ];
        {
            let mut journal = Journal::open(&path)?;
            journal.record_session(&SessionEntry {
                session_id: "abc",
                started_at: start,
                ended_at: end,
                completed: true,
                stats: SessionStats {
                    again: 1,
                    hard: 0,
                    good: 1,
                    easy: 1,
                },
                reviews: &reviews,
            })?;
            journal.record_session(&SessionEntry {
                session_id: "def",
                started_at: start,
                ended_at: start,
                completed: false,
                stats: SessionStats::default(),
                reviews: &[],
            })?;
        }
        // Opening again must not recreate the schema.
        let journal = Journal::open(&path)?;
        let history = journal.history()?;
        assert_eq!(history.session_count, 2);
        assert_eq!(history.completed_session_count, 1);
        assert_eq!(history.review_count, 3);
        assert_eq!(
            history.ratings,
            SessionStats {
                again: 1,
                hard: 0,
                good: 1,
                easy: 1
            }
        );
        assert_eq!(history.last_session_ended_at, Some(end));
        Ok(())
    }
}
