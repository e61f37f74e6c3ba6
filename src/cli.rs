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

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::history::print_history;
use crate::config::Config;
use crate::drill::server::ReviewOptions;
use crate::drill::server::start_server;
use crate::error::Fallible;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Review the cards of a session in the browser.
    Review {
        /// The backend's id for the review session.
        #[arg(long)]
        session: String,
        /// The deck to return to when the session ends.
        #[arg(long)]
        deck: Option<String>,
        /// Base URL of the vocabulary backend.
        #[arg(long)]
        server: Option<String>,
        /// Port for the local review server.
        #[arg(long)]
        port: Option<u16>,
        /// Path to a TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Path to the review journal.
        #[arg(long)]
        journal: Option<PathBuf>,
        /// Don't open the browser.
        #[arg(long)]
        no_open: bool,
    },
    /// Print a summary of past sessions as JSON.
    History {
        /// Path to the review journal.
        #[arg(long)]
        journal: Option<PathBuf>,
        /// Path to a TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub async fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Review {
            session,
            deck,
            server,
            port,
            config,
            journal,
            no_open,
        } => {
            let mut config = Config::load(config.as_deref())?;
            if let Some(server) = server {
                config.server = server;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(journal) = journal {
                config.journal = journal;
            }
            if no_open {
                config.open_browser = false;
            }
            let options = ReviewOptions {
                session_id: session,
                deck_id: deck,
                config,
            };
            start_server(options).await
        }
        Command::History { journal, config } => {
            let config = Config::load(config.as_deref())?;
            let journal = journal.unwrap_or(config.journal);
            print_history(&journal)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        Command::command().debug_assert();
    }

    #[test]
    fn test_parse_review() {
        let cli = Command::try_parse_from([
            "lexicards-review",
            "review",
            "--session",
            "abc",
            "--deck",
            "7",
            "--no-open",
        ]);
        match cli {
            Ok(Command::Review {
                session,
                deck,
                no_open,
                port,
                ..
            }) => {
                assert_eq!(session, "abc");
                assert_eq!(deck.as_deref(), Some("7"));
                assert!(no_open);
                assert_eq!(port, None);
            }
            _ => panic!("expected the review command"),
        }
    }

    #[test]
    fn test_review_requires_session() {
        assert!(Command::try_parse_from(["lexicards-review", "review"]).is_err());
    }
}
