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

use std::fs::read_to_string;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Base URL of the vocabulary backend.
    pub server: String,
    /// Port for the local review server.
    pub port: u16,
    /// Path to the local review journal.
    pub journal: PathBuf,
    /// Whether to open the browser once the server is up.
    pub open_browser: bool,
    pub timing: Timing,
}

/// Delays and periods used by a review session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timing {
    /// How long a card rated "again" waits before it is shown again.
    pub again_delay_minutes: u64,
    pub poll_interval_seconds: u64,
    pub countdown_tick_ms: u64,
    pub reviewing_failed_notice_ms: u64,
    pub continuing_review_notice_ms: u64,
    /// Backstop for audio playback that never reports back.
    pub audio_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: "http://127.0.0.1:5000".to_string(),
            port: 8000,
            journal: PathBuf::from("review-journal.db"),
            open_browser: true,
            timing: Timing::default(),
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            again_delay_minutes: 10,
            poll_interval_seconds: 60,
            countdown_tick_ms: 1000,
            reviewing_failed_notice_ms: 2000,
            continuing_review_notice_ms: 1500,
            audio_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Loads the configuration file, or the defaults if no path is given.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        match path {
            Some(path) => {
                if !path.exists() {
                    return fail(format!(
                        "configuration file {} does not exist.",
                        path.display()
                    ));
                }
                let content = read_to_string(path)?;
                Self::parse(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Fallible<Self> {
        let config: Config = toml::from_str(content)?;
        if config.server.trim().is_empty() {
            return fail("server URL must not be empty.");
        }
        config.timing.validate()?;
        Ok(config)
    }
}

const DAY_MINUTES: u64 = 24 * 60;
const DAY_SECONDS: u64 = DAY_MINUTES * 60;
const TEN_MINUTES_MS: u64 = 10 * 60 * 1000;

fn check_range(name: &str, value: u64, max: u64) -> Fallible<()> {
    if value == 0 || value > max {
        return fail(format!("timing.{name} must be between 1 and {max}, got {value}."));
    }
    Ok(())
}

impl Timing {
    /// Rejects values that are zero or large enough to be a mistake.
    pub fn validate(&self) -> Fallible<()> {
        check_range("again_delay_minutes", self.again_delay_minutes, DAY_MINUTES)?;
        check_range("poll_interval_seconds", self.poll_interval_seconds, DAY_SECONDS)?;
        check_range("countdown_tick_ms", self.countdown_tick_ms, TEN_MINUTES_MS)?;
        check_range(
            "reviewing_failed_notice_ms",
            self.reviewing_failed_notice_ms,
            TEN_MINUTES_MS,
        )?;
        check_range(
            "continuing_review_notice_ms",
            self.continuing_review_notice_ms,
            TEN_MINUTES_MS,
        )?;
        check_range("audio_timeout_ms", self.audio_timeout_ms, TEN_MINUTES_MS)?;
        Ok(())
    }

    pub fn again_delay(&self) -> Duration {
        Duration::from_secs(self.again_delay_minutes.saturating_mul(60))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms)
    }

    pub fn reviewing_failed_notice(&self) -> Duration {
        Duration::from_millis(self.reviewing_failed_notice_ms)
    }

    pub fn continuing_review_notice(&self) -> Duration {
        Duration::from_millis(self.continuing_review_notice_ms)
    }

    pub fn audio_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timing.again_delay(), Duration::from_secs(600));
        assert_eq!(config.timing.poll_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            "server = \"https://words.example\"\n[timing]\nagain_delay_minutes = 5\n",
        )
        .unwrap();
        assert_eq!(config.server, "https://words.example");
        assert_eq!(config.port, 8000);
        assert_eq!(config.timing.again_delay(), Duration::from_secs(300));
        assert_eq!(config.timing.countdown_tick_ms, 1000);
    }

    #[test]
    fn test_unknown_field() {
        let result = Config::parse("colour = \"blue\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_server() {
        let result = Config::parse("server = \" \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_poll_interval() {
        let result = Config::parse("[timing]\npoll_interval_seconds = 0\n");
        assert_eq!(
            result.err().map(|e| e.to_string()),
            Some("error: timing.poll_interval_seconds must be between 1 and 86400, got 0.".to_string())
        );
    }

    #[test]
    fn test_absurd_again_delay() {
        let result = Config::parse("[timing]\nagain_delay_minutes = 18446744073709551615\n");
        assert!(result.is_err());
        let timing = Timing {
            again_delay_minutes: u64::MAX,
            ..Timing::default()
        };
        assert_eq!(timing.again_delay(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_zero_notice() {
        assert!(Config::parse("[timing]\nreviewing_failed_notice_ms = 0\n").is_err());
        assert!(Config::parse("[timing]\naudio_timeout_ms = 600001\n").is_err());
        assert!(Config::parse("[timing]\ncountdown_tick_ms = 250\n").is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = Config::load(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_file() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("review.toml");
        write(&path, "port = 9001\n")?;
        let config = Config::load(Some(&path))?;
        assert_eq!(config.port, 9001);
        Ok(())
    }
}
