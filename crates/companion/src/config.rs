//! Configuration for the companion engine.

use std::env;
use std::path::PathBuf;

/// Default location of the companion cards file.
pub const DEFAULT_CARDS_PATH: &str = "./data/companion_cards.json";

/// Configuration for [`CompanionService`](crate::CompanionService).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanionConfig {
    /// Process-wide switch. When false reflections and nudges are no-ops.
    pub enabled: bool,
    /// Optional JSON file with templates, sparks and blind spots.
    pub cards_path: PathBuf,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cards_path: PathBuf::from(DEFAULT_CARDS_PATH),
        }
    }
}

impl CompanionConfig {
    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `COMPANION_MODE` (`off` disables the companion; default: on)
    /// - `COMPANION_CARDS_PATH` (default: ./data/companion_cards.json)
    pub fn from_env() -> Self {
        let enabled = env::var("COMPANION_MODE")
            .map(|mode| mode_enabled(&mode))
            .unwrap_or(true);
        let cards_path = env::var("COMPANION_CARDS_PATH")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CARDS_PATH));

        Self {
            enabled,
            cards_path,
        }
    }

    /// Builder method to set the process switch.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the cards path.
    pub fn with_cards_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cards_path = path.into();
        self
    }
}

fn mode_enabled(mode: &str) -> bool {
    !mode.trim().eq_ignore_ascii_case("off")
}
