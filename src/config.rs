//! Configuration for books and the feed that owns them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::price::{Locate, Price};

/// What the order index does with entries for orders that have left the book.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexRetention {
    /// Never delete. Memory grows with the number of distinct order ids seen.
    #[default]
    Retain,
    /// Drop the entry when the order is deleted or replaced away.
    EvictOnRemove,
}

/// Per-book parameters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    /// Tick size as an 8-decimal underlying value
    pub tick_size: Price,
    /// Slots per side; also bounds the top-of-book fallback scan
    pub max_levels: usize,
    pub retention: IndexRetention,
}

impl BookConfig {
    /// $0.01 ticks: the feed only expects instruments listed above $1.
    pub const DEFAULT_TICK_SIZE: Price = Price::from_underlying(1_000_000);
    pub const DEFAULT_MAX_LEVELS: usize = 64;

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_size.underlying() <= 0 {
            return Err(ConfigError::Invalid(format!(
                "tick_size must be positive, got {}",
                self.tick_size.underlying()
            )));
        }
        if self.max_levels == 0 {
            return Err(ConfigError::Invalid("max_levels must be non-zero".into()));
        }
        Ok(())
    }
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            tick_size: Self::DEFAULT_TICK_SIZE,
            max_levels: Self::DEFAULT_MAX_LEVELS,
            retention: IndexRetention::Retain,
        }
    }
}

/// Feed configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Applied to every locate without an override
    pub book: BookConfig,
    /// Per-locate overrides
    pub overrides: BTreeMap<Locate, BookConfig>,
    /// Locates whose books are built up front instead of on first message
    pub preallocate: Vec<Locate>,
}

impl FeedConfig {
    /// Load configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: FeedConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.book.validate()?;
        for (locate, book) in &self.overrides {
            book.validate()
                .map_err(|e| ConfigError::Invalid(format!("locate {}: {}", locate, e)))?;
        }
        Ok(())
    }

    /// The book parameters for `locate`.
    #[inline]
    pub fn book_config(&self, locate: Locate) -> &BookConfig {
        self.overrides.get(&locate).unwrap_or(&self.book)
    }
}
