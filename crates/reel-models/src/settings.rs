//! Automation settings and publish visibility.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default cron expression for scheduled runs (every six hours).
pub const DEFAULT_AUTO_SCHEDULE: &str = "0 0 */6 * * *";

/// Settings read by the scheduler before each automatic run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunSettings {
    /// Whether scheduled runs are enabled
    pub auto_enabled: bool,
    /// Cron expression (5 or 6 fields)
    pub auto_schedule: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            auto_enabled: false,
            auto_schedule: DEFAULT_AUTO_SCHEDULE.to_string(),
        }
    }
}

/// Visibility of a published video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Unlisted,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Unlisted => "unlisted",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown visibility: {0}")]
pub struct VisibilityParseError(pub String);

impl FromStr for Visibility {
    type Err = VisibilityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "unlisted" => Ok(Visibility::Unlisted),
            "private" => Ok(Visibility::Private),
            other => Err(VisibilityParseError(other.to_string())),
        }
    }
}
