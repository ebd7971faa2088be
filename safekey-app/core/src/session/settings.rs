//! Settings values held by the session manager.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::pin::Pin;
use crate::error::SafeKeyError;

/// UI theme preference.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    /// Follow the OS color scheme.
    System,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = SafeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(SafeKeyError::InvalidInput(format!(
                "Unknown theme: {}",
                other
            ))),
        }
    }
}

/// Persisted settings.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub theme: Theme,
    pub app_lock_enabled: bool,
    pub biometrics_enabled: bool,
    pub pin: Option<Pin>,
}

/// Read-only view of the session handed to UI code.
///
/// Exposes whether a PIN exists, never the PIN itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    pub theme: Theme,
    pub app_lock_enabled: bool,
    pub biometrics_enabled: bool,
    pub has_pin: bool,
    pub is_locked: bool,
    pub is_loading: bool,
}

/// Stored booleans are `"true"`/`"false"`; anything else reads as false.
pub(crate) fn parse_flag(value: Option<&str>) -> bool {
    value == Some("true")
}
