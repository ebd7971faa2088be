//! Data types for the biometric boundary.

use serde::{Deserialize, Serialize};

/// Availability of biometric authentication on this device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiometricStatus {
    /// Whether the device has biometric hardware.
    pub has_hardware: bool,
    /// Whether at least one biometric credential is enrolled.
    pub is_enrolled: bool,
    /// Why biometrics cannot be used (if applicable).
    pub unavailable_reason: Option<String>,
}

impl BiometricStatus {
    /// Hardware present and at least one credential enrolled.
    pub fn ready() -> Self {
        Self {
            has_hardware: true,
            is_enrolled: true,
            unavailable_reason: None,
        }
    }

    /// Biometrics cannot be used, with a reason for logs.
    pub fn unavailable(has_hardware: bool, reason: impl Into<String>) -> Self {
        Self {
            has_hardware,
            is_enrolled: false,
            unavailable_reason: Some(reason.into()),
        }
    }

    /// True when an authentication challenge can be shown.
    pub fn is_usable(&self) -> bool {
        self.has_hardware && self.is_enrolled
    }
}

/// Parameters for the system authentication prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticateRequest {
    /// Message shown in the system prompt.
    pub prompt_message: String,
    /// Label of the button that dismisses the prompt in favor of the PIN pad.
    pub fallback_label: String,
}

impl AuthenticateRequest {
    pub fn new(prompt_message: impl Into<String>, fallback_label: impl Into<String>) -> Self {
        Self {
            prompt_message: prompt_message.into(),
            fallback_label: fallback_label.into(),
        }
    }
}

/// Result of a completed authentication challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthOutcome {
    Success,
    Failed,
    /// User dismissed the prompt or chose the fallback.
    Cancelled,
}

impl AuthOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}
