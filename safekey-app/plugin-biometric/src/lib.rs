//! Biometric authentication boundary for SafeKey.
//!
//! The lock screen treats biometrics as an opaque capability: is there a
//! sensor, is anything enrolled, and did the user pass the system prompt.
//! Platform bindings implement [`BiometricAuthenticator`]; this crate ships
//! the desktop implementation, which never offers biometrics.

use async_trait::async_trait;

pub use models::*;

mod desktop;
mod error;
mod models;

pub use desktop::DesktopBiometrics;
pub use error::{Error, Result};

/// Platform biometric service.
#[async_trait]
pub trait BiometricAuthenticator: Send + Sync {
    /// Whether the device has biometric hardware.
    async fn has_hardware(&self) -> Result<bool>;

    /// Whether at least one biometric credential is enrolled.
    async fn is_enrolled(&self) -> Result<bool>;

    /// Show the system prompt and wait for the user.
    async fn authenticate(&self, request: &AuthenticateRequest) -> Result<AuthOutcome>;

    /// Combine the hardware and enrollment queries.
    ///
    /// Enrollment is only queried when hardware is present.
    async fn check_availability(&self) -> Result<BiometricStatus> {
        if !self.has_hardware().await? {
            return Ok(BiometricStatus::unavailable(false, "no biometric hardware"));
        }
        if !self.is_enrolled().await? {
            return Ok(BiometricStatus::unavailable(true, "no biometrics enrolled"));
        }
        Ok(BiometricStatus::ready())
    }
}
