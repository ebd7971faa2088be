//! Desktop implementation.
//!
//! Desktop builds have no access to a fingerprint or face sensor, so every
//! capability query answers "no" and the PIN pad stays the only unlock path.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Error;
use crate::models::*;
use crate::BiometricAuthenticator;

/// Access to biometric APIs on desktop platforms.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopBiometrics;

impl DesktopBiometrics {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BiometricAuthenticator for DesktopBiometrics {
    async fn has_hardware(&self) -> crate::Result<bool> {
        debug!("Desktop build: no biometric hardware");
        Ok(false)
    }

    async fn is_enrolled(&self) -> crate::Result<bool> {
        Ok(false)
    }

    async fn authenticate(&self, _request: &AuthenticateRequest) -> crate::Result<AuthOutcome> {
        Err(Error::NotAvailable(
            "biometric authentication is not supported on desktop".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_desktop_reports_unavailable() {
        let bio = DesktopBiometrics::new();
        let status = bio.check_availability().await.unwrap();
        assert!(!status.is_usable());
        assert!(!status.has_hardware);

        let req = AuthenticateRequest::new("Unlock", "Use PIN");
        assert!(matches!(
            bio.authenticate(&req).await,
            Err(Error::NotAvailable(_))
        ));
    }
}
