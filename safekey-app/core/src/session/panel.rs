//! Operations behind the settings screen.

use std::sync::Arc;

use tracing::{info, warn};

use super::manager::SessionManager;
use super::pin::Pin;
use super::settings::Theme;
use crate::error::{Result, SafeKeyError};
use crate::storage::AccountStore;

/// Why the PIN dialog was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinPurpose {
    /// First PIN from the settings screen; also turns the app lock on.
    Set,
    /// Replace an existing PIN.
    Change,
}

pub struct SettingsPanel {
    session: Arc<SessionManager>,
    accounts: Arc<AccountStore>,
}

impl SettingsPanel {
    pub fn new(session: Arc<SessionManager>, accounts: Arc<AccountStore>) -> Self {
        Self { session, accounts }
    }

    /// Flip the app-lock switch. Turning it on without a PIN fails with
    /// `PinRequired` and leaves the switch off.
    pub async fn toggle_app_lock(&self, enabled: bool) -> Result<()> {
        match self.session.set_app_lock_enabled(enabled).await {
            Ok(_pending) => Ok(()),
            Err(e) => {
                warn!("App lock toggle rejected: {}", e);
                Err(e)
            }
        }
    }

    /// Validate and store a PIN typed into the settings dialog.
    ///
    /// Returns the confirmation message to show.
    pub async fn submit_pin(&self, purpose: PinPurpose, input: &str) -> Result<&'static str> {
        let pin = Pin::parse(input.trim())?;

        match purpose {
            PinPurpose::Set => {
                let _ = self.session.set_pin(Some(pin)).await;
                self.session.set_app_lock_enabled(true).await?;
                Ok("PIN set successfully.")
            }
            PinPurpose::Change => {
                if !self.session.has_pin().await {
                    return Err(SafeKeyError::PinRequired);
                }
                let _ = self.session.set_pin(Some(pin)).await;
                Ok("PIN updated successfully.")
            }
        }
    }

    pub async fn set_theme(&self, theme: Theme) {
        let _ = self.session.set_theme(theme).await;
    }

    pub async fn set_biometrics(&self, enabled: bool) {
        let _ = self.session.set_biometrics_enabled(enabled).await;
    }

    /// Delete every saved account. Settings and PIN are kept.
    pub async fn clear_all_data(&self) -> Result<usize> {
        let removed = self.accounts.delete_all().await?;
        info!("All data has been cleared");
        Ok(removed)
    }
}
