//! The PIN pad state machine.
//!
//! A `LockScreen` is mounted whenever the session is locked and dropped once
//! it reaches [`LockStage::Unlocked`]. Entered digits only live as long as
//! the screen does. All settings changes go through the [`SessionManager`].

use std::sync::Arc;

use safekey_biometric::{AuthenticateRequest, BiometricAuthenticator};
use tracing::{debug, error, info, warn};
use zeroize::{Zeroize, Zeroizing};

use super::stage::{LockNotice, LockStage};
use crate::error::{Result, SafeKeyError};
use crate::session::{Pin, PinCheck, SessionManager, PIN_LENGTH};

/// Message shown in the system biometric prompt.
pub const BIOMETRIC_PROMPT: &str = "Authenticate to unlock SafeKey";
/// Label of the prompt button that falls back to the PIN pad.
pub const BIOMETRIC_FALLBACK: &str = "Use PIN";

pub struct LockScreen {
    session: Arc<SessionManager>,
    biometrics: Arc<dyn BiometricAuthenticator>,
    stage: LockStage,
    entered: Zeroizing<String>,
    /// First-round PIN held while the user confirms it
    confirm_pin: Option<Pin>,
}

impl LockScreen {
    /// Mount the lock screen.
    ///
    /// Starts in setup when no PIN exists, otherwise in unlock entry, where
    /// one biometric attempt fires right away if the user enabled biometrics.
    /// Fails with `NotLoaded` while settings are still loading.
    pub async fn mount(
        session: Arc<SessionManager>,
        biometrics: Arc<dyn BiometricAuthenticator>,
    ) -> Result<Self> {
        if session.is_loading() {
            return Err(SafeKeyError::NotLoaded);
        }

        let stage = if session.has_pin().await {
            LockStage::UnlockEntry
        } else {
            LockStage::SetupFirstEntry
        };
        debug!("Lock screen mounted in {}", stage);

        let mut screen = Self {
            session,
            biometrics,
            stage,
            entered: Zeroizing::new(String::with_capacity(PIN_LENGTH)),
            confirm_pin: None,
        };

        if screen.stage == LockStage::UnlockEntry && screen.session.biometrics_enabled().await {
            screen.biometric_attempt().await;
        }

        Ok(screen)
    }

    pub fn stage(&self) -> LockStage {
        self.stage
    }

    /// Number of digits entered so far (for the dot indicator).
    pub fn entered_len(&self) -> usize {
        self.entered.len()
    }

    pub fn is_setup_mode(&self) -> bool {
        self.stage.is_setup()
    }

    pub fn is_confirming(&self) -> bool {
        self.stage == LockStage::SetupConfirm
    }

    pub fn is_unlocked(&self) -> bool {
        self.stage.is_terminal()
    }

    /// The biometric button is only live while unlocking.
    pub fn biometric_button_enabled(&self) -> bool {
        self.stage == LockStage::UnlockEntry
    }

    pub fn title(&self) -> &'static str {
        match self.stage {
            LockStage::SetupFirstEntry => "Secure Your Vault",
            LockStage::SetupConfirm => "Confirm PIN",
            LockStage::UnlockEntry => "SafeKey Locked",
            LockStage::Unlocked => "SafeKey Unlocked",
        }
    }

    pub fn subtitle(&self) -> &'static str {
        match self.stage {
            LockStage::SetupFirstEntry => "Create a PIN to protect your passwords",
            LockStage::SetupConfirm => "Re-enter your 4-digit PIN",
            LockStage::UnlockEntry => "Enter PIN to unlock your vault",
            LockStage::Unlocked => "",
        }
    }

    /// Append a digit. The fourth digit triggers evaluation for the current
    /// stage; a fifth digit is ignored.
    pub async fn digit_pressed(&mut self, digit: char) -> Result<Option<LockNotice>> {
        if !digit.is_ascii_digit() {
            return Err(SafeKeyError::InvalidInput(format!(
                "Not a digit: {:?}",
                digit
            )));
        }
        if self.stage.is_terminal() || self.entered.len() >= PIN_LENGTH {
            return Ok(None);
        }

        self.entered.push(digit);
        if self.entered.len() < PIN_LENGTH {
            return Ok(None);
        }
        self.evaluate().await
    }

    pub fn delete_pressed(&mut self) {
        if self.stage.is_terminal() {
            return;
        }
        self.entered.pop();
    }

    async fn evaluate(&mut self) -> Result<Option<LockNotice>> {
        let pin = Pin::parse(&self.entered)?;
        self.entered.zeroize();

        match self.stage {
            LockStage::SetupFirstEntry => {
                self.confirm_pin = Some(pin);
                self.stage = LockStage::SetupConfirm;
                Ok(None)
            }
            LockStage::SetupConfirm => {
                let first = self.confirm_pin.take();
                if first.as_ref() == Some(&pin) {
                    let _ = self.session.set_pin(Some(pin)).await;
                    let _ = self.session.set_app_lock_enabled(true).await?;
                    info!("PIN setup complete");
                    self.unlock().await;
                    Ok(None)
                } else {
                    debug!("Setup PINs differ; restarting setup");
                    self.stage = LockStage::SetupFirstEntry;
                    Ok(Some(LockNotice::PinsDoNotMatch))
                }
            }
            LockStage::UnlockEntry => match self.session.verify_pin(&pin).await {
                PinCheck::Match => {
                    self.unlock().await;
                    Ok(None)
                }
                PinCheck::Mismatch { lockout: None } => Ok(Some(LockNotice::IncorrectPin)),
                PinCheck::Mismatch {
                    lockout: Some(retry_after),
                }
                | PinCheck::Throttled { retry_after } => {
                    Ok(Some(LockNotice::TooManyAttempts { retry_after }))
                }
                PinCheck::NoPin => {
                    warn!("PIN was cleared while locked; switching to setup");
                    self.stage = LockStage::SetupFirstEntry;
                    Ok(None)
                }
            },
            LockStage::Unlocked => Ok(None),
        }
    }

    /// Try to unlock with biometrics. Only acts in unlock entry.
    ///
    /// Missing hardware, no enrollment, a failed or cancelled prompt and
    /// platform errors all leave the screen as it was, with nothing shown
    /// to the user. Returns whether the session was unlocked.
    pub async fn biometric_attempt(&mut self) -> bool {
        if self.stage != LockStage::UnlockEntry {
            debug!("Biometric attempt ignored in {}", self.stage);
            return false;
        }

        match self.authenticate_biometric().await {
            Ok(true) => {
                self.session.clear_failed_attempts().await;
                self.unlock().await;
                true
            }
            Ok(false) => false,
            Err(e) => {
                error!("Biometric auth failed: {}", e);
                false
            }
        }
    }

    async fn authenticate_biometric(&self) -> Result<bool> {
        if !self.biometrics.has_hardware().await? {
            debug!("No biometric hardware; using PIN");
            return Ok(false);
        }
        if !self.biometrics.is_enrolled().await? {
            debug!("No biometrics enrolled; using PIN");
            return Ok(false);
        }

        let request = AuthenticateRequest::new(BIOMETRIC_PROMPT, BIOMETRIC_FALLBACK);
        let outcome = self.biometrics.authenticate(&request).await?;
        debug!("Biometric prompt finished: {:?}", outcome);
        Ok(outcome.is_success())
    }

    async fn unlock(&mut self) {
        self.entered.zeroize();
        self.confirm_pin = None;
        self.stage = LockStage::Unlocked;
        self.session.set_is_locked(false).await;
    }
}
