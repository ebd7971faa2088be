//! Lock screen stages and the notices shown between them.

use std::time::Duration;

use serde::Serialize;

/// Where the PIN pad is in its flow.
///
/// - `SetupFirstEntry` → `SetupConfirm` (four digits entered)
/// - `SetupConfirm` → `Unlocked` (PINs match) or `SetupFirstEntry` (mismatch)
/// - `UnlockEntry` → `Unlocked` (correct PIN or biometrics)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum LockStage {
    /// No PIN exists yet; the user picks one
    SetupFirstEntry,
    /// Second round of setup, re-entering the chosen PIN
    SetupConfirm,
    /// A PIN exists and the vault is locked
    UnlockEntry,
    /// Terminal; the lock screen goes away
    Unlocked,
}

impl LockStage {
    pub fn is_setup(self) -> bool {
        matches!(self, Self::SetupFirstEntry | Self::SetupConfirm)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Unlocked)
    }
}

impl std::fmt::Display for LockStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetupFirstEntry => write!(f, "SetupFirstEntry"),
            Self::SetupConfirm => write!(f, "SetupConfirm"),
            Self::UnlockEntry => write!(f, "UnlockEntry"),
            Self::Unlocked => write!(f, "Unlocked"),
        }
    }
}

/// User-visible notice raised by a PIN evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockNotice {
    PinsDoNotMatch,
    IncorrectPin,
    TooManyAttempts { retry_after: Duration },
}

impl LockNotice {
    pub fn title(&self) -> &'static str {
        match self {
            Self::PinsDoNotMatch => "PINs do not match",
            Self::IncorrectPin => "Incorrect PIN",
            Self::TooManyAttempts { .. } => "Too many attempts",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::PinsDoNotMatch => "Please try again.".to_string(),
            Self::IncorrectPin => String::new(),
            Self::TooManyAttempts { retry_after } => format!(
                "Try again in {} seconds.",
                retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)
            ),
        }
    }
}

impl std::fmt::Display for LockNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = self.message();
        if message.is_empty() {
            f.write_str(self.title())
        } else {
            write!(f, "{}: {}", self.title(), message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_display() {
        assert_eq!(
            LockNotice::PinsDoNotMatch.to_string(),
            "PINs do not match: Please try again."
        );
        assert_eq!(LockNotice::IncorrectPin.to_string(), "Incorrect PIN");
        let throttled = LockNotice::TooManyAttempts {
            retry_after: Duration::from_millis(29_500),
        };
        assert_eq!(throttled.message(), "Try again in 30 seconds.");
    }
}
