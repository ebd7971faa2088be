//! Lock screen: PIN setup, PIN unlock and biometric unlock.

pub mod screen;
pub mod stage;

pub use screen::{LockScreen, BIOMETRIC_FALLBACK, BIOMETRIC_PROMPT};
pub use stage::{LockNotice, LockStage};
