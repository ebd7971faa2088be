//! Settings and session state for the app lock.
//!
//! [`SessionManager`] is the single writer of settings. It keeps the
//! in-memory copy authoritative and forwards every change to the settings
//! store in the background.

pub mod manager;
pub mod panel;
pub mod pin;
pub mod settings;
pub mod throttle;
pub mod writer;

pub use manager::{PinCheck, SessionEvent, SessionManager};
pub use panel::{PinPurpose, SettingsPanel};
pub use pin::{Pin, PIN_LENGTH};
pub use settings::{Settings, SettingsSnapshot, Theme};
pub use writer::PendingWrite;
