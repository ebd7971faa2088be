//! SessionManager - the single owner of settings and lock state.
//!
//! Every consumer (lock screen, lifecycle observer, settings panel) holds an
//! `Arc<SessionManager>` and goes through its methods; nothing else touches
//! the settings store. Mutators apply to memory first and queue the durable
//! write behind it (see [`super::writer`]).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::pin::Pin;
use super::settings::{parse_flag, Settings, SettingsSnapshot, Theme};
use super::throttle::PinThrottle;
use super::writer::{PendingWrite, SettingsWriter};
use crate::error::{Result, SafeKeyError};
use crate::storage::{SettingsKey, SettingsStore};

/// Notifications for UI code that renders lock state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Locked,
    Unlocked,
    SettingsChanged,
}

/// Result of checking a PIN against the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCheck {
    Match,
    /// Wrong PIN. `lockout` is set when this failure started a lockout.
    Mismatch { lockout: Option<Duration> },
    /// Refused without comparing; too many recent failures.
    Throttled { retry_after: Duration },
    /// No PIN has been set up.
    NoPin,
}

struct SessionState {
    settings: Settings,
    is_locked: bool,
    throttle: PinThrottle,
}

pub struct SessionManager {
    state: RwLock<SessionState>,
    store: Arc<dyn SettingsStore>,
    writer: SettingsWriter,
    load_started: AtomicBool,
    /// `true` until `load()` completes.
    loading: watch::Sender<bool>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    /// Create a manager over the given store. Must be called inside a tokio
    /// runtime (the write-through task is spawned here).
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let (loading, _) = watch::channel(true);
        let (events, _) = broadcast::channel(16);

        Self {
            state: RwLock::new(SessionState {
                settings: Settings::default(),
                // Fail closed until load decides
                is_locked: true,
                throttle: PinThrottle::new(),
            }),
            writer: SettingsWriter::spawn(store.clone()),
            store,
            load_started: AtomicBool::new(false),
            loading,
            events,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Load settings from durable storage. Runs once per process; later
    /// calls are ignored.
    ///
    /// Storage failures never abort the load: each key that cannot be read
    /// keeps its default. A PIN that cannot be read or is malformed counts
    /// as "no PIN", which puts the app behind the first-launch setup gate.
    pub async fn load(&self) {
        if self.load_started.swap(true, Ordering::SeqCst) {
            warn!("Settings already loaded; ignoring reload");
            return;
        }

        let theme = match self.read_key(SettingsKey::Theme).await {
            Some(raw) => raw.parse::<Theme>().unwrap_or_else(|e| {
                warn!("Ignoring stored theme: {}", e);
                Theme::default()
            }),
            None => Theme::default(),
        };
        let app_lock_enabled =
            parse_flag(self.read_key(SettingsKey::AppLockEnabled).await.as_deref());
        let biometrics_enabled =
            parse_flag(self.read_key(SettingsKey::BiometricsEnabled).await.as_deref());
        let pin = self
            .read_key(SettingsKey::UserPin)
            .await
            .and_then(|raw| match Pin::parse(&raw) {
                Ok(pin) => Some(pin),
                Err(_) => {
                    warn!("Stored PIN is malformed; treating as not set");
                    None
                }
            });

        {
            let mut state = self.state.write().await;
            state.settings.theme = theme;
            state.settings.biometrics_enabled = biometrics_enabled;

            if pin.is_some() {
                state.settings.app_lock_enabled = app_lock_enabled;
                state.is_locked = app_lock_enabled;
            } else {
                if app_lock_enabled {
                    warn!("App lock flag set without a PIN; disabling until a PIN is created");
                }
                // First launch: force PIN setup before the vault is reachable
                state.settings.app_lock_enabled = false;
                state.is_locked = true;
            }
            state.settings.pin = pin;

            info!(
                "Settings loaded (theme: {}, app lock: {}, biometrics: {}, locked: {})",
                state.settings.theme,
                state.settings.app_lock_enabled,
                state.settings.biometrics_enabled,
                state.is_locked
            );
        }

        self.loading.send_replace(false);
        self.emit(SessionEvent::SettingsChanged);
    }

    async fn read_key(&self, key: SettingsKey) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to load {}: {}", key, e);
                None
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.loading.borrow()
    }

    /// Resolve once `load()` has completed.
    pub async fn wait_until_loaded(&self) {
        let mut rx = self.loading.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|loading| !*loading).await;
    }

    /// Wait for every queued durable write to finish.
    pub async fn flush(&self) -> Result<()> {
        self.writer.barrier().wait().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn snapshot(&self) -> SettingsSnapshot {
        let state = self.state.read().await;
        SettingsSnapshot {
            theme: state.settings.theme,
            app_lock_enabled: state.settings.app_lock_enabled,
            biometrics_enabled: state.settings.biometrics_enabled,
            has_pin: state.settings.pin.is_some(),
            is_locked: state.is_locked,
            is_loading: self.is_loading(),
        }
    }

    pub async fn is_locked(&self) -> bool {
        self.state.read().await.is_locked
    }

    pub async fn has_pin(&self) -> bool {
        self.state.read().await.settings.pin.is_some()
    }

    pub async fn app_lock_enabled(&self) -> bool {
        self.state.read().await.settings.app_lock_enabled
    }

    pub async fn biometrics_enabled(&self) -> bool {
        self.state.read().await.settings.biometrics_enabled
    }

    pub async fn theme(&self) -> Theme {
        self.state.read().await.settings.theme
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    pub async fn set_theme(&self, theme: Theme) -> PendingWrite {
        let pending = {
            let mut state = self.state.write().await;
            state.settings.theme = theme;
            self.writer.set(SettingsKey::Theme, theme.as_str())
        };
        debug!("Theme set to {}", theme);
        self.emit(SessionEvent::SettingsChanged);
        pending
    }

    /// Enable or disable the app lock.
    ///
    /// Enabling requires a PIN (`PinRequired` otherwise, nothing changes).
    /// Disabling also unlocks the session.
    pub async fn set_app_lock_enabled(&self, enabled: bool) -> Result<PendingWrite> {
        let (pending, unlocked) = {
            let mut state = self.state.write().await;
            if enabled && state.settings.pin.is_none() {
                return Err(SafeKeyError::PinRequired);
            }

            state.settings.app_lock_enabled = enabled;
            let unlocked = !enabled && state.is_locked;
            if !enabled {
                state.is_locked = false;
            }
            let pending = self
                .writer
                .set(SettingsKey::AppLockEnabled, enabled.to_string());
            (pending, unlocked)
        };

        info!("App lock {}", if enabled { "enabled" } else { "disabled" });
        self.emit(SessionEvent::SettingsChanged);
        if unlocked {
            self.emit(SessionEvent::Unlocked);
        }
        Ok(pending)
    }

    pub async fn set_biometrics_enabled(&self, enabled: bool) -> PendingWrite {
        let pending = {
            let mut state = self.state.write().await;
            state.settings.biometrics_enabled = enabled;
            self.writer
                .set(SettingsKey::BiometricsEnabled, enabled.to_string())
        };
        debug!("Biometrics set to {}", enabled);
        self.emit(SessionEvent::SettingsChanged);
        pending
    }

    /// Replace or clear the PIN.
    ///
    /// Clearing the PIN while app lock is on also turns app lock off, so the
    /// lock is never enabled without a PIN to open it.
    pub async fn set_pin(&self, pin: Option<Pin>) -> PendingWrite {
        let pending = {
            let mut state = self.state.write().await;
            match pin {
                Some(pin) => {
                    let pending = self.writer.set(SettingsKey::UserPin, pin.as_str());
                    state.settings.pin = Some(pin);
                    state.throttle.reset();
                    info!("PIN updated");
                    pending
                }
                None => {
                    state.settings.pin = None;
                    let mut pending = self.writer.remove(SettingsKey::UserPin);
                    if state.settings.app_lock_enabled {
                        state.settings.app_lock_enabled = false;
                        pending = pending.merge(
                            self.writer.set(SettingsKey::AppLockEnabled, "false"),
                        );
                        info!("PIN cleared; app lock disabled");
                    } else {
                        info!("PIN cleared");
                    }
                    pending
                }
            }
        };
        self.emit(SessionEvent::SettingsChanged);
        pending
    }

    /// Flip the transient lock flag. Never persisted.
    pub async fn set_is_locked(&self, locked: bool) {
        let changed = {
            let mut state = self.state.write().await;
            let changed = state.is_locked != locked;
            state.is_locked = locked;
            changed
        };
        if changed {
            info!("Session {}", if locked { "locked" } else { "unlocked" });
            self.emit(if locked {
                SessionEvent::Locked
            } else {
                SessionEvent::Unlocked
            });
        }
    }

    // =========================================================================
    // PIN verification
    // =========================================================================

    /// Compare `candidate` to the stored PIN, applying the wrong-PIN
    /// throttle. Does not change the lock state.
    pub async fn verify_pin(&self, candidate: &Pin) -> PinCheck {
        let mut state = self.state.write().await;
        let now = Instant::now();

        if let Some(retry_after) = state.throttle.retry_after(now) {
            debug!("PIN attempt refused for another {:?}", retry_after);
            return PinCheck::Throttled { retry_after };
        }

        let matches = match state.settings.pin.as_ref() {
            Some(stored) => stored == candidate,
            None => return PinCheck::NoPin,
        };

        if matches {
            state.throttle.reset();
            PinCheck::Match
        } else {
            let lockout = state.throttle.record_failure(now);
            warn!(
                "Incorrect PIN ({} consecutive failures)",
                state.throttle.failures()
            );
            PinCheck::Mismatch { lockout }
        }
    }

    /// Forget previous wrong PINs after an unlock by other means.
    pub async fn clear_failed_attempts(&self) {
        self.state.write().await.throttle.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemorySettingsStore;
    use crate::test_support::{loaded_session as loaded, FailingStore};

    #[tokio::test]
    async fn test_first_launch_is_locked_for_setup() {
        let (_store, session) = loaded(&[(SettingsKey::AppLockEnabled, "false")]).await;
        let snap = session.snapshot().await;
        assert!(snap.is_locked);
        assert!(!snap.has_pin);
        assert!(!snap.is_loading);

        let (_store, session) = loaded(&[(SettingsKey::AppLockEnabled, "true")]).await;
        let snap = session.snapshot().await;
        assert!(snap.is_locked);
        assert!(!snap.has_pin);
        assert!(!snap.app_lock_enabled);
    }

    #[tokio::test]
    async fn test_load_with_pin_follows_lock_flag() {
        let (_store, session) = loaded(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "true"),
            (SettingsKey::BiometricsEnabled, "true"),
            (SettingsKey::Theme, "dark"),
        ])
        .await;
        let snap = session.snapshot().await;
        assert!(snap.is_locked);
        assert!(snap.app_lock_enabled);
        assert!(snap.biometrics_enabled);
        assert_eq!(snap.theme, Theme::Dark);

        let (_store, session) = loaded(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "false"),
        ])
        .await;
        assert!(!session.is_locked().await);
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back() {
        let (_store, session) = loaded(&[
            (SettingsKey::UserPin, "42x"),
            (SettingsKey::Theme, "neon"),
            (SettingsKey::BiometricsEnabled, "yes"),
        ])
        .await;
        let snap = session.snapshot().await;
        assert!(!snap.has_pin);
        assert!(snap.is_locked);
        assert_eq!(snap.theme, Theme::Light);
        assert!(!snap.biometrics_enabled);
    }

    #[tokio::test]
    async fn test_read_failure_uses_defaults_and_finishes_loading() {
        let session = SessionManager::new(Arc::new(FailingStore::reads()));
        assert!(session.is_loading());
        session.load().await;
        session.wait_until_loaded().await;

        let snap = session.snapshot().await;
        assert!(!snap.is_loading);
        assert!(snap.is_locked);
        assert_eq!(snap.theme, Theme::Light);
        assert!(!snap.app_lock_enabled);
    }

    #[tokio::test]
    async fn test_second_load_is_ignored() {
        let (store, session) = loaded(&[]).await;
        store.set(SettingsKey::Theme, "dark").await.unwrap();
        session.load().await;
        assert_eq!(session.theme().await, Theme::Light);
    }

    #[tokio::test]
    async fn test_wait_until_loaded_resolves_after_load() {
        let store = Arc::new(MemorySettingsStore::new());
        let session = Arc::new(SessionManager::new(store));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                session.wait_until_loaded().await;
                session.is_loading()
            })
        };
        session.load().await;
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_enable_lock_requires_pin() {
        let (store, session) = loaded(&[]).await;
        let err = session.set_app_lock_enabled(true).await.unwrap_err();
        assert!(matches!(err, SafeKeyError::PinRequired));
        assert!(!session.app_lock_enabled().await);
        session.flush().await.unwrap();
        assert_eq!(store.get(SettingsKey::AppLockEnabled).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_disable_lock_unlocks() {
        let (store, session) = loaded(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "true"),
        ])
        .await;
        let mut events = session.subscribe();
        assert!(session.is_locked().await);

        session.set_app_lock_enabled(false).await.unwrap().wait().await.unwrap();

        assert!(!session.is_locked().await);
        assert_eq!(
            store.get(SettingsKey::AppLockEnabled).await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(events.recv().await.unwrap(), SessionEvent::SettingsChanged);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Unlocked);
    }

    #[tokio::test]
    async fn test_set_theme_twice_is_idempotent() {
        let (store, session) = loaded(&[]).await;
        session.set_theme(Theme::Dark).await.wait().await.unwrap();
        let once = store.get(SettingsKey::Theme).await.unwrap();
        session.set_theme(Theme::Dark).await.wait().await.unwrap();
        let twice = store.get(SettingsKey::Theme).await.unwrap();

        assert_eq!(once.as_deref(), Some("dark"));
        assert_eq!(once, twice);
        assert_eq!(session.theme().await, Theme::Dark);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_memory() {
        let store = Arc::new(FailingStore::writes());
        let session = SessionManager::new(store);
        session.load().await;

        let pending = session.set_biometrics_enabled(true).await;
        assert!(session.biometrics_enabled().await);
        assert!(pending.wait().await.is_err());
        assert!(session.biometrics_enabled().await);
    }

    #[tokio::test]
    async fn test_clearing_pin_disables_lock() {
        let (store, session) = loaded(&[
            (SettingsKey::UserPin, "4242"),
            (SettingsKey::AppLockEnabled, "true"),
        ])
        .await;

        session.set_pin(None).await.wait().await.unwrap();

        assert!(!session.has_pin().await);
        assert!(!session.app_lock_enabled().await);
        assert_eq!(store.get(SettingsKey::UserPin).await.unwrap(), None);
        assert_eq!(
            store.get(SettingsKey::AppLockEnabled).await.unwrap().as_deref(),
            Some("false")
        );
    }

    #[tokio::test]
    async fn test_set_is_locked_is_not_persisted() {
        let (store, session) = loaded(&[(SettingsKey::UserPin, "4242")]).await;
        session.set_is_locked(true).await;
        session.flush().await.unwrap();
        assert!(session.is_locked().await);
        assert_eq!(store.get(SettingsKey::AppLockEnabled).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_verify_pin() {
        let (_store, session) = loaded(&[(SettingsKey::UserPin, "4242")]).await;
        let right = Pin::parse("4242").unwrap();
        let wrong = Pin::parse("0000").unwrap();

        assert_eq!(
            session.verify_pin(&wrong).await,
            PinCheck::Mismatch { lockout: None }
        );
        assert_eq!(session.verify_pin(&right).await, PinCheck::Match);

        let (_store, empty) = loaded(&[]).await;
        assert_eq!(empty.verify_pin(&right).await, PinCheck::NoPin);
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_pin_throttles_after_repeated_failures() {
        let (_store, session) = loaded(&[(SettingsKey::UserPin, "4242")]).await;
        let right = Pin::parse("4242").unwrap();
        let wrong = Pin::parse("0000").unwrap();

        for _ in 0..4 {
            assert_eq!(
                session.verify_pin(&wrong).await,
                PinCheck::Mismatch { lockout: None }
            );
        }
        assert_eq!(
            session.verify_pin(&wrong).await,
            PinCheck::Mismatch {
                lockout: Some(Duration::from_secs(30))
            }
        );

        // Even the right PIN is refused during the lockout
        assert!(matches!(
            session.verify_pin(&right).await,
            PinCheck::Throttled { .. }
        ));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(session.verify_pin(&right).await, PinCheck::Match);
        assert_eq!(
            session.verify_pin(&wrong).await,
            PinCheck::Mismatch { lockout: None }
        );
    }
}
