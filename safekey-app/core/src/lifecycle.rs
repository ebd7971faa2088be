//! Re-locking on app backgrounding.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SafeKeyError;
use crate::session::SessionManager;

/// Application visibility as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppLifecycle {
    Active,
    Background,
    /// Transitional (app switcher, incoming call). Not acted on.
    Inactive,
}

impl fmt::Display for AppLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Background => write!(f, "background"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for AppLifecycle {
    type Err = SafeKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "background" => Ok(Self::Background),
            "inactive" => Ok(Self::Inactive),
            other => Err(SafeKeyError::InvalidInput(format!(
                "Unknown lifecycle state: {}",
                other
            ))),
        }
    }
}

#[derive(Clone)]
pub struct LifecycleObserver {
    session: Arc<SessionManager>,
}

impl LifecycleObserver {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// React to one transition. Returns whether the session was re-locked.
    ///
    /// Only `Background` with app lock enabled locks; returning to the
    /// foreground never unlocks.
    pub async fn on_transition(&self, next: AppLifecycle) -> bool {
        if self.session.is_loading() {
            debug!("Ignoring {} transition while settings load", next);
            return false;
        }

        match next {
            AppLifecycle::Background if self.session.app_lock_enabled().await => {
                info!("App moved to background; locking");
                self.session.set_is_locked(true).await;
                true
            }
            _ => {
                debug!("App lifecycle: {}", next);
                false
            }
        }
    }

    /// Listen to lifecycle signals until the subscription is dropped or the
    /// channel closes.
    pub fn subscribe(self, mut rx: broadcast::Receiver<AppLifecycle>) -> LifecycleSubscription {
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(next) => {
                        self.on_transition(next).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Lifecycle observer skipped {} transitions", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Lifecycle observer stopped");
        });
        LifecycleSubscription { handle }
    }
}

/// Live lifecycle listener. Dropping it stops the listener.
pub struct LifecycleSubscription {
    handle: JoinHandle<()>,
}

impl LifecycleSubscription {
    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for LifecycleSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
