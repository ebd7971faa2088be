//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use safekey_biometric::{AuthOutcome, AuthenticateRequest, BiometricAuthenticator};

use crate::error::{Result, SafeKeyError};
use crate::session::SessionManager;
use crate::storage::{MemorySettingsStore, SettingsKey, SettingsStore};

/// A settings store whose reads and/or writes always fail.
pub struct FailingStore {
    fail_reads: bool,
    fail_writes: bool,
    inner: MemorySettingsStore,
}

impl FailingStore {
    pub fn reads() -> Self {
        Self {
            fail_reads: true,
            fail_writes: false,
            inner: MemorySettingsStore::new(),
        }
    }

    pub fn writes() -> Self {
        Self {
            fail_reads: false,
            fail_writes: true,
            inner: MemorySettingsStore::new(),
        }
    }
}

#[async_trait]
impl SettingsStore for FailingStore {
    async fn get(&self, key: SettingsKey) -> Result<Option<String>> {
        if self.fail_reads {
            return Err(SafeKeyError::Storage("disk unavailable".into()));
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: SettingsKey, value: &str) -> Result<()> {
        if self.fail_writes {
            return Err(SafeKeyError::Storage("disk full".into()));
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: SettingsKey) -> Result<()> {
        if self.fail_writes {
            return Err(SafeKeyError::Storage("disk full".into()));
        }
        self.inner.remove(key).await
    }
}

/// Biometric service answering from a script.
pub struct ScriptedBiometrics {
    pub has_hardware: bool,
    pub is_enrolled: bool,
    outcomes: Mutex<VecDeque<safekey_biometric::Result<AuthOutcome>>>,
    prompts: AtomicUsize,
    last_request: Mutex<Option<AuthenticateRequest>>,
}

impl ScriptedBiometrics {
    pub fn ready(outcomes: Vec<safekey_biometric::Result<AuthOutcome>>) -> Self {
        Self {
            has_hardware: true,
            is_enrolled: true,
            outcomes: Mutex::new(outcomes.into()),
            prompts: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub fn without_hardware() -> Self {
        Self {
            has_hardware: false,
            ..Self::ready(Vec::new())
        }
    }

    pub fn not_enrolled() -> Self {
        Self {
            is_enrolled: false,
            ..Self::ready(Vec::new())
        }
    }

    /// How many times the system prompt was shown.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AuthenticateRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl BiometricAuthenticator for ScriptedBiometrics {
    async fn has_hardware(&self) -> safekey_biometric::Result<bool> {
        Ok(self.has_hardware)
    }

    async fn is_enrolled(&self) -> safekey_biometric::Result<bool> {
        Ok(self.is_enrolled)
    }

    async fn authenticate(
        &self,
        request: &AuthenticateRequest,
    ) -> safekey_biometric::Result<AuthOutcome> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(AuthOutcome::Cancelled))
    }
}

/// A loaded session over an in-memory store seeded with `values`.
pub async fn loaded_session(
    values: &[(SettingsKey, &str)],
) -> (Arc<MemorySettingsStore>, Arc<SessionManager>) {
    let store = Arc::new(MemorySettingsStore::with_values(values.iter().copied()));
    let session = Arc::new(SessionManager::new(store.clone()));
    session.load().await;
    (store, session)
}
