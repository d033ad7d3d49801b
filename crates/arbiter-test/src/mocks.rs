//! Mock implementations for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use arbiter_core::GrantState;
use arbiter_engine::{GrantOutcome, GrantProvider, GrantRequest, ProviderError, ProviderResult};

/// What a [`MockProvider`] does when asked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockBehavior {
    /// Answer with the configured state.
    Answer,
    /// Return [`ProviderError::Backend`] with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

/// A two-sided rendezvous for holding a provider mid-check.
///
/// The provider signals `entered` when a check starts and then waits for
/// `release`. Both use stored permits, so either side may arrive first.
#[derive(Debug, Default)]
pub struct MockGate {
    entered: Notify,
    release: Notify,
}

impl MockGate {
    /// Create a closed gate.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until a check has reached the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one waiting check continue.
    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

/// Scriptable [`GrantProvider`].
///
/// Clones share their call counter and state, so a test can register one
/// clone and keep another to inspect or reconfigure it.
#[derive(Debug, Clone)]
pub struct MockProvider {
    name: String,
    state: Arc<Mutex<GrantState>>,
    per_permission: Arc<Mutex<HashMap<String, GrantState>>>,
    provider_key: Option<String>,
    behavior: MockBehavior,
    delay: Option<Duration>,
    gate: Option<Arc<MockGate>>,
    calls: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a mock that answers `Undefined`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(GrantState::Undefined)),
            per_permission: Arc::new(Mutex::new(HashMap::new())),
            provider_key: None,
            behavior: MockBehavior::Answer,
            delay: None,
            gate: None,
            calls: Arc::new(AtomicUsize::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer `state` for every permission without an override.
    #[must_use]
    pub fn with_state(self, state: GrantState) -> Self {
        self.set_state(state);
        self
    }

    /// Answer `state` for `permission` only.
    #[must_use]
    pub fn with_permission_state(self, permission: impl Into<String>, state: GrantState) -> Self {
        self.set_permission_state(permission, state);
        self
    }

    /// Attach a provider key to every answer.
    #[must_use]
    pub fn with_provider_key(mut self, key: impl Into<String>) -> Self {
        self.provider_key = Some(key.into());
        self
    }

    /// Fail every check with a backend error.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Fail(message.into());
        self
    }

    /// Panic on every check.
    #[must_use]
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.behavior = MockBehavior::Panic(message.into());
        self
    }

    /// Sleep for `delay` before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Stop at `gate` before answering.
    #[must_use]
    pub fn with_gate(mut self, gate: Arc<MockGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Change the default answer.
    pub fn set_state(&self, state: GrantState) {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state;
        }
    }

    /// Change the answer for one permission.
    pub fn set_permission_state(&self, permission: impl Into<String>, state: GrantState) {
        if let Ok(mut guard) = self.per_permission.lock() {
            guard.insert(permission.into(), state);
        }
    }

    /// Number of checks started.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Permissions asked about, in call order.
    #[must_use]
    pub fn seen_permissions(&self) -> Vec<String> {
        self.seen.lock().map(|g| g.clone()).unwrap_or_default()
    }

    fn answer_for(&self, permission: &str) -> GrantState {
        let overridden = self
            .per_permission
            .lock()
            .ok()
            .and_then(|g| g.get(permission).copied());
        overridden.unwrap_or_else(|| {
            self.state
                .lock()
                .map(|g| *g)
                .unwrap_or(GrantState::Undefined)
        })
    }
}

#[async_trait]
impl GrantProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, request: &GrantRequest) -> ProviderResult<GrantOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut guard) = self.seen.lock() {
            guard.push(request.permission_name().to_owned());
        }

        if let Some(gate) = &self.gate {
            gate.pass().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            MockBehavior::Answer => {},
            MockBehavior::Fail(message) => return Err(ProviderError::Backend(message.clone())),
            MockBehavior::Panic(message) => panic!("{message}"),
        }

        let state = self.answer_for(request.permission_name());
        debug!(
            provider = %self.name,
            permission = request.permission_name(),
            %state,
            "mock provider answered"
        );
        Ok(GrantOutcome {
            state,
            provider_key: if state.is_undefined() {
                None
            } else {
                self.provider_key.clone()
            },
        })
    }
}
