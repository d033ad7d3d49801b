//! The resolution engine.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arbiter_cache::{CacheConfig, CacheKey, ResultCache};
use arbiter_catalog::PermissionCatalog;
use arbiter_core::{
    AggregateResult, EvaluationContext, GrantVerdict, InvalidationTag, PermissionDefinition,
    VerdictFailure,
};
use arbiter_events::{InvalidationBus, SubscriberId};
use futures::future::{join_all, try_join_all};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{Instrument, debug, debug_span, info_span, warn};

use crate::error::{ProviderResult, ResolutionError, ResolutionResult};
use crate::policy::combine;
use crate::provider::{GrantOutcome, GrantRequest};
use crate::registry::{ProviderRegistry, RegisteredProvider};
use crate::trace::{CacheStatus, CheckTrace, MultipleAggregateResult};

/// Default absolute deadline for one check.
pub const DEFAULT_CHECK_DEADLINE: Duration = Duration::from_millis(2000);

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Budget for one check, shared by all of its providers.
    pub check_deadline: Duration,
    /// Cache settings. `None` disables caching.
    pub cache: Option<CacheConfig>,
}

impl EngineOptions {
    /// Set the check deadline.
    #[must_use]
    pub fn with_check_deadline(mut self, deadline: Duration) -> Self {
        self.check_deadline = deadline;
        self
    }

    /// Set the cache config.
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Disable caching.
    #[must_use]
    pub fn without_cache(mut self) -> Self {
        self.cache = None;
        self
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            check_deadline: DEFAULT_CHECK_DEADLINE,
            cache: Some(CacheConfig::default()),
        }
    }
}

/// How one provider task ended.
enum Slot {
    Answered {
        outcome: ProviderResult<GrantOutcome>,
        elapsed: Duration,
    },
    Panicked(String),
    Cancelled,
    TimedOut,
}

/// Aborts every provider task still running when a check returns or is
/// dropped.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Decides permission checks by fanning out to every registered provider
/// and combining their verdicts.
///
/// Cheap to share behind an `Arc`: the catalog and providers are immutable
/// and the cache synchronizes internally.
pub struct ResolutionEngine {
    catalog: Arc<PermissionCatalog>,
    providers: Arc<[RegisteredProvider]>,
    cache: Option<Arc<ResultCache>>,
    check_deadline: Duration,
}

impl ResolutionEngine {
    /// Assemble an engine. Taking the registry by value closes registration.
    #[must_use]
    pub fn new(
        catalog: Arc<PermissionCatalog>,
        registry: ProviderRegistry,
        options: EngineOptions,
    ) -> Self {
        let cache = options.cache.map(|c| Arc::new(ResultCache::new(c)));
        Self::with_shared_cache(catalog, registry, options.check_deadline, cache)
    }

    /// Assemble an engine around an existing cache.
    #[must_use]
    pub fn with_shared_cache(
        catalog: Arc<PermissionCatalog>,
        registry: ProviderRegistry,
        check_deadline: Duration,
        cache: Option<Arc<ResultCache>>,
    ) -> Self {
        let providers: Arc<[RegisteredProvider]> = registry.all().into();
        debug!(
            permissions = catalog.len(),
            providers = providers.len(),
            deadline_ms = millis(check_deadline),
            cache = cache.is_some(),
            "resolution engine ready"
        );
        Self {
            catalog,
            providers,
            cache,
            check_deadline,
        }
    }

    /// Subscribe the engine's cache to `bus`. Returns `None` without a
    /// cache.
    pub fn attach_bus(&self, bus: &InvalidationBus) -> Option<SubscriberId> {
        self.cache.as_ref().map(|cache| cache.attach(bus))
    }

    /// The catalog.
    #[must_use]
    pub fn catalog(&self) -> &Arc<PermissionCatalog> {
        &self.catalog
    }

    /// Registered providers in registration order.
    #[must_use]
    pub fn providers(&self) -> &[RegisteredProvider] {
        &self.providers
    }

    /// The decision cache, if enabled.
    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    /// The per-check deadline.
    #[must_use]
    pub fn check_deadline(&self) -> Duration {
        self.check_deadline
    }

    /// Decide whether `permission` is granted in `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::UnknownPermission`] for names not in the
    /// catalog, and a critical-provider or aggregation error when the
    /// decision cannot be trusted. Errors are never cached.
    pub async fn check(
        &self,
        permission: &str,
        ctx: &EvaluationContext,
    ) -> ResolutionResult<AggregateResult> {
        self.check_traced(permission, ctx).await.map(|t| t.result)
    }

    /// [`check`](Self::check), collapsed to a boolean.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn is_granted(
        &self,
        permission: &str,
        ctx: &EvaluationContext,
    ) -> ResolutionResult<bool> {
        self.check(permission, ctx).await.map(|r| r.granted)
    }

    /// Check several permissions for one context concurrently.
    ///
    /// Results keep input order. The first error fails the whole batch and
    /// cancels the checks still running.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn check_many<I, S>(
        &self,
        permissions: I,
        ctx: &EvaluationContext,
    ) -> ResolutionResult<MultipleAggregateResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = permissions.into_iter().collect();
        let results = try_join_all(names.iter().map(|name| self.check(name.as_ref(), ctx))).await?;
        Ok(MultipleAggregateResult::new(results))
    }

    /// [`check`](Self::check) plus cache status, fingerprint and timing.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub async fn check_traced(
        &self,
        permission: &str,
        ctx: &EvaluationContext,
    ) -> ResolutionResult<CheckTrace> {
        let started = Instant::now();
        let fingerprint = ctx.fingerprint();
        let span = info_span!(
            "permission_check",
            permission,
            fingerprint = %fingerprint,
            user = ctx.user_id.as_deref(),
            tenant = ctx.tenant_id.as_deref(),
        );

        async move {
            let definition = self
                .catalog
                .get(permission)
                .map(Arc::clone)
                .map_err(|_| ResolutionError::UnknownPermission {
                    name: permission.to_owned(),
                })?;

            let key = CacheKey::new(permission, fingerprint);
            if let Some(cache) = &self.cache
                && let Some(result) = cache.lookup(&key)
            {
                debug!(granted = result.granted, "answered from cache");
                return Ok(CheckTrace {
                    result,
                    cache: CacheStatus::Hit,
                    fingerprint,
                    elapsed: started.elapsed(),
                });
            }

            // The ticket must predate the fan-out so that any invalidation
            // landing while providers run rejects the store below.
            let ticket = self
                .cache
                .as_ref()
                .map(|cache| cache.ticket(CacheKey::tags_for(permission, ctx)));

            let verdicts = self.evaluate(definition, ctx).await?;
            let decision = combine(&verdicts);
            let result = AggregateResult::new(permission, decision, verdicts);

            let status = match (&self.cache, ticket) {
                (Some(cache), Some(ticket)) => {
                    if cache.store(key, result.clone(), ticket) {
                        CacheStatus::Miss
                    } else {
                        CacheStatus::StaleStoreRejected
                    }
                },
                _ => CacheStatus::Disabled,
            };

            let elapsed = started.elapsed();
            debug!(
                granted = result.granted,
                decision = %result.decision,
                cache = %status,
                elapsed_ms = millis(elapsed),
                "permission check complete"
            );

            Ok(CheckTrace {
                result,
                cache: status,
                fingerprint,
                elapsed,
            })
        }
        .instrument(span)
        .await
    }

    /// Evict cached decisions carrying `tag`. Returns the number evicted.
    pub fn invalidate(&self, tag: &InvalidationTag) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.invalidate(tag))
    }

    /// Evict every cached decision.
    pub fn invalidate_all(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| cache.clear())
    }

    /// Run every applicable provider concurrently under one deadline.
    async fn evaluate(
        &self,
        definition: Arc<PermissionDefinition>,
        ctx: &EvaluationContext,
    ) -> ResolutionResult<Vec<GrantVerdict>> {
        let applicable: Vec<&RegisteredProvider> = self
            .providers
            .iter()
            .filter(|entry| definition.accepts_provider(entry.name()))
            .collect();
        if applicable.is_empty() {
            return Ok(Vec::new());
        }

        let started = Instant::now();
        let budget_ms = millis(self.check_deadline);
        // A deadline past the end of the clock means no deadline.
        let deadline = tokio::time::Instant::now().checked_add(self.check_deadline);
        let request = GrantRequest::new(definition, Arc::new(ctx.clone()));

        let handles: Vec<JoinHandle<(ProviderResult<GrantOutcome>, Duration)>> = applicable
            .iter()
            .map(|entry| spawn_provider(entry, request.clone()))
            .collect();
        let _guard = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());

        let slots = join_all(handles.into_iter().map(|mut handle| async move {
            let joined = match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, &mut handle).await,
                None => Ok((&mut handle).await),
            };
            match joined {
                Ok(Ok((outcome, elapsed))) => Slot::Answered { outcome, elapsed },
                Ok(Err(e)) if e.is_panic() => Slot::Panicked(panic_message(e)),
                Ok(Err(_)) => Slot::Cancelled,
                Err(_) => {
                    handle.abort();
                    Slot::TimedOut
                },
            }
        }))
        .await;

        collect_verdicts(&applicable, slots, started, budget_ms)
    }
}

/// Pair each slot with its provider, in registration order.
fn collect_verdicts(
    applicable: &[&RegisteredProvider],
    slots: Vec<Slot>,
    started: Instant,
    budget_ms: u64,
) -> ResolutionResult<Vec<GrantVerdict>> {
    if slots.len() != applicable.len() {
        return Err(ResolutionError::AggregationFailure(format!(
            "expected {} verdicts, collected {}",
            applicable.len(),
            slots.len()
        )));
    }

    let mut verdicts = Vec::with_capacity(slots.len());
    for (entry, slot) in applicable.iter().zip(slots) {
        let name = entry.name();
        let verdict = match slot {
            Slot::Answered {
                outcome: Ok(outcome),
                elapsed,
            } => GrantVerdict::new(name, outcome.state)
                .with_provider_key(outcome.provider_key)
                .with_elapsed(elapsed),
            Slot::Answered {
                outcome: Err(e),
                elapsed,
            } => absorb_failure(entry, e.to_string())?.with_elapsed(elapsed),
            Slot::Panicked(message) => {
                absorb_failure(entry, format!("provider panicked: {message}"))?
                    .with_elapsed(started.elapsed())
            },
            Slot::TimedOut => {
                if entry.critical {
                    warn!(provider = name, budget_ms, "critical provider timed out");
                    return Err(ResolutionError::ProviderTimeout {
                        provider: name.to_owned(),
                        budget_ms,
                    });
                }
                warn!(
                    provider = name,
                    budget_ms, "provider timed out, treating as undefined"
                );
                GrantVerdict::failed(name, VerdictFailure::TimedOut { budget_ms })
                    .with_elapsed(started.elapsed())
            },
            Slot::Cancelled => {
                return Err(ResolutionError::AggregationFailure(format!(
                    "provider task {name} was cancelled"
                )));
            },
        };
        verdicts.push(verdict);
    }

    Ok(verdicts)
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("permissions", &self.catalog.len())
            .field("providers", &self.providers)
            .field("cache", &self.cache)
            .field("check_deadline", &self.check_deadline)
            .finish()
    }
}

fn spawn_provider(
    entry: &RegisteredProvider,
    request: GrantRequest,
) -> JoinHandle<(ProviderResult<GrantOutcome>, Duration)> {
    let provider = Arc::clone(&entry.provider);
    let span = debug_span!("grant_provider", provider = entry.name());
    tokio::spawn(
        async move {
            let started = Instant::now();
            let outcome = provider.check(&request).await;
            (outcome, started.elapsed())
        }
        .instrument(span),
    )
}

/// Turn a provider failure into an `Undefined` verdict, or into an error if
/// the provider is critical.
fn absorb_failure(entry: &RegisteredProvider, reason: String) -> ResolutionResult<GrantVerdict> {
    let name = entry.name();
    if entry.critical {
        warn!(provider = name, error = %reason, "critical provider failed");
        return Err(ResolutionError::CriticalProviderFailure {
            provider: name.to_owned(),
            reason,
        });
    }
    warn!(provider = name, error = %reason, "provider failed, treating as undefined");
    Ok(GrantVerdict::failed(name, VerdictFailure::Failed { reason }))
}

fn panic_message(error: JoinError) -> String {
    let payload: Box<dyn Any + Send> = error.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
