//! # Execution engine: admission, retries, events.
//!
//! [`Engine`] is the crate's front door. One call to [`Engine::execute`]
//! carries a task request end to end:
//!
//! ```text
//!                 ┌----------────────┐
//!   validate ---> │  AdmissionQueue  │ ---> attempt 1..N ---> parsed value
//!                 │  (FIFO, bounded) │        │    ▲
//!                 └----------────────┘        ▼    │
//!                                          backoff sleep
//! ```
//!
//! ## Rules
//! - Validation happens before queueing: an invalid prompt never consumes a
//!   slot or spawns a process.
//! - One admission slot covers the whole request, retries included. The slot
//!   is an RAII guard, so it is released on every exit path.
//! - Fatal errors (validation, cancellation, circuit breaker) stop the loop
//!   immediately; retryable ones (timeout, process failure, parse failure)
//!   consume the attempt budget.
//! - Exhausting the budget converts the last retryable error into the
//!   terminal [`ExecError::Exhausted`].
//! - Backoff sleeps are cancellable: the caller's token is selected against
//!   the sleep.
//! - Every attempt publishes its lifecycle on the event [`Bus`]; subscribers
//!   (the audit writer among them) observe it off the request's hot path.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time;
use tracing::{debug, info, warn};

use crate::core::attempt;
use crate::core::config::EngineConfig;
use crate::core::queue::AdmissionQueue;
use crate::core::registry::ProcessRegistry;
use crate::error::ExecError;
use crate::events::{Bus, Event, EventKind};
use crate::request::{self, ExecOptions};
use crate::subscribers::{AuditWriter, Subscribe};

/// Task-request execution engine.
///
/// Cheap to share behind an `Arc`; all state lives in interior-mutable
/// components (semaphore, registry table, broadcast channel).
pub struct Engine {
    cfg: EngineConfig,
    queue: AdmissionQueue,
    registry: Arc<ProcessRegistry>,
    bus: Bus,
}

impl Engine {
    /// Creates an engine from `cfg` with the built-in subscriber set: the
    /// audit writer when `cfg.audit_dir` is configured, nothing otherwise.
    ///
    /// Must be called inside a tokio runtime (the subscriber listener is a
    /// spawned task).
    pub fn new(cfg: EngineConfig) -> Self {
        Self::with_subscribers(cfg, Vec::new())
    }

    /// Creates an engine with additional subscribers on top of the built-in
    /// set.
    pub fn with_subscribers(cfg: EngineConfig, extra: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let queue = AdmissionQueue::new(cfg.concurrency());
        let registry = ProcessRegistry::new(bus.clone());

        let mut subs = extra;
        if let Some(dir) = &cfg.audit_dir {
            subs.push(Arc::new(AuditWriter::new(dir.clone())) as Arc<dyn Subscribe>);
        }
        spawn_listener(&bus, subs);

        Self {
            cfg,
            queue,
            registry,
            bus,
        }
    }

    /// Runs one task request to completion.
    ///
    /// Resolves the model, waits for an admission slot (FIFO behind earlier
    /// requests), then drives the attempt/backoff loop until a parsed value,
    /// a fatal error or an exhausted budget.
    pub async fn execute(&self, prompt: &str, opts: ExecOptions) -> Result<Value, ExecError> {
        request::validate_prompt(prompt, self.cfg.max_prompt_bytes)?;
        if opts.cancel.is_cancelled() {
            return Err(ExecError::Canceled);
        }

        let _slot = self.queue.acquire(&opts.cancel).await?;

        let model = self.cfg.resolve_model(opts.model.as_deref());
        let timeout = opts.timeout.unwrap_or(self.cfg.timeout);
        let max = self.cfg.attempts();

        let mut attempt_no: u32 = 0;
        loop {
            attempt_no += 1;
            self.bus.publish(
                Event::new(EventKind::ExecStarting)
                    .with_model(model.as_str())
                    .with_attempt(attempt_no),
            );
            debug!(
                target: "promptvisor.engine",
                model = %model, attempt = attempt_no, max, "attempt starting"
            );
            let started = Instant::now();

            let outcome =
                attempt::run_attempt(&self.cfg, &self.registry, &model, prompt, &opts, timeout)
                    .await;
            let elapsed = started.elapsed();

            let err = match outcome {
                Ok(value) => {
                    self.bus.publish(
                        Event::new(EventKind::ExecSucceeded)
                            .with_model(model.as_str())
                            .with_attempt(attempt_no)
                            .with_duration(elapsed),
                    );
                    info!(
                        target: "promptvisor.engine",
                        model = %model, attempt = attempt_no,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "attempt succeeded"
                    );
                    return Ok(value);
                }
                Err(err) => err,
            };

            self.bus.publish(
                Event::new(EventKind::ExecFailed)
                    .with_model(model.as_str())
                    .with_attempt(attempt_no)
                    .with_duration(elapsed)
                    .with_detail(err.to_string()),
            );
            warn!(
                target: "promptvisor.engine",
                model = %model, attempt = attempt_no,
                error = %err, label = err.as_label(),
                "attempt failed"
            );

            if !err.is_retryable() {
                return Err(err);
            }
            if attempt_no >= max {
                return Err(ExecError::Exhausted {
                    attempts: max,
                    last: err.to_string(),
                });
            }

            let delay = self.cfg.backoff.next(attempt_no - 1);
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_model(model.as_str())
                    .with_attempt(attempt_no)
                    .with_delay(delay)
                    .with_detail(err.to_string()),
            );
            debug!(
                target: "promptvisor.engine",
                model = %model, attempt = attempt_no,
                delay_ms = delay.as_millis() as u64,
                "backoff scheduled"
            );

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = opts.cancel.cancelled() => return Err(ExecError::Canceled),
            }
        }
    }

    /// Engine configuration.
    #[inline]
    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Table of live subprocesses, for host shutdown wiring.
    #[inline]
    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    /// Subscribes to the engine's event stream.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Wires registry drain to the host's termination signals. See
    /// [`ProcessRegistry::drain_on_signal`].
    pub fn drain_on_signal(&self) {
        self.registry.drain_on_signal();
    }
}

/// Forwards bus events to subscribers sequentially, off the request path.
/// The task exits when the bus closes (engine dropped).
fn spawn_listener(bus: &Bus, subs: Vec<Arc<dyn Subscribe>>) {
    if subs.is_empty() {
        return;
    }
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    for sub in &subs {
                        sub.on_event(&ev).await;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!(target: "promptvisor.engine", missed, "subscriber listener lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}
