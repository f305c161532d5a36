//! # Process registry - table of live external-tool processes.
//!
//! The registry is the resource-safety net: every spawned subprocess is
//! registered before any I/O happens, so a host shutdown can reach it even
//! if the engine's own logic is stuck. It does not interact with retry
//! logic.
//!
//! ## Rules
//! - `register` returns an RAII [`ProcessGuard`]; its drop unregisters the
//!   entry. Removing an already-removed entry is a no-op, which makes
//!   cleanup idempotent.
//! - `drain_all` cancels every entry's kill token (the attempt loop responds
//!   by killing its child) and, on Unix, additionally sends SIGKILL by pid
//!   in case the owning task is no longer being polled.
//! - `drain_on_signal` wires `drain_all` to SIGINT/SIGTERM/SIGQUIT/Ctrl-C.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::shutdown;
use crate::events::{Bus, Event, EventKind};

/// One live subprocess entry.
struct Entry {
    pid: Option<u32>,
    kill: CancellationToken,
}

/// Process-wide table of in-flight subprocess handles.
pub struct ProcessRegistry {
    entries: Mutex<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    bus: Bus,
}

/// Registration handle for one subprocess.
///
/// Holds the kill token the owning attempt must observe; dropping the guard
/// unregisters the entry (idempotently).
pub struct ProcessGuard {
    id: u64,
    kill: CancellationToken,
    registry: Arc<ProcessRegistry>,
}

impl ProcessGuard {
    /// Token cancelled when the registry drains. The owning attempt selects
    /// on it alongside the caller's cancellation token.
    pub fn kill_token(&self) -> &CancellationToken {
        &self.kill
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        // HashMap::remove of an absent id is a no-op; double-cleanup cannot
        // error.
        if let Ok(mut entries) = self.registry.entries.lock() {
            entries.remove(&self.id);
        }
    }
}

impl ProcessRegistry {
    /// Creates an empty registry publishing drain events to `bus`.
    pub fn new(bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            bus,
        })
    }

    /// Registers a freshly spawned process. Must be called before any data
    /// is written to or read from the child.
    pub fn register(self: &Arc<Self>, pid: Option<u32>) -> ProcessGuard {
        let id = self.next_id.fetch_add(1, AtomicOrdering::Relaxed);
        let kill = CancellationToken::new();

        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                id,
                Entry {
                    pid,
                    kill: kill.clone(),
                },
            );
        }
        debug!(target: "promptvisor.registry", id, ?pid, "registered");

        ProcessGuard {
            id,
            kill,
            registry: Arc::clone(self),
        }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Returns true if no process is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forcefully terminates every live process and empties the table.
    ///
    /// Safe to call multiple times and concurrently with normal attempt
    /// cleanup; entries drained here are gone before the owning guards drop.
    ///
    /// The raw-pid SIGKILL is a backstop only: a pid whose process already
    /// exited and was reaped may have been reused by the OS, so each pid is
    /// probed with signal 0 first and skipped when no longer live. The
    /// reap-to-unregister window is the owning attempt's return path, which
    /// holds no suspension points, so the residual reuse race is confined to
    /// that sliver.
    pub fn drain_all(&self) {
        let drained: Vec<Entry> = {
            let Ok(mut entries) = self.entries.lock() else {
                return;
            };
            entries.drain().map(|(_, e)| e).collect()
        };
        if drained.is_empty() {
            return;
        }

        self.bus.publish(
            Event::new(EventKind::DrainRequested).with_detail(format!("live={}", drained.len())),
        );
        debug!(target: "promptvisor.registry", count = drained.len(), "draining");

        for entry in drained {
            entry.kill.cancel();
            #[cfg(unix)]
            if let Some(pid) = entry.pid.filter(|p| *p > 0) {
                // Backstop for attempts that are no longer polled; the
                // normal path is the kill token above. Probe with signal 0
                // first so a reaped (possibly reused) pid is never signalled.
                let pid = pid as libc::pid_t;
                unsafe {
                    if libc::kill(pid, 0) == 0 {
                        libc::kill(pid, libc::SIGKILL);
                    }
                }
            }
        }
    }

    /// Spawns a background task that drains the registry when the host
    /// receives a termination signal.
    ///
    /// Call once during application start; pair it with an explicit
    /// `drain_all()` in the host's own shutdown sequence for non-signal
    /// exits.
    pub fn drain_on_signal(self: &Arc<Self>) {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            if shutdown::wait_for_shutdown_signal().await.is_ok() {
                me.drain_all();
            }
        });
    }
}
