//! # Single attempt: process execution and circuit breaker.
//!
//! Runs exactly one subprocess execution for a task request. One attempt:
//! 1. Spawns the tool with non-interactive args/env and piped stdio.
//! 2. Registers the child in the [`ProcessRegistry`] before any I/O.
//! 3. Writes the prompt to stdin and closes it (EPIPE is swallowed).
//! 4. Pumps stdout/stderr chunks through an mpsc channel into an
//!    [`OutputSink`], checking the per-stream byte ceiling on every chunk.
//! 5. Maps the exit status to an outcome and hands stdout to the parser.
//!
//! ## Rules
//! - Exactly one terminal outcome per attempt: the `select!` loop returns at
//!   most once, and every early return kills the child first.
//! - Cancellation (caller token or registry drain) wins any race against a
//!   completion already in flight: both selects (chunk capture and the exit
//!   wait) are biased toward the cancellation arms.
//! - The deadline and the tokens also guard the exit wait, so a tool that
//!   closes its pipes but keeps running cannot escape the wall-clock budget.
//! - Cleanup is idempotent: unregistration is the registry guard's drop,
//!   pipe teardown is the child's drop, and `kill_on_drop` covers the path
//!   where the whole future is dropped mid-flight.
//! - A breached byte ceiling is fatal for the whole request (circuit
//!   breaker), not just this attempt.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time;
use tracing::{debug, trace};

use crate::core::config::EngineConfig;
use crate::core::registry::ProcessRegistry;
use crate::error::ExecError;
use crate::parse;
use crate::request::ExecOptions;

/// Which stream a captured chunk came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StreamKind {
    Stdout,
    Stderr,
}

/// Accumulating buffer + byte counter per stream, with a hard ceiling.
///
/// The ceiling check is a plain comparison on every pushed chunk; there is
/// no listener bookkeeping to leak across attempts.
struct OutputSink {
    cap: usize,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

/// Marker for a breached ceiling.
struct CapExceeded;

impl OutputSink {
    fn new(cap: usize) -> Self {
        Self {
            cap,
            stdout: Vec::new(),
            stderr: Vec::new(),
        }
    }

    fn push(&mut self, kind: StreamKind, chunk: &[u8]) -> Result<(), CapExceeded> {
        let buf = match kind {
            StreamKind::Stdout => &mut self.stdout,
            StreamKind::Stderr => &mut self.stderr,
        };
        if buf.len() + chunk.len() > self.cap {
            return Err(CapExceeded);
        }
        buf.extend_from_slice(chunk);
        Ok(())
    }

    fn into_strings(self) -> (String, String) {
        (
            String::from_utf8_lossy(&self.stdout).into_owned(),
            String::from_utf8_lossy(&self.stderr).into_owned(),
        )
    }
}

/// Executes one attempt: spawn, capture, classify.
///
/// `model` has already been resolved against the allow-list; `timeout` is
/// the per-attempt wall-clock budget.
pub(crate) async fn run_attempt(
    cfg: &EngineConfig,
    registry: &Arc<ProcessRegistry>,
    model: &str,
    prompt: &str,
    opts: &ExecOptions,
    timeout: Duration,
) -> Result<Value, ExecError> {
    if opts.cancel.is_cancelled() {
        return Err(ExecError::Canceled);
    }

    let mut cmd = Command::new(&cfg.program);
    cmd.args(&cfg.base_args);
    if let Some(flag) = &cfg.model_flag {
        cmd.arg(flag).arg(model);
    }
    // Force non-interactive, plain-text operation.
    cmd.env("NO_COLOR", "1").env("CI", "true").env("TERM", "dumb");
    if let Some(dir) = &opts.working_dir {
        cmd.current_dir(dir);
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    trace!(target: "promptvisor.attempt", program = %cfg.program, model, "spawn");
    let mut child = cmd.spawn().map_err(|e| ExecError::Fail {
        reason: format!("spawn: {e}"),
    })?;

    // Register before any I/O so an external drain can always reach the
    // process.
    let guard = registry.register(child.id());

    if let Some(mut stdin) = child.stdin.take() {
        let payload = prompt.as_bytes().to_vec();
        tokio::spawn(async move {
            // EPIPE from a fast-exiting tool is not an attempt failure.
            let _ = stdin.write_all(&payload).await;
            let _ = stdin.shutdown().await;
        });
    }

    let (tx, mut rx) = mpsc::channel::<(StreamKind, Vec<u8>)>(32);
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(pump(stdout, StreamKind::Stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(pump(stderr, StreamKind::Stderr, tx.clone()));
    }
    drop(tx);

    let mut sink = OutputSink::new(cfg.max_capture_bytes);
    let deadline = time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            // Cancellation wins any race against a completion in flight.
            biased;

            _ = opts.cancel.cancelled() => {
                debug!(target: "promptvisor.attempt", "cancelled; killing child");
                kill(&mut child).await;
                return Err(ExecError::Canceled);
            }
            _ = guard.kill_token().cancelled() => {
                debug!(target: "promptvisor.attempt", "drained; killing child");
                kill(&mut child).await;
                return Err(ExecError::Canceled);
            }
            _ = &mut deadline => {
                debug!(target: "promptvisor.attempt", ?timeout, "timeout; killing child");
                kill(&mut child).await;
                return Err(ExecError::Timeout { timeout });
            }
            chunk = rx.recv() => match chunk {
                Some((kind, bytes)) => {
                    if sink.push(kind, &bytes).is_err() {
                        debug!(
                            target: "promptvisor.attempt",
                            limit = cfg.max_capture_bytes,
                            "output ceiling breached; killing child"
                        );
                        kill(&mut child).await;
                        return Err(ExecError::CircuitBreaker {
                            limit: cfg.max_capture_bytes,
                        });
                    }
                }
                // Both pumps hit EOF: the process has closed its pipes.
                None => break,
            },
        }
    }

    // A tool may close its pipes and keep running; the wait is guarded by
    // the same deadline and tokens as the capture loop.
    let status = tokio::select! {
        biased;

        _ = opts.cancel.cancelled() => {
            debug!(target: "promptvisor.attempt", "cancelled during wait; killing child");
            kill(&mut child).await;
            return Err(ExecError::Canceled);
        }
        _ = guard.kill_token().cancelled() => {
            debug!(target: "promptvisor.attempt", "drained during wait; killing child");
            kill(&mut child).await;
            return Err(ExecError::Canceled);
        }
        _ = &mut deadline => {
            debug!(target: "promptvisor.attempt", ?timeout, "timeout during wait; killing child");
            kill(&mut child).await;
            return Err(ExecError::Timeout { timeout });
        }
        status = child.wait() => status.map_err(|e| ExecError::Fail {
            reason: format!("wait: {e}"),
        })?,
    };
    let (stdout, stderr) = sink.into_strings();

    match status.code() {
        Some(code) if code != 0 => {
            let reason = stderr.trim();
            let reason = if reason.is_empty() {
                format!("tool exited with code {code}")
            } else {
                reason.to_string()
            };
            Err(ExecError::Fail { reason })
        }
        // Zero exit, or signal-kill not initiated by this attempt: the
        // captured output decides.
        _ => parse::parse(&stdout, opts.shape).ok_or(ExecError::Parse),
    }
}

/// Reads a stream to EOF, forwarding chunks to the attempt loop. Exits when
/// the stream closes or the attempt has already returned (receiver dropped).
async fn pump(
    mut reader: impl AsyncRead + Unpin + Send + 'static,
    kind: StreamKind,
    tx: mpsc::Sender<(StreamKind, Vec<u8>)>,
) {
    let mut buf = vec![0u8; 8 * 1024];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if tx.send((kind, buf[..n].to_vec())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// SIGTERM first on Unix, then the runtime's kill (SIGKILL) and reap.
async fn kill(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    let _ = child.kill().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Bus;
    use crate::parse::ExpectedShape;

    fn sh_config(script: &str) -> EngineConfig {
        EngineConfig {
            program: "sh".to_string(),
            base_args: vec!["-c".to_string(), script.to_string()],
            model_flag: None,
            ..EngineConfig::default()
        }
    }

    fn registry() -> Arc<ProcessRegistry> {
        ProcessRegistry::new(Bus::new(16))
    }

    #[tokio::test]
    async fn clean_exit_parses_stdout() {
        let cfg = sh_config("cat >/dev/null; echo '{\"a\":1}'");
        let opts = ExecOptions::default();
        let reg = registry();

        let value = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!({"a": 1}));
        assert!(reg.is_empty(), "guard must unregister on success");
    }

    #[tokio::test]
    async fn prompt_reaches_the_tool() {
        // The tool echoes its stdin back; the prompt round-trips as JSON.
        let cfg = sh_config("cat");
        let opts = ExecOptions::default().with_shape(ExpectedShape::JsonArray);
        let reg = registry();

        let value = run_attempt(&cfg, &reg, "sonnet", "[4,5]", &opts, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!([4, 5]));
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let cfg = sh_config("cat >/dev/null; echo boom >&2; exit 3");
        let opts = ExecOptions::default();
        let reg = registry();

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            ExecError::Fail { reason } => assert_eq!(reason, "boom"),
            other => panic!("expected Fail, got {other:?}"),
        }
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn non_zero_exit_with_silent_stderr_gets_generic_message() {
        let cfg = sh_config("cat >/dev/null; exit 7");
        let opts = ExecOptions::default();
        let reg = registry();

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            ExecError::Fail { reason } => assert_eq!(reason, "tool exited with code 7"),
            other => panic!("expected Fail, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_output_is_a_parse_failure() {
        let cfg = sh_config("cat >/dev/null; echo 'no json here'");
        let opts = ExecOptions::default();
        let reg = registry();

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Parse));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn ceiling_breach_trips_the_circuit_breaker() {
        let cfg = EngineConfig {
            max_capture_bytes: 1024,
            ..sh_config("cat >/dev/null; head -c 65536 /dev/zero | tr '\\0' 'a'; sleep 5")
        };
        let opts = ExecOptions::default();
        let reg = registry();

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        match err {
            ExecError::CircuitBreaker { limit } => assert_eq!(limit, 1024),
            other => panic!("expected CircuitBreaker, got {other:?}"),
        }
        assert!(!err.is_retryable());
        assert!(reg.is_empty(), "guard must unregister after kill");
    }

    #[tokio::test]
    async fn timeout_kills_and_is_retryable() {
        let cfg = sh_config("sleep 30");
        let opts = ExecOptions::default();
        let reg = registry();

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(err.is_retryable());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn timeout_applies_after_pipes_close() {
        // The tool closes stdout/stderr and lingers; the exit wait must stay
        // under the deadline.
        let cfg = sh_config("cat >/dev/null; exec 1>&- 2>&-; sleep 30");
        let opts = ExecOptions::default();
        let reg = registry();

        let started = std::time::Instant::now();
        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Timeout { .. }));
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "exit wait escaped the deadline: {:?}",
            started.elapsed()
        );
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn cancellation_applies_after_pipes_close() {
        let cfg = sh_config("cat >/dev/null; exec 1>&- 2>&-; sleep 30");
        let opts = ExecOptions::default();
        let reg = registry();

        let cancel = opts.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        });

        let started = std::time::Instant::now();
        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Canceled));
        assert!(
            started.elapsed() < Duration::from_secs(5),
            "exit wait escaped the cancellation token: {:?}",
            started.elapsed()
        );
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn cancellation_kills_and_is_fatal() {
        let cfg = sh_config("sleep 30");
        let opts = ExecOptions::default();
        let reg = registry();

        let cancel = opts.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Canceled));
        assert!(!err.is_retryable());
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn registry_drain_reaches_a_running_attempt() {
        let cfg = sh_config("sleep 30");
        let opts = ExecOptions::default();
        let reg = registry();

        let drain_reg = reg.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drain_reg.drain_all();
        });

        let err = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Canceled));
        assert!(reg.is_empty());
    }

    #[tokio::test]
    async fn tool_that_never_reads_stdin_does_not_fail_the_attempt() {
        // EPIPE on the prompt write is swallowed; the output still counts.
        let cfg = sh_config("exec </dev/null; echo '[1]'");
        let opts = ExecOptions::default().with_shape(ExpectedShape::JsonArray);
        let reg = registry();

        let value = run_attempt(&cfg, &reg, "sonnet", "hi", &opts, Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(value, serde_json::json!([1]));
    }

    #[test]
    fn sink_counts_per_stream() {
        let mut sink = OutputSink::new(8);
        assert!(sink.push(StreamKind::Stdout, b"12345678").is_ok());
        // Stderr has its own counter.
        assert!(sink.push(StreamKind::Stderr, b"12345678").is_ok());
        // One more byte on stdout breaches the ceiling.
        assert!(sink.push(StreamKind::Stdout, b"9").is_err());
    }
}
