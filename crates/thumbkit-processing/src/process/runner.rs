//! Process runner trait and the tokio-backed implementation

use async_trait::async_trait;
use bytes::Bytes;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thumbkit_core::{ThumbError, ThumbResult};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::command::ExternalCommand;

const STDERR_TAIL_BYTES: usize = 512;

/// Runs external commands and returns their stdout.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run `command` to completion.
    ///
    /// Succeeds only when the process exits with status 0 and wrote at least
    /// one byte to stdout, unless the command allows empty output.
    async fn run(&self, command: &ExternalCommand, cancel: &CancellationToken)
        -> ThumbResult<Bytes>;
}

/// Spawns commands with `tokio::process`, bounded by a timeout.
///
/// On unix every child leads its own process group. When the timeout expires
/// or the token is cancelled the whole group is killed, so helpers forked by
/// wrapper programs (`soffice` starting `soffice.bin`) go down with it.
/// Dropping the returned future kills the direct child.
#[derive(Debug, Clone)]
pub struct TokioProcessRunner {
    timeout: Duration,
}

impl TokioProcessRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    #[tracing::instrument(skip(self, command, cancel), fields(program = %command.program, label = %command.label))]
    async fn run(
        &self,
        command: &ExternalCommand,
        cancel: &CancellationToken,
    ) -> ThumbResult<Bytes> {
        if cancel.is_cancelled() {
            return Err(ThumbError::Cancelled);
        }

        let start = Instant::now();
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(if command.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ThumbError::Process(format!("{} not found: {}", command.program, e))
            } else {
                ThumbError::Process(format!("failed to start {}: {}", command.label, e))
            }
        })?;

        let pid = child.id();

        // Feed stdin from a separate task so a child that fills its stdout
        // pipe before draining stdin cannot deadlock us.
        let writer = match (command.stdin.clone(), child.stdin.take()) {
            (Some(data), Some(mut pipe)) => Some(tokio::spawn(async move {
                let result = pipe.write_all(&data).await;
                drop(pipe);
                result
            })),
            _ => None,
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => Some(result),
            _ = cancel.cancelled() => None,
        };

        let output = match outcome {
            None => {
                kill_process_group(pid);
                abort_writer(writer);
                tracing::debug!("Process cancelled");
                return Err(ThumbError::Cancelled);
            }
            Some(Err(_)) => {
                kill_process_group(pid);
                abort_writer(writer);
                return Err(ThumbError::Process(format!(
                    "{} timed out after {}s",
                    command.label,
                    self.timeout.as_secs_f64()
                )));
            }
            Some(Ok(Err(e))) => {
                abort_writer(writer);
                return Err(ThumbError::Process(format!(
                    "failed to wait for {}: {}",
                    command.label, e
                )));
            }
            Some(Ok(Ok(output))) => output,
        };

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(error = %e, "Failed to write process stdin");
                }
                _ => {}
            }
        }

        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;

        if !output.status.success() {
            tracing::debug!(status = %output.status, duration_ms, "Process failed");
            return Err(ThumbError::Process(format!(
                "{} exited with {}: {}",
                command.label,
                output.status,
                stderr_tail(&output.stderr)
            )));
        }

        if output.stdout.is_empty() && !command.allow_empty_stdout {
            return Err(ThumbError::Process(format!(
                "{} produced no output: {}",
                command.label,
                stderr_tail(&output.stderr)
            )));
        }

        tracing::debug!(
            duration_ms,
            output_bytes = output.stdout.len(),
            "Process completed"
        );

        Ok(Bytes::from(output.stdout))
    }
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };

    // SAFETY: kill(2) takes plain integers and touches no memory of ours.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pgid, error = %err, "Failed to kill process group");
        }
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

fn abort_writer(writer: Option<tokio::task::JoinHandle<std::io::Result<()>>>) {
    if let Some(writer) = writer {
        writer.abort();
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let text = text.trim();
    if text.len() <= STDERR_TAIL_BYTES {
        return text.to_string();
    }

    let mut start = text.len() - STDERR_TAIL_BYTES;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

/// Try `commands` in order and return the output of the first one that succeeds.
///
/// When every command fails the last error is returned. Cancellation ends the
/// chain immediately.
pub async fn run_fallback_chain(
    runner: &dyn ProcessRunner,
    commands: &[ExternalCommand],
    cancel: &CancellationToken,
) -> ThumbResult<Bytes> {
    let mut last_error = ThumbError::Process("no command to run".to_string());

    for command in commands {
        if cancel.is_cancelled() {
            return Err(ThumbError::Cancelled);
        }

        match runner.run(command, cancel).await {
            Ok(output) => return Ok(output),
            Err(ThumbError::Cancelled) => return Err(ThumbError::Cancelled),
            Err(e) => {
                tracing::debug!(label = %command.label, error = %e, "Command failed, trying next");
                last_error = e;
            }
        }
    }

    Err(last_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays canned results in call order
    struct ScriptedRunner {
        results: Mutex<Vec<ThumbResult<Bytes>>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedRunner {
        fn new(mut results: Vec<ThumbResult<Bytes>>) -> Self {
            results.reverse();
            Self {
                results: Mutex::new(results),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ProcessRunner for ScriptedRunner {
        async fn run(
            &self,
            command: &ExternalCommand,
            _cancel: &CancellationToken,
        ) -> ThumbResult<Bytes> {
            self.calls.lock().unwrap().push(command.label.clone());
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ThumbError::Process("exhausted".to_string())))
        }
    }

    fn chain() -> Vec<ExternalCommand> {
        vec![
            ExternalCommand::new("tool", "first"),
            ExternalCommand::new("tool", "second"),
        ]
    }

    #[tokio::test]
    async fn test_chain_falls_back() {
        let runner = ScriptedRunner::new(vec![
            Err(ThumbError::Process("seek past end".to_string())),
            Ok(Bytes::from_static(b"frame")),
        ]);

        let out = run_fallback_chain(&runner, &chain(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(&out[..], b"frame");
        assert_eq!(*runner.calls.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_chain_stops_at_first_success() {
        let runner = ScriptedRunner::new(vec![Ok(Bytes::from_static(b"a"))]);

        run_fallback_chain(&runner, &chain(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_chain_returns_last_error() {
        let runner = ScriptedRunner::new(vec![
            Err(ThumbError::Process("one".to_string())),
            Err(ThumbError::Process("two".to_string())),
        ]);

        let err = run_fallback_chain(&runner, &chain(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ThumbError::Process(msg) if msg == "two"));
    }

    #[tokio::test]
    async fn test_chain_cancelled_before_start() {
        let runner = ScriptedRunner::new(vec![]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = run_fallback_chain(&runner, &chain(), &cancel).await.unwrap_err();
        assert!(matches!(err, ThumbError::Cancelled));
        assert!(runner.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_stderr_tail_truncates() {
        let long = "x".repeat(2000);
        let tail = stderr_tail(long.as_bytes());
        assert!(tail.starts_with("..."));
        assert_eq!(tail.len(), STDERR_TAIL_BYTES + 3);
    }

    #[cfg(unix)]
    mod unix {
        use super::*;

        fn runner() -> TokioProcessRunner {
            TokioProcessRunner::new(Duration::from_secs(5))
        }

        #[tokio::test]
        async fn test_pipes_stdin_to_stdout() {
            let cmd = ExternalCommand::new("cat", "cat").stdin(Bytes::from_static(b"hello"));
            let out = runner().run(&cmd, &CancellationToken::new()).await.unwrap();
            assert_eq!(&out[..], b"hello");
        }

        #[tokio::test]
        async fn test_non_zero_exit_includes_stderr() {
            let cmd = ExternalCommand::new("sh", "sh").args(["-c", "echo boom >&2; exit 3"]);
            let err = runner().run(&cmd, &CancellationToken::new()).await.unwrap_err();
            match err {
                ThumbError::Process(msg) => assert!(msg.contains("boom"), "{}", msg),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_empty_stdout_is_failure() {
            let cmd = ExternalCommand::new("sh", "sh").args(["-c", "exit 0"]);
            let err = runner().run(&cmd, &CancellationToken::new()).await.unwrap_err();
            assert!(matches!(err, ThumbError::Process(_)));
        }

        #[tokio::test]
        async fn test_empty_stdout_allowed_for_file_output() {
            let cmd = ExternalCommand::new("sh", "sh")
                .args(["-c", "exit 0"])
                .allow_empty_stdout();
            let out = runner().run(&cmd, &CancellationToken::new()).await.unwrap();
            assert!(out.is_empty());
        }

        #[tokio::test]
        async fn test_missing_binary() {
            let cmd = ExternalCommand::new("/nonexistent/thumbkit-helper", "missing");
            let err = runner().run(&cmd, &CancellationToken::new()).await.unwrap_err();
            assert!(matches!(err, ThumbError::Process(_)));
        }

        #[tokio::test]
        async fn test_timeout_kills_child() {
            let runner = TokioProcessRunner::new(Duration::from_millis(200));
            let cmd = ExternalCommand::new("sleep", "sleep").arg("10");

            let start = Instant::now();
            let err = runner.run(&cmd, &CancellationToken::new()).await.unwrap_err();

            assert!(matches!(err, ThumbError::Process(msg) if msg.contains("timed out")));
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        /// Runs a shell whose background job touches `marker` after a delay
        async fn assert_group_killed(runner: TokioProcessRunner, cancel: CancellationToken) {
            let dir = tempfile::tempdir().unwrap();
            let marker = dir.path().join("survived");
            let script = format!("(sleep 1; touch '{}') & sleep 30", marker.display());
            let cmd = ExternalCommand::new("sh", "sh").args(["-c", script.as_str()]);

            let err = runner.run(&cmd, &cancel).await.unwrap_err();
            assert!(
                matches!(err, ThumbError::Process(_) | ThumbError::Cancelled),
                "{:?}",
                err
            );

            tokio::time::sleep(Duration::from_millis(2000)).await;
            assert!(!marker.exists(), "background job outlived its process group");
        }

        #[tokio::test]
        async fn test_timeout_kills_process_group() {
            let runner = TokioProcessRunner::new(Duration::from_millis(300));
            assert_group_killed(runner, CancellationToken::new()).await;
        }

        #[tokio::test]
        async fn test_cancellation_kills_process_group() {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(300)).await;
                trigger.cancel();
            });

            assert_group_killed(runner(), cancel).await;
        }

        #[tokio::test]
        async fn test_cancellation_kills_child() {
            let cancel = CancellationToken::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                trigger.cancel();
            });

            let cmd = ExternalCommand::new("sleep", "sleep").arg("10");
            let start = Instant::now();
            let err = runner().run(&cmd, &cancel).await.unwrap_err();

            assert!(matches!(err, ThumbError::Cancelled));
            assert!(start.elapsed() < Duration::from_secs(5));
        }

        #[tokio::test]
        async fn test_unread_stdin_does_not_hang() {
            let data = Bytes::from(vec![0u8; 4 * 1024 * 1024]);
            let cmd = ExternalCommand::new("false", "false").stdin(data);
            let err = runner().run(&cmd, &CancellationToken::new()).await.unwrap_err();
            assert!(matches!(err, ThumbError::Process(_)));
        }
    }
}
