//! Periodic probing of the diagnostic command.
//!
//! A [`ProbeLoop`] runs on its own thread: run the command, parse the report
//! into the store, wait for the interval, repeat. Cycles never overlap. A
//! failed command only skips that cycle; the previous values stay exported.
//!
//! There is no timeout on the command itself, so a hung `ssacli` stalls the
//! loop until it returns. [`ProbeHandle::stop`] only waits a bounded time for
//! such a cycle.

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use log::{debug, info, warn};

use crate::config::{DEFAULT_SHELL, ProbeConfig};
use crate::error::ProbeError;
use crate::parser::{ParseSummary, parse_report};
use crate::store::MetricStore;

/// Something that can run a command line and hand back its stdout.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command_line: &str) -> Result<String, ProbeError>;
}

/// Runs command lines through `<shell> -c`.
#[derive(Debug, Clone)]
pub struct ShellCommandRunner {
    shell: String,
}

impl ShellCommandRunner {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_SHELL)
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command_line: &str) -> Result<String, ProbeError> {
        debug!("executing `{} -c {command_line}`", self.shell);

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command_line)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProbeError::Spawn {
                command: command_line.to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::NonZeroExit {
                command: command_line.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout).map_err(|source| ProbeError::InvalidOutput {
            command: command_line.to_string(),
            source,
        })
    }
}

/// Repeats command → parse → store on a fixed interval.
pub struct ProbeLoop<R: CommandRunner> {
    runner: R,
    store: Arc<MetricStore>,
    command: String,
    interval: Duration,
}

impl ProbeLoop<ShellCommandRunner> {
    /// Build a loop that runs `config.command` through `config.shell`.
    pub fn from_config(config: &ProbeConfig, store: Arc<MetricStore>) -> Self {
        Self::new(
            ShellCommandRunner::new(&config.shell),
            store,
            &config.command,
            config.interval,
        )
    }
}

impl<R: CommandRunner> ProbeLoop<R> {
    pub fn new(
        runner: R,
        store: Arc<MetricStore>,
        command: impl Into<String>,
        interval: Duration,
    ) -> Self {
        Self {
            runner,
            store,
            command: command.into(),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one probe cycle.
    ///
    /// On failure the store is left untouched apart from the failure counters.
    pub fn run_cycle(&self) -> Result<ParseSummary, ProbeError> {
        info!("Reading new metrics..");

        let report = match self.runner.run(&self.command) {
            Ok(report) => report,
            Err(e) => {
                self.store.record_probe_failure();
                return Err(e);
            }
        };

        let summary = parse_report(&report, self.store.as_ref());
        self.store.record_probe_success();
        info!(
            "published {} drive(s), dropped {} incomplete record(s)",
            summary.published, summary.dropped
        );
        Ok(summary)
    }

    /// Probe until `shutdown` receives a message or its sender is dropped.
    pub fn run(&self, shutdown: &Receiver<()>) {
        loop {
            if let Err(e) = self.run_cycle() {
                warn!("probe cycle skipped: {e}");
            }

            match shutdown.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        info!("probe loop stopped");
    }
}

impl<R: CommandRunner + 'static> ProbeLoop<R> {
    /// Move the loop onto a dedicated `probe` thread.
    pub fn spawn(self) -> std::io::Result<ProbeHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();
        let thread = std::thread::Builder::new()
            .name("probe".to_string())
            .spawn(move || {
                self.run(&shutdown_rx);
                let _ = done_tx.send(());
            })?;
        Ok(ProbeHandle {
            shutdown: shutdown_tx,
            done: done_rx,
            thread,
        })
    }
}

/// Handle to a running probe thread.
pub struct ProbeHandle {
    shutdown: Sender<()>,
    done: Receiver<()>,
    thread: JoinHandle<()>,
}

impl ProbeHandle {
    /// Ask the loop to stop and wait up to `grace` for it to finish.
    ///
    /// Returns `false` if the current cycle is still running when `grace`
    /// expires (e.g. a hung command). The thread is then left detached.
    pub fn stop(self, grace: Duration) -> bool {
        let _ = self.shutdown.send(());
        match self.done.recv_timeout(grace) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    warn!("probe thread panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("probe cycle still running after {grace:?}, not waiting for it");
                false
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldKind;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    const ONE_DRIVE: &str = "\
   physicaldrive 1I:1:1
      Bay: 1
      Box: 1
      Status: OK
      Interface Type: SATA
      Power On Hours: 500
";

    /// Replays scripted outputs; `None` simulates a missing binary. The last
    /// entry repeats once the script is exhausted.
    struct ScriptedRunner {
        script: Mutex<VecDeque<Option<String>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedRunner {
        fn new(script: Vec<Option<&str>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let runner = Self {
                script: Mutex::new(script.into_iter().map(|s| s.map(str::to_string)).collect()),
                calls: Arc::clone(&calls),
            };
            (runner, calls)
        }
    }

    impl CommandRunner for ScriptedRunner {
        fn run(&self, command_line: &str) -> Result<String, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front().flatten()
                } else {
                    script.front().cloned().flatten()
                }
            };
            match next {
                Some(out) => Ok(out),
                None => Err(ProbeError::Spawn {
                    command: command_line.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "ssacli"),
                }),
            }
        }
    }

    fn wait_for(calls: &AtomicUsize, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while calls.load(Ordering::SeqCst) < n {
            assert!(Instant::now() < deadline, "probe loop did not reach {n} cycles");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    // -----------------------------------------------------------------------
    // Single cycles
    // -----------------------------------------------------------------------

    #[test]
    fn cycle_publishes_report() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, _) = ScriptedRunner::new(vec![Some(ONE_DRIVE)]);
        let probe = ProbeLoop::new(runner, Arc::clone(&store), "ssacli", Duration::from_secs(1));

        let summary = probe.run_cycle().unwrap();
        assert_eq!(summary.published, 1);
        assert_eq!(
            store.value(FieldKind::PowerOnHours, "box 1 bay 1 type SATA"),
            Some(500.0)
        );
    }

    #[test]
    fn failed_cycle_keeps_previous_values() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, _) = ScriptedRunner::new(vec![Some(ONE_DRIVE), None]);
        let probe = ProbeLoop::new(runner, Arc::clone(&store), "ssacli", Duration::from_secs(1));

        probe.run_cycle().unwrap();
        let err = probe.run_cycle().unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
        assert_eq!(store.probe_failures(), 1);
        assert_eq!(
            store.value(FieldKind::Status, "box 1 bay 1 type SATA"),
            Some(1.0)
        );
    }

    #[test]
    fn replaying_a_report_is_idempotent() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, _) = ScriptedRunner::new(vec![Some(ONE_DRIVE), Some(ONE_DRIVE)]);
        let probe = ProbeLoop::new(runner, Arc::clone(&store), "ssacli", Duration::from_secs(1));

        probe.run_cycle().unwrap();
        let first = store.encode().unwrap();
        probe.run_cycle().unwrap();
        assert_eq!(store.encode().unwrap(), first);
    }

    // -----------------------------------------------------------------------
    // Loop behaviour
    // -----------------------------------------------------------------------

    #[test]
    fn loop_survives_failed_cycles() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, calls) = ScriptedRunner::new(vec![None, None, Some(ONE_DRIVE)]);
        let probe = ProbeLoop::new(runner, Arc::clone(&store), "ssacli", Duration::from_millis(5));

        let handle = probe.spawn().unwrap();
        wait_for(&calls, 3);
        assert!(!handle.is_finished());
        assert!(handle.stop(Duration::from_secs(5)));

        assert_eq!(store.probe_failures(), 2);
        assert_eq!(
            store.value(FieldKind::Status, "box 1 bay 1 type SATA"),
            Some(1.0)
        );
    }

    /// Blocks every run until `gate` receives or its sender is dropped.
    struct BlockingRunner {
        gate: Mutex<Receiver<()>>,
        calls: Arc<AtomicUsize>,
    }

    impl CommandRunner for BlockingRunner {
        fn run(&self, command_line: &str) -> Result<String, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let _ = self.gate.lock().unwrap().recv();
            Err(ProbeError::Spawn {
                command: command_line.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::TimedOut, "ssacli hung"),
            })
        }
    }

    #[test]
    fn stop_does_not_wait_forever_on_hung_command() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (gate_tx, gate_rx) = mpsc::channel::<()>();
        let calls = Arc::new(AtomicUsize::new(0));
        let runner = BlockingRunner {
            gate: Mutex::new(gate_rx),
            calls: Arc::clone(&calls),
        };
        let probe = ProbeLoop::new(runner, store, "ssacli", Duration::from_secs(3600));

        let handle = probe.spawn().unwrap();
        wait_for(&calls, 1);

        let started = Instant::now();
        assert!(!handle.stop(Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_secs(5));

        // Release the detached thread.
        drop(gate_tx);
    }

    #[test]
    fn stop_joins_idle_loop() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, calls) = ScriptedRunner::new(vec![Some(ONE_DRIVE)]);
        let probe = ProbeLoop::new(runner, store, "ssacli", Duration::from_secs(3600));

        let handle = probe.spawn().unwrap();
        wait_for(&calls, 1);
        assert!(handle.stop(Duration::from_secs(5)));
    }

    #[test]
    fn dropping_sender_stops_loop() {
        let store = Arc::new(MetricStore::new().unwrap());
        let (runner, calls) = ScriptedRunner::new(vec![Some(ONE_DRIVE)]);
        let probe = ProbeLoop::new(runner, store, "ssacli", Duration::from_secs(3600));

        let (tx, rx) = mpsc::channel();
        drop(tx);
        // Returns after the first cycle instead of sleeping for an hour.
        probe.run(&rx);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    // -----------------------------------------------------------------------
    // Shell runner
    // -----------------------------------------------------------------------

    #[cfg(unix)]
    #[test]
    fn shell_runner_captures_stdout() {
        let runner = ShellCommandRunner::new("sh");
        assert_eq!(runner.run("echo '   Bay: 4'").unwrap(), "   Bay: 4\n");
    }

    #[cfg(unix)]
    #[test]
    fn shell_runner_reports_exit_status() {
        let runner = ShellCommandRunner::new("sh");
        match runner.run("echo broken >&2; exit 3") {
            Err(ProbeError::NonZeroExit { status, stderr, .. }) => {
                assert_eq!(status.code(), Some(3));
                assert_eq!(stderr, "broken");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[test]
    fn shell_runner_reports_missing_shell() {
        let runner = ShellCommandRunner::new("/nonexistent/shell-for-tests");
        assert!(matches!(
            runner.run("true"),
            Err(ProbeError::Spawn { .. })
        ));
    }
}
