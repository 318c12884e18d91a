use crate::config::ExifToolConfig;
use crate::correlator::{Correlator, Reply};
use crate::error::ExifToolError;
use crate::protocol::{self, FrameReader};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub(crate) type WorkerId = u64;

/// One `exiftool -stay_open` process plus the tasks reading its output.
///
/// Requests are written to stdin in the order [`Worker::submit`] is called.
/// When stdout closes, the worker id is sent on the exit channel.
pub(crate) struct Worker {
    id: WorkerId,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    correlator: Arc<Mutex<Correlator>>,
    next_request: u64,
    tasks_run: usize,
    stdout_task: JoinHandle<()>,
    stderr_task: JoinHandle<()>,
}

impl Worker {
    /// Launches `exiftool -stay_open True -@ -`. Must be called inside a Tokio runtime.
    pub(crate) fn spawn(
        config: &ExifToolConfig,
        id: WorkerId,
        exit_tx: mpsc::UnboundedSender<WorkerId>,
    ) -> Result<Self, ExifToolError> {
        let mut child = Command::new(config.executable())
            .arg("-stay_open")
            .arg("True")
            .arg("-@")
            .arg("-") // Read command args from stdin
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExifToolError::SpawnFailed {
                executable: config.executable().to_path_buf(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| std::io::Error::other("Failed to capture stderr"))?;

        let correlator = Arc::new(Mutex::new(Correlator::default()));
        let stdout_task = tokio::spawn(read_stdout(id, stdout, correlator.clone(), exit_tx));
        let stderr_task = tokio::spawn(read_stderr(id, stderr, correlator.clone()));

        log::info!(
            "Started exiftool worker {id} ({}, pid {:?})",
            config.executable().display(),
            child.id()
        );

        Ok(Self {
            id,
            child,
            stdin: BufWriter::new(stdin),
            correlator,
            next_request: 1,
            tasks_run: 0,
            stdout_task,
            stderr_task,
        })
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.id
    }

    pub(crate) fn tasks_run(&self) -> usize {
        self.tasks_run
    }

    pub(crate) fn in_flight(&self) -> usize {
        lock(&self.correlator).len()
    }

    /// Registers the request, then writes it to the process.
    ///
    /// The outcome, including write failures, is delivered through `reply`.
    pub(crate) async fn submit(&mut self, args: Vec<String>, timeout: Duration, reply: Reply) {
        let request = self.next_request;
        self.next_request += 1;

        let frame = match protocol::encode_request(request, &args) {
            Ok(frame) => frame,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };

        let command = args.join(" ");
        log::debug!("worker {} request {request}: {command}", self.id);
        lock(&self.correlator).register(request, command, timeout, reply);
        self.tasks_run += 1;

        if let Err(err) = self.write(&frame).await {
            log::warn!("Failed to write to exiftool worker {}: {err}", self.id);
            if let Some(reply) = lock(&self.correlator).unregister(request) {
                let _ = reply.send(Err(ExifToolError::Io(err)));
            }
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.stdin.write_all(bytes).await?;
        self.stdin.flush().await
    }

    /// Rejects requests past their deadline. Returns how many expired.
    pub(crate) fn take_expired(&self, now: Instant) -> usize {
        lock(&self.correlator).take_expired(now)
    }

    /// A handle to this worker's requests that outlives the worker itself.
    pub(crate) fn pending(&self) -> PendingRequests {
        PendingRequests(self.correlator.clone())
    }

    /// Asks exiftool to exit after finishing what it was sent, waiting up to
    /// `timeout` before killing it. Requests still pending afterwards get `Ended`.
    pub(crate) async fn close(mut self, timeout: Duration) {
        let id = self.id;
        if let Err(err) = self.write(protocol::SHUTDOWN).await {
            log::debug!("Could not send shutdown to exiftool worker {id}: {err}");
        }

        match tokio::time::timeout(timeout, self.child.wait()).await {
            Ok(Ok(status)) => log::info!("exiftool worker {id} exited with {status}"),
            Ok(Err(err)) => log::warn!("Failed waiting for exiftool worker {id}: {err}"),
            Err(_) => {
                log::warn!("exiftool worker {id} didn't exit within {timeout:?}, killing");
                let _ = self.child.kill().await;
            }
        }

        // Pipes hit EOF once the process exits. Drain the last frames.
        if tokio::time::timeout(timeout, &mut self.stdout_task).await.is_err() {
            self.stdout_task.abort();
        }
        if tokio::time::timeout(timeout, &mut self.stderr_task).await.is_err() {
            self.stderr_task.abort();
        }

        lock(&self.correlator).fail_all(|_| ExifToolError::Ended);
    }

    /// Kills the process and rejects its pending requests with `ProcessTerminated`.
    pub(crate) async fn kill(mut self) {
        if let Err(err) = self.child.kill().await {
            log::debug!("Killing exiftool worker {}: {err}", self.id);
        }
        self.stdout_task.abort();
        self.stderr_task.abort();
        lock(&self.correlator).fail_all(|command| ExifToolError::ProcessTerminated {
            command: command.to_string(),
        });
    }
}

/// Requests of a worker that is being closed in another task.
#[derive(Clone)]
pub(crate) struct PendingRequests(Arc<Mutex<Correlator>>);

impl PendingRequests {
    pub(crate) fn take_expired(&self, now: Instant) -> usize {
        lock(&self.0).take_expired(now)
    }
}

fn lock(correlator: &Mutex<Correlator>) -> MutexGuard<'_, Correlator> {
    correlator.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_stdout(
    id: WorkerId,
    stdout: ChildStdout,
    correlator: Arc<Mutex<Correlator>>,
    exit_tx: mpsc::UnboundedSender<WorkerId>,
) {
    let mut frames = FrameReader::new(BufReader::new(stdout));
    loop {
        match frames.next_stdout().await {
            Ok(Some((request, bytes))) => {
                log::debug!("worker {id} request {request}: {} stdout bytes", bytes.len());
                lock(&correlator).on_stdout(request, bytes);
            }
            Ok(None) => {
                log::debug!("exiftool worker {id} closed stdout");
                break;
            }
            Err(err) => {
                log::warn!("Failed reading stdout of exiftool worker {id}: {err}");
                break;
            }
        }
    }
    // The supervisor may be gone already during shutdown.
    let _ = exit_tx.send(id);
}

async fn read_stderr(id: WorkerId, stderr: ChildStderr, correlator: Arc<Mutex<Correlator>>) {
    let mut frames = FrameReader::new(BufReader::new(stderr));
    loop {
        match frames.next_stderr().await {
            Ok(Some((request, lines))) => lock(&correlator).on_stderr(request, lines),
            Ok(None) => break,
            Err(err) => {
                log::warn!("Failed reading stderr of exiftool worker {id}: {err}");
                break;
            }
        }
    }
}
