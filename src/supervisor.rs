use crate::config::ExifToolConfig;
use crate::correlator::Reply;
use crate::error::ExifToolError;
use crate::worker::{PendingRequests, Worker, WorkerId};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

const RESTART_WINDOW: Duration = Duration::from_secs(60);

/// A worker closing in the background. Its requests are still swept for timeouts.
struct Retiring {
    id: WorkerId,
    pending: PendingRequests,
    handle: JoinHandle<()>,
}

pub(crate) enum Message {
    Execute { args: Vec<String>, reply: Reply },
    Shutdown,
}

/// The actor that owns the exiftool worker.
///
/// Requests are dispatched in the order they were queued. A crashed or
/// wedged worker is replaced on the next request, and a worker that has
/// run `max_tasks_per_process` requests is closed in the background.
pub(crate) struct Supervisor {
    config: ExifToolConfig,
    worker: Option<Worker>,
    last_worker_id: WorkerId,
    crashes: VecDeque<Instant>,
    retiring: Vec<Retiring>,
    exit_tx: mpsc::UnboundedSender<WorkerId>,
    stopped: watch::Sender<bool>,
}

impl Supervisor {
    /// Spawns the first worker, then the actor task.
    ///
    /// Returns the request queue and a flag that turns `true` once the actor
    /// has shut down and every worker has exited.
    pub(crate) fn start(
        config: ExifToolConfig,
    ) -> Result<(mpsc::Sender<Message>, watch::Receiver<bool>), ExifToolError> {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        let worker = Worker::spawn(&config, 1, exit_tx.clone())?;
        let (tx, rx) = mpsc::channel(config.queue_capacity());
        let (stopped, stopped_rx) = watch::channel(false);

        let supervisor = Supervisor {
            config,
            worker: Some(worker),
            last_worker_id: 1,
            crashes: VecDeque::new(),
            retiring: Vec::new(),
            exit_tx,
            stopped,
        };
        tokio::spawn(supervisor.run(rx, exit_rx));
        Ok((tx, stopped_rx))
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<Message>,
        mut exit_rx: mpsc::UnboundedReceiver<WorkerId>,
    ) {
        let mut sweep = tokio::time::interval(self.config.sweep_interval());
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(Message::Execute { args, reply }) => self.dispatch(args, reply).await,
                    Some(Message::Shutdown) | None => break,
                },
                Some(id) = exit_rx.recv() => self.on_worker_exit(id).await,
                _ = sweep.tick() => self.sweep().await,
            }
        }

        self.shutdown(rx).await;
    }

    async fn dispatch(&mut self, args: Vec<String>, reply: Reply) {
        let args: Vec<String> = self
            .config
            .common_args()
            .iter()
            .cloned()
            .chain(args)
            .collect();
        let timeout = self.config.task_timeout();
        let max_tasks = self.config.max_tasks_per_process();

        let worker = match self.ensure_worker() {
            Ok(worker) => worker,
            Err(err) => {
                let _ = reply.send(Err(err));
                return;
            }
        };
        worker.submit(args, timeout, reply).await;

        if max_tasks > 0 && worker.tasks_run() >= max_tasks {
            self.retire();
        }
    }

    fn ensure_worker(&mut self) -> Result<&mut Worker, ExifToolError> {
        let worker = match self.worker.take() {
            Some(worker) => worker,
            None => self.spawn_replacement()?,
        };
        Ok(self.worker.insert(worker))
    }

    fn spawn_replacement(&mut self) -> Result<Worker, ExifToolError> {
        let now = Instant::now();
        while self
            .crashes
            .front()
            .is_some_and(|crash| now.duration_since(*crash) >= RESTART_WINDOW)
        {
            self.crashes.pop_front();
        }
        if self.crashes.len() > self.config.max_restarts_per_minute() {
            log::error!(
                "exiftool crashed {} times in the last minute, not restarting",
                self.crashes.len()
            );
            return Err(ExifToolError::RestartLimit {
                restarts: self.crashes.len(),
            });
        }

        self.last_worker_id += 1;
        Worker::spawn(&self.config, self.last_worker_id, self.exit_tx.clone())
    }

    /// Closes the current worker in the background; the next request spawns a new one.
    fn retire(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        log::info!(
            "Recycling exiftool worker {} after {} tasks",
            worker.id(),
            worker.tasks_run()
        );
        let timeout = self.close_timeout();
        self.retiring.retain(|retiring| !retiring.handle.is_finished());
        self.retiring.push(Retiring {
            id: worker.id(),
            pending: worker.pending(),
            handle: tokio::spawn(worker.close(timeout)),
        });
    }

    /// Retired and killed workers report their exit too; only the current one counts as a crash.
    async fn on_worker_exit(&mut self, id: WorkerId) {
        let Some(worker) = self.worker.take_if(|worker| worker.id() == id) else {
            log::debug!("exiftool worker {id} exited");
            return;
        };
        log::warn!(
            "exiftool worker {id} exited unexpectedly with {} requests in flight",
            worker.in_flight()
        );
        self.crashes.push_back(Instant::now());
        worker.kill().await;
    }

    async fn sweep(&mut self) {
        let now = Instant::now();
        self.retiring.retain(|retiring| !retiring.handle.is_finished());
        for retiring in &self.retiring {
            let expired = retiring.pending.take_expired(now);
            if expired > 0 {
                log::warn!(
                    "{expired} requests timed out on retiring exiftool worker {}",
                    retiring.id
                );
            }
        }

        let expired = self
            .worker
            .as_ref()
            .map_or(0, |worker| worker.take_expired(now));
        if expired == 0 {
            return;
        }
        if let Some(worker) = self.worker.take() {
            log::warn!(
                "Killing wedged exiftool worker {} ({expired} requests timed out)",
                worker.id()
            );
            self.crashes.push_back(Instant::now());
            worker.kill().await;
        }
    }

    async fn shutdown(mut self, mut rx: mpsc::Receiver<Message>) {
        rx.close();
        while let Some(message) = rx.recv().await {
            if let Message::Execute { reply, .. } = message {
                let _ = reply.send(Err(ExifToolError::Ended));
            }
        }

        if let Some(worker) = self.worker.take() {
            log::info!("Closing exiftool worker {}", worker.id());
            worker.close(self.close_timeout()).await;
        }
        for retiring in self.retiring.drain(..) {
            if let Err(err) = retiring.handle.await {
                log::warn!("Retiring exiftool worker failed: {err}");
            }
        }

        self.stopped.send_replace(true);
        log::debug!("exiftool supervisor stopped");
    }

    fn close_timeout(&self) -> Duration {
        self.config.task_timeout() + self.config.shutdown_timeout()
    }
}
