use crate::error::ExifToolError;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Output of one exiftool command, split per request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawResponse {
    /// Everything exiftool wrote to stdout before the ready sentinel.
    pub stdout: Vec<u8>,
    /// Non-empty stderr lines, e.g. `Error: File not found - bogus`.
    pub stderr: Vec<String>,
}

pub(crate) type Reply = oneshot::Sender<Result<RawResponse, ExifToolError>>;

struct Pending {
    command: String,
    deadline: Instant,
    timeout: Duration,
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<String>>,
    reply: Reply,
}

/// Matches stdout and stderr frames from one worker to the requests waiting for them.
///
/// A request resolves once both of its frames have arrived, in either order.
#[derive(Default)]
pub(crate) struct Correlator {
    pending: HashMap<u64, Pending>,
}

impl Correlator {
    pub(crate) fn register(&mut self, id: u64, command: String, timeout: Duration, reply: Reply) {
        self.pending.insert(
            id,
            Pending {
                command,
                deadline: Instant::now() + timeout,
                timeout,
                stdout: None,
                stderr: None,
                reply,
            },
        );
    }

    /// Removes a request without answering it. Returns its reply channel.
    pub(crate) fn unregister(&mut self, id: u64) -> Option<Reply> {
        self.pending.remove(&id).map(|p| p.reply)
    }

    pub(crate) fn on_stdout(&mut self, id: u64, bytes: Vec<u8>) {
        match self.pending.get_mut(&id) {
            Some(pending) => pending.stdout = Some(bytes),
            None => {
                log::debug!("Dropping stdout for unknown request {id}");
                return;
            }
        }
        self.try_resolve(id);
    }

    pub(crate) fn on_stderr(&mut self, id: u64, lines: Vec<String>) {
        match self.pending.get_mut(&id) {
            Some(pending) => pending.stderr = Some(lines),
            None => {
                log::debug!("Dropping stderr for unknown request {id}");
                return;
            }
        }
        self.try_resolve(id);
    }

    fn try_resolve(&mut self, id: u64) {
        let complete = self
            .pending
            .get(&id)
            .is_some_and(|p| p.stdout.is_some() && p.stderr.is_some());
        if !complete {
            return;
        }
        if let Some(pending) = self.pending.remove(&id) {
            let response = RawResponse {
                stdout: pending.stdout.unwrap_or_default(),
                stderr: pending.stderr.unwrap_or_default(),
            };
            // The caller may have given up on the request already.
            let _ = pending.reply.send(Ok(response));
        }
    }

    /// Rejects every pending request with the error built for its command.
    pub(crate) fn fail_all(&mut self, make_error: impl Fn(&str) -> ExifToolError) {
        for (_, pending) in self.pending.drain() {
            let _ = pending.reply.send(Err(make_error(&pending.command)));
        }
    }

    /// Rejects requests whose deadline has passed with `Timeout`. Returns how many expired.
    pub(crate) fn take_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<u64> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            if let Some(pending) = self.pending.remove(id) {
                log::warn!(
                    "exiftool request timed out after {:?}: {}",
                    pending.timeout,
                    pending.command
                );
                let _ = pending.reply.send(Err(ExifToolError::Timeout {
                    command: pending.command,
                    timeout: pending.timeout,
                }));
            }
        }
        expired.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
