//! Line protocol spoken with `exiftool -stay_open True -@ -`.
//!
//! Every request is a block of arguments, one per line, followed by
//!
//! ```text
//! -echo4
//! {ready<ID>}
//! -execute<ID>
//! ```
//!
//! `-execute<ID>` terminates the stdout response with `{ready<ID>}`, and
//! `-echo4` prints the same sentinel on stderr once the command is done,
//! so both streams can be split per request without polling.

use crate::error::ExifToolError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

const READY_PREFIX: &[u8] = b"{ready";

/// Written to stdin to make exiftool leave stay-open mode and exit.
pub(crate) const SHUTDOWN: &[u8] = b"-stay_open\nFalse\n";

/// Encodes one request. Arguments containing line breaks are rejected.
pub(crate) fn encode_request(id: u64, args: &[String]) -> Result<Vec<u8>, ExifToolError> {
    let mut buf = Vec::with_capacity(args.iter().map(|a| a.len() + 1).sum::<usize>() + 48);
    for arg in args {
        if arg.contains(['\n', '\r']) {
            return Err(ExifToolError::InvalidArgument { arg: arg.clone() });
        }
        buf.extend_from_slice(arg.as_bytes());
        buf.push(b'\n');
    }
    buf.extend_from_slice(format!("-echo4\n{{ready{id}}}\n-execute{id}\n").as_bytes());
    Ok(buf)
}

/// Looks for a `{ready<ID>}` sentinel at the end of `buf`, ignoring one
/// trailing `\n` or `\r\n`. Returns the id and the offset where the sentinel starts.
pub(crate) fn find_sentinel(buf: &[u8]) -> Option<(u64, usize)> {
    let body = buf.strip_suffix(b"\n").unwrap_or(buf);
    let body = body.strip_suffix(b"\r").unwrap_or(body);
    let inner = body.strip_suffix(b"}")?;

    let digits_start = inner.iter().rposition(|b| !b.is_ascii_digit())? + 1;
    if digits_start == inner.len() {
        return None;
    }
    let start = digits_start.checked_sub(READY_PREFIX.len())?;
    if &inner[start..digits_start] != READY_PREFIX {
        return None;
    }
    let id = std::str::from_utf8(&inner[digits_start..]).ok()?.parse().ok()?;
    Some((id, start))
}

/// Splits a worker output stream into per-request frames.
pub(crate) struct FrameReader<R> {
    reader: R,
}

impl<R: AsyncBufRead + Unpin> FrameReader<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads the next stdout frame. The sentinel may follow binary output
    /// directly, without a newline in between.
    ///
    /// Returns `Ok(None)` on EOF.
    pub(crate) async fn next_stdout(&mut self) -> std::io::Result<Option<(u64, Vec<u8>)>> {
        let mut buf = Vec::with_capacity(4096);
        loop {
            let read = self.reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                if !buf.is_empty() {
                    log::debug!("Discarding {} unterminated stdout bytes at EOF", buf.len());
                }
                return Ok(None);
            }
            if let Some((id, start)) = find_sentinel(&buf) {
                buf.truncate(start);
                return Ok(Some((id, buf)));
            }
        }
    }

    /// Reads the next stderr frame as lossily decoded lines, empty lines dropped.
    ///
    /// Returns `Ok(None)` on EOF.
    pub(crate) async fn next_stderr(&mut self) -> std::io::Result<Option<(u64, Vec<String>)>> {
        let mut lines = Vec::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = self.reader.read_until(b'\n', &mut line).await?;
            if read == 0 {
                return Ok(None);
            }
            match find_sentinel(&line) {
                Some((id, start)) => {
                    push_line(&mut lines, &line[..start]);
                    return Ok(Some((id, lines)));
                }
                None => push_line(&mut lines, &line),
            }
        }
    }
}

fn push_line(lines: &mut Vec<String>, raw: &[u8]) {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end_matches(['\r', '\n']);
    if !text.trim().is_empty() {
        lines.push(text.to_string());
    }
}
