//! The process supervisor.

use std::collections::HashMap;
use std::os::unix::process::ExitStatusExt;
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use nix::fcntl::OFlag;
use nix::sys::signal::{killpg, Signal};
use nix::unistd::{pipe2, Pid};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::pipe;
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::error::SupervisorError;
use super::event::{OutputStream, ProcessId, ProcessObserver};
use super::handle::ProcessHandle;
use super::invocation::Invocation;
use super::request::{OutputMode, ProcessRequest};

/// Status reported when a process could not be started or waited on.
pub const SPAWN_FAILURE_CODE: i32 = -1;

/// Bytes read per output pump iteration.
const READ_CHUNK: usize = 4096;

struct Registry {
    next_id: AtomicU64,
    handles: Mutex<HashMap<ProcessId, Arc<ProcessHandle>>>,
}

/// Starts, tracks and tears down external commands.
///
/// Cheap to clone; clones share the same registry. [`run`](Self::run) must
/// be called from within a Tokio runtime.
#[derive(Clone)]
pub struct ProcessSupervisor {
    inner: Arc<Registry>,
}

impl ProcessSupervisor {
    /// Create an empty supervisor. Identifiers start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Registry {
                next_id: AtomicU64::new(1),
                handles: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Start a request and return its `Running` handle.
    ///
    /// The child is spawned before this returns, so the handle already has a
    /// pid and can be signalled. Spawn failures are not returned here; they
    /// arrive through `observer.on_failed` with [`SPAWN_FAILURE_CODE`].
    pub fn run(
        &self,
        request: ProcessRequest,
        observer: Arc<dyn ProcessObserver>,
    ) -> Arc<ProcessHandle> {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = Arc::new(ProcessHandle::new(id, request));
        self.handles().insert(id, Arc::clone(&handle));

        let started = start(&handle);
        tokio::spawn(supervise(Arc::clone(&handle), started, observer));
        handle
    }

    /// Look up a handle by id.
    #[must_use]
    pub fn get(&self, id: ProcessId) -> Option<Arc<ProcessHandle>> {
        self.handles().get(&id).cloned()
    }

    /// All handles still running, ordered by id.
    #[must_use]
    pub fn list_running(&self) -> Vec<Arc<ProcessHandle>> {
        let mut running: Vec<_> = self
            .handles()
            .values()
            .filter(|h| h.is_running())
            .cloned()
            .collect();
        running.sort_by_key(|h| h.id());
        running
    }

    /// Send SIGKILL to the process group. False if unknown or finished.
    pub fn kill(&self, id: ProcessId) -> bool {
        self.signal(id, Signal::SIGKILL)
    }

    /// Send SIGTERM to the process group. False if unknown or finished.
    pub fn terminate(&self, id: ProcessId) -> bool {
        self.signal(id, Signal::SIGTERM)
    }

    /// SIGKILL every running handle. Returns how many were signalled.
    pub fn kill_all(&self) -> usize {
        self.list_running()
            .iter()
            .filter(|h| self.kill(h.id()))
            .count()
    }

    /// Drop a finished handle from the registry.
    ///
    /// Running handles are never released. After release, [`get`](Self::get)
    /// returns `None` for that id.
    pub fn release(&self, id: ProcessId) -> Option<Arc<ProcessHandle>> {
        let mut handles = self.handles();
        if handles.get(&id).is_some_and(|h| !h.is_running()) {
            handles.remove(&id)
        } else {
            None
        }
    }

    fn signal(&self, id: ProcessId, signal: Signal) -> bool {
        let Some(handle) = self.get(id) else {
            debug!("Ignoring {:?} for unknown process {}", signal, id);
            return false;
        };
        if !handle.is_running() {
            debug!("Ignoring {:?} for finished process {}", signal, id);
            return false;
        }
        let Some(pid) = handle.pid().and_then(|pid| i32::try_from(pid).ok()) else {
            return false;
        };

        match killpg(Pid::from_raw(pid), signal) {
            Ok(()) => {
                info!("Sent {:?} to process {} (pgid {})", signal, id, pid);
                true
            }
            Err(e) => {
                warn!("Failed to send {:?} to process {}: {}", signal, id, e);
                false
            }
        }
    }

    fn handles(&self) -> MutexGuard<'_, HashMap<ProcessId, Arc<ProcessHandle>>> {
        self.inner
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

/// A spawned child and the reader of its merged output, if any.
struct Started {
    child: Child,
    merged: Option<pipe::Receiver>,
    stdin: Option<String>,
}

fn start(handle: &ProcessHandle) -> Result<Started, SupervisorError> {
    let request = handle.request();
    let invocation = Invocation::from_request(request)?;
    info!(
        "Starting process {}: {}",
        handle.id(),
        invocation.to_command_line()
    );

    let (child, merged) = spawn(&invocation, request)?;
    if let Some(pid) = child.id() {
        handle.set_pid(pid);
    }
    Ok(Started {
        child,
        merged,
        stdin: invocation.stdin,
    })
}

/// Run one process to completion and fire its single terminal callback.
async fn supervise(
    handle: Arc<ProcessHandle>,
    started: Result<Started, SupervisorError>,
    observer: Arc<dyn ProcessObserver>,
) {
    let id = handle.id();
    let outcome = match started {
        Ok(started) => drive(&handle, started, &observer).await,
        Err(e) => Err(e),
    };
    match outcome {
        Ok(code) => {
            debug!("Process {} exited with code {}", id, code);
            if handle.complete(code) {
                observer.on_completed(id, code);
            }
        }
        Err(e) => {
            let message = e.to_string();
            warn!("Process {} failed: {}", id, message);
            if handle.fail(SPAWN_FAILURE_CODE, message.clone()) {
                observer.on_failed(id, SPAWN_FAILURE_CODE, &message);
            }
        }
    }
}

async fn drive(
    handle: &Arc<ProcessHandle>,
    started: Started,
    observer: &Arc<dyn ProcessObserver>,
) -> Result<i32, SupervisorError> {
    let id = handle.id();
    let Started {
        mut child,
        merged,
        stdin: input,
    } = started;

    if let Some(payload) = input.as_deref()
        && let Some(mut stdin) = child.stdin.take()
    {
        if let Err(e) = stdin.write_all(payload.as_bytes()).await {
            debug!("Process {} did not accept stdin: {}", id, e);
        }
    }

    let mut pumps = Vec::with_capacity(2);
    if let Some(reader) = merged {
        pumps.push(tokio::spawn(pump(
            reader,
            OutputStream::Merged,
            Arc::clone(handle),
            Arc::clone(observer),
        )));
    }
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump(
            stdout,
            OutputStream::Stdout,
            Arc::clone(handle),
            Arc::clone(observer),
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump(
            stderr,
            OutputStream::Stderr,
            Arc::clone(handle),
            Arc::clone(observer),
        )));
    }

    let status = child.wait().await.map_err(SupervisorError::Wait);

    // Terminal callback only after every output callback.
    for pump in pumps {
        if let Err(e) = pump.await {
            warn!("Process {} output pump failed: {}", id, e);
        }
    }

    Ok(exit_code(status?))
}

fn spawn(
    invocation: &Invocation,
    request: &ProcessRequest,
) -> Result<(Child, Option<pipe::Receiver>), SupervisorError> {
    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .envs(request.envs())
        .stdin(if invocation.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .process_group(0)
        .kill_on_drop(false);
    if let Some(dir) = request.cwd() {
        command.current_dir(dir);
    }

    let read_end = match request.mode() {
        OutputMode::Merged => {
            let (read_end, write_end) = pipe2(OFlag::O_CLOEXEC)?;
            let err_end = write_end.try_clone().map_err(SupervisorError::Pipe)?;
            command
                .stdout(Stdio::from(write_end))
                .stderr(Stdio::from(err_end));
            Some(read_end)
        }
        OutputMode::Separate => {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
            None
        }
    };

    let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;
    // Close the parent's copies of the write end so the reader sees EOF.
    drop(command);

    let reader = match read_end.map(pipe::Receiver::from_owned_fd).transpose() {
        Ok(reader) => reader,
        Err(e) => {
            let _ = child.start_kill();
            return Err(SupervisorError::Pipe(e));
        }
    };
    Ok((child, reader))
}

async fn pump<R>(
    mut reader: R,
    stream: OutputStream,
    handle: Arc<ProcessHandle>,
    observer: Arc<dyn ProcessObserver>,
) where
    R: AsyncRead + Unpin,
{
    let id = handle.id();
    let mut decoder = Utf8Carry::default();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let text = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => decoder.decode(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("Process {} {:?} read error: {}", id, stream, e);
                break;
            }
        };
        deliver(&handle, observer.as_ref(), stream, &text);
    }

    let rest = decoder.finish();
    deliver(&handle, observer.as_ref(), stream, &rest);
}

fn deliver(handle: &ProcessHandle, observer: &dyn ProcessObserver, stream: OutputStream, text: &str) {
    if text.is_empty() {
        return;
    }
    handle.append(stream, text);
    observer.on_output(handle.id(), stream, text);
}

fn exit_code(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => SPAWN_FAILURE_CODE,
    }
}

/// Permissive UTF-8 decoding that holds back a multi-byte sequence split
/// across reads. Invalid bytes become U+FFFD.
#[derive(Default)]
struct Utf8Carry {
    pending: Vec<u8>,
}

impl Utf8Carry {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut text = String::new();
        let mut consumed = 0;

        loop {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    consumed = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            consumed += valid + bad;
                        }
                        // Truncated sequence at the end: keep it for the next read.
                        None => {
                            consumed += valid;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_carry_joins_split_sequence() {
        let bytes = "é".as_bytes();
        let mut decoder = Utf8Carry::default();
        assert_eq!(decoder.decode(&bytes[..1]), "");
        assert_eq!(decoder.decode(&bytes[1..]), "é");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_utf8_carry_replaces_invalid_bytes() {
        let mut decoder = Utf8Carry::default();
        assert_eq!(decoder.decode(b"ok\xffok"), "ok\u{FFFD}ok");
    }

    #[test]
    fn test_utf8_carry_keeps_tail_after_invalid_byte() {
        let mut decoder = Utf8Carry::default();
        assert_eq!(decoder.decode(b"a\xff\xc3"), "a\u{FFFD}");
        assert_eq!(decoder.decode(b"\xa9b"), "\u{e9}b");
        assert_eq!(decoder.finish(), "");
    }

    #[test]
    fn test_utf8_carry_flushes_truncated_tail() {
        let mut decoder = Utf8Carry::default();
        assert_eq!(decoder.decode(b"a\xc3"), "a");
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_exit_code_from_signal() {
        let killed = ExitStatus::from_raw(9);
        assert_eq!(exit_code(killed), 137);
        let normal = ExitStatus::from_raw(3 << 8);
        assert_eq!(exit_code(normal), 3);
    }

    #[test]
    fn test_unknown_id_signals_fail() {
        let supervisor = ProcessSupervisor::new();
        assert!(!supervisor.kill(42));
        assert!(!supervisor.terminate(42));
        assert!(supervisor.get(42).is_none());
        assert_eq!(supervisor.kill_all(), 0);
    }
}
