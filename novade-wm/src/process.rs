//! Helper process spawning and asynchronous reaping.
//!
//! Children are started with `std::process::Command` and never waited on inline.
//! SIGCHLD is delivered through a self-pipe registered with `signal-hook`; the event
//! loop watches the read end and calls [`ProcessManager::reap`], which polls each
//! tracked child with a non-blocking `waitpid`. Children started elsewhere in the
//! process are left to their owners.

use std::collections::HashMap;
use std::io::{self, Read};
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::net::UnixStream;
use std::process::{Command, Stdio};
use std::time::Instant;

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::Pid;
use signal_hook::SigId;
use tracing::{debug, info, warn};

use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::error::ProcessError;

pub const ACTIVATION_TOKEN_ENV: &str = "XDG_ACTIVATION_TOKEN";
pub const STARTUP_ID_ENV: &str = "DESKTOP_STARTUP_ID";

#[derive(Debug, Clone)]
struct ChildInfo {
    command: String,
    spawned_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Exited(i32),
    Signaled(i32),
    /// The status was collected outside this manager.
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapedChild {
    pub pid: u32,
    pub command: String,
    pub exit: ExitKind,
}

#[derive(Debug, Default)]
pub struct ProcessManager {
    children: HashMap<u32, ChildInfo>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `argv[0]` with the remaining arguments and extra environment.
    pub fn spawn(&mut self, argv: &[String], env: &[(&str, &str)]) -> Result<u32, ProcessError> {
        let (program, args) = argv.split_first().ok_or(ProcessError::EmptyCommand)?;
        let command = argv.join(" ");
        let child = Command::new(program)
            .args(args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;
        let pid = child.id();
        info!(pid, %command, "process spawned");
        self.children.insert(
            pid,
            ChildInfo {
                command,
                spawned_at: Instant::now(),
            },
        );
        Ok(pid)
    }

    pub fn is_tracked(&self, pid: u32) -> bool {
        self.children.contains_key(&pid)
    }

    pub fn tracked(&self) -> usize {
        self.children.len()
    }

    /// Collects every tracked child that has exited. Never blocks.
    pub fn reap(&mut self) -> Result<Vec<ReapedChild>, ProcessError> {
        let mut exited = Vec::new();
        for &pid in self.children.keys() {
            let status = loop {
                match waitpid(Pid::from_raw(pid as i32), Some(WaitPidFlag::WNOHANG)) {
                    Err(Errno::EINTR) => continue,
                    other => break other,
                }
            };
            let exit = match status {
                Ok(WaitStatus::Exited(_, code)) => ExitKind::Exited(code),
                Ok(WaitStatus::Signaled(_, signal, _)) => ExitKind::Signaled(signal as i32),
                Ok(_) => continue,
                // Already collected by someone else; stop tracking it.
                Err(Errno::ECHILD) => ExitKind::Unknown,
                Err(err) => return Err(err.into()),
            };
            exited.push((pid, exit));
        }

        let mut reaped = Vec::with_capacity(exited.len());
        for (pid, exit) in exited {
            let Some(info) = self.children.remove(&pid) else {
                continue;
            };
            debug!(pid, command = %info.command, ?exit, lifetime = ?info.spawned_at.elapsed(), "child reaped");
            reaped.push(ReapedChild {
                pid,
                command: info.command,
                exit,
            });
        }
        Ok(reaped)
    }
}

/// Self-pipe for a set of signals. The read end becomes readable whenever one of
/// them arrives.
#[derive(Debug)]
pub struct SignalPipe {
    reader: UnixStream,
    ids: Vec<SigId>,
}

impl SignalPipe {
    pub fn new(signals: &[i32]) -> Result<Self, ProcessError> {
        let (reader, writer) = UnixStream::pair().map_err(ProcessError::SignalPipe)?;
        reader.set_nonblocking(true).map_err(ProcessError::SignalPipe)?;
        let mut ids = Vec::with_capacity(signals.len());
        for signal in signals {
            let writer = writer.try_clone().map_err(ProcessError::SignalPipe)?;
            let id = signal_hook::low_level::pipe::register(*signal, writer).map_err(ProcessError::SignalPipe)?;
            ids.push(id);
        }
        Ok(Self { reader, ids })
    }

    /// Empties the pipe. Returns whether anything was pending.
    pub fn drain(&mut self) -> io::Result<bool> {
        let mut buf = [0u8; 64];
        let mut any = false;
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(any),
                Ok(_) => any = true,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(any),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl AsFd for SignalPipe {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.reader.as_fd()
    }
}

impl Drop for SignalPipe {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

impl Compositor {
    /// Spawns a helper. With `with_token`, an activation token recording the active
    /// output and tags is passed through the environment.
    pub fn spawn(&mut self, argv: &[String], with_token: bool) -> Result<u32, ProcessError> {
        let token = with_token.then(|| {
            let output = self.outputs.default_target();
            let tags = output
                .and_then(|o| self.outputs.get(o))
                .map(|o| o.active_tags)
                .unwrap_or_default();
            self.activation.issue(output, tags, Instant::now())
        });

        let env: Vec<(&str, &str)> = token
            .as_deref()
            .map(|t| vec![(ACTIVATION_TOKEN_ENV, t), (STARTUP_ID_ENV, t)])
            .unwrap_or_default();
        match self.processes.spawn(argv, &env) {
            Ok(pid) => {
                if let Some(token) = &token {
                    self.activation.bind_pid(token, pid);
                }
                Ok(pid)
            }
            Err(err) => {
                if let Some(token) = &token {
                    self.activation.expire(token);
                }
                self.diagnostics
                    .record(DiagnosticSource::Process, format!("spawn failed: {err}"));
                Err(err)
            }
        }
    }

    /// Reaps exited children. Called when the SIGCHLD pipe becomes readable.
    pub fn reap_children(&mut self) -> Vec<ReapedChild> {
        match self.processes.reap() {
            Ok(reaped) => reaped,
            Err(err) => {
                warn!(%err, "reaping children failed");
                Vec::new()
            }
        }
    }
}
