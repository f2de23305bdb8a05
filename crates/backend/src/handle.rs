// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process handles returned by backends

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::process::ExitStatus;
use tokio::process::{Child, ChildStderr, ChildStdout};

/// A running invocation: two output streams and an exit-code future.
///
/// The cab runtime takes the streams, pumps them through the wrangler
/// pipeline, then awaits [`ProcessHandle::wait`].
#[derive(Debug)]
pub struct ProcessHandle {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
}

impl ProcessHandle {
    pub fn new(mut child: Child) -> Self {
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        ProcessHandle {
            child,
            stdout,
            stderr,
        }
    }

    /// Take the standard output stream (once).
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.stdout.take()
    }

    /// Take the standard error stream (once).
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.stderr.take()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Deliver an interrupt, as on operator cancellation. The process
    /// gets a chance to clean up; [`ProcessHandle::kill`] is the
    /// escalation.
    pub fn interrupt(&self) {
        if let Some(pid) = self.child.id() {
            tracing::debug!(pid, "sending SIGINT");
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
        }
    }

    /// Force-kill the process.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// OS process id, while running.
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }
}
