// pipeline.rs

use std::ffi::CString;
use std::io::Write;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, close, dup2, execvp, fork, ForkResult, Pid};
use tracing::debug;

use crate::error::{Result, ShellError};
use crate::parser::Stage;

/// Exit code of a child whose program image could not be replaced.
pub const EXEC_FAILURE: i32 = 127;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageExit {
    pub pid: Pid,
    pub program: String,
    pub status: WaitStatus,
}

impl StageExit {
    /// `None` when the stage was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        match self.status {
            WaitStatus::Exited(_, code) => Some(code),
            _ => None,
        }
    }

    pub fn success(&self) -> bool {
        self.code() == Some(0)
    }
}

/// Endpoints of a pipeline. `None` inherits the shell's own descriptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PipelineIo<'a> {
    pub stdin: Option<BorrowedFd<'a>>,
    pub stdout: Option<BorrowedFd<'a>>,
}

pub fn run_pipeline(stages: &[Stage]) -> Result<Vec<StageExit>> {
    run_pipeline_with_io(stages, PipelineIo::default())
}

/// Runs `stages` as processes connected by pipes and waits for all of them.
///
/// Stage *i*'s stdout feeds stage *i+1*'s stdin. A single stage is a plain
/// fork/exec/wait with no pipe. If pipe or fork fails part way, the stages
/// already running are still waited for before the error is returned.
pub fn run_pipeline_with_io(stages: &[Stage], io: PipelineIo<'_>) -> Result<Vec<StageExit>> {
    if stages.is_empty() {
        return Ok(Vec::new());
    }
    let argvs = stages.iter().map(Stage::argv).collect::<Result<Vec<_>>>()?;
    // buffered output would otherwise be duplicated into every child
    let _ = std::io::stdout().flush();

    let mut children = Vec::with_capacity(stages.len());
    let spawned = spawn_stages(stages, &argvs, io, &mut children);
    let waited = wait_all(&children);
    spawned?;
    waited
}

fn spawn_stages(
    stages: &[Stage],
    argvs: &[Vec<CString>],
    io: PipelineIo<'_>,
    children: &mut Vec<(Pid, String)>,
) -> Result<()> {
    let last = stages.len() - 1;
    // read end of the previous stage's pipe; the only input held across iterations
    let mut input: Option<OwnedFd> = None;

    for (i, (stage, argv)) in stages.iter().zip(argvs).enumerate() {
        let (read_end, write_end) = if i < last {
            let (r, w) = open_pipe()?;
            (Some(r), Some(w))
        } else {
            (None, None)
        };

        let stdin = input
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .or_else(|| io.stdin.map(|fd| fd.as_raw_fd()));
        let stdout = write_end
            .as_ref()
            .map(AsRawFd::as_raw_fd)
            .or_else(|| io.stdout.map(|fd| fd.as_raw_fd()));
        let inherited: Vec<RawFd> = [&input, &read_end, &write_end]
            .into_iter()
            .flatten()
            .map(AsRawFd::as_raw_fd)
            .chain(io.stdin.map(|fd| fd.as_raw_fd()))
            .chain(io.stdout.map(|fd| fd.as_raw_fd()))
            .collect();

        // the child must not allocate, so its error prefix is built here
        let prefix = format!("{}: ", stage.program());

        match unsafe { fork() }.map_err(ShellError::Fork)? {
            ForkResult::Child => exec_stage(&prefix, argv, stdin, stdout, &inherited),
            ForkResult::Parent { child } => {
                debug!(pid = %child, stage = %stage, "spawned pipeline stage");
                children.push((child, stage.program().to_string()));
            }
        }

        drop(write_end);
        input = read_end;
    }
    Ok(())
}

/// Close-on-exec pipe; `dup2` clears the flag on the copies a child keeps.
fn open_pipe() -> Result<(OwnedFd, OwnedFd)> {
    let (r, w) = cloexec_pipe().map_err(ShellError::Pipe)?;
    // SAFETY: both descriptors were just created and have no other owner.
    Ok(unsafe { (OwnedFd::from_raw_fd(r), OwnedFd::from_raw_fd(w)) })
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn cloexec_pipe() -> nix::Result<(RawFd, RawFd)> {
    unistd::pipe2(nix::fcntl::OFlag::O_CLOEXEC)
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn cloexec_pipe() -> nix::Result<(RawFd, RawFd)> {
    use nix::fcntl::{fcntl, FcntlArg, FdFlag};

    let (r, w) = unistd::pipe()?;
    for fd in [r, w] {
        if let Err(e) = fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC)) {
            let _ = close(r);
            let _ = close(w);
            return Err(e);
        }
    }
    Ok((r, w))
}

/// Child side of a stage. Never returns: either execs or `_exit`s.
///
/// Runs between fork and exec, so it only makes async-signal-safe calls.
fn exec_stage(
    prefix: &str,
    argv: &[CString],
    stdin: Option<RawFd>,
    stdout: Option<RawFd>,
    inherited: &[RawFd],
) -> ! {
    for (from, to) in [(stdin, libc::STDIN_FILENO), (stdout, libc::STDOUT_FILENO)] {
        if let Some(from) = from {
            if let Err(e) = dup2(from, to) {
                child_exit(&[prefix, "cannot redirect: ", e.desc()]);
            }
        }
    }
    for &fd in inherited {
        if fd > libc::STDERR_FILENO {
            let _ = close(fd);
        }
    }

    let err = match execvp(argv[0].as_c_str(), argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    match err {
        Errno::ENOENT => child_exit(&[prefix, "command not found"]),
        e => child_exit(&[prefix, e.desc()]),
    }
}

fn child_exit(parts: &[&str]) -> ! {
    for part in parts.iter().chain(&["\n"]) {
        let _ = unistd::write(libc::STDERR_FILENO, part.as_bytes());
    }
    unsafe { libc::_exit(EXEC_FAILURE) }
}

fn wait_all(children: &[(Pid, String)]) -> Result<Vec<StageExit>> {
    let mut exits = Vec::with_capacity(children.len());
    let mut failure = None;
    for (pid, program) in children {
        match wait_child(*pid) {
            Ok(status) => {
                debug!(pid = %pid, program = %program, ?status, "pipeline stage finished");
                exits.push(StageExit {
                    pid: *pid,
                    program: program.clone(),
                    status,
                });
            }
            Err(e) => {
                failure.get_or_insert(e);
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(exits),
    }
}

fn wait_child(pid: Pid) -> Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            other => return other.map_err(ShellError::Wait),
        }
    }
}
