// terminal.rs

use std::io::{self, Read};
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::OnceLock;

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices, Termios};
use nix::unistd;
use tracing::{debug, warn};

use crate::error::{Result, ShellError};

static SAVED_TERMIOS: OnceLock<libc::termios> = OnceLock::new();
static SAVED_FD: AtomicI32 = AtomicI32::new(libc::STDIN_FILENO);

/// Scoped ownership of the terminal line discipline.
///
/// While alive, input on `fd` arrives one byte at a time without kernel
/// echo. The attributes found at acquisition are put back on drop, and by a
/// signal handler if the process is killed before that.
pub struct RawMode {
    fd: RawFd,
    original: Termios,
    raw: Termios,
    active: bool,
}

impl RawMode {
    pub fn enable(fd: RawFd) -> Result<Self> {
        let original = tcgetattr(fd).map_err(ShellError::Terminal)?;
        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

        SAVED_FD.store(fd, Ordering::Relaxed);
        let _ = SAVED_TERMIOS.set(libc::termios::from(original.clone()));
        install_signal_restore();

        tcsetattr(fd, SetArg::TCSANOW, &raw).map_err(ShellError::Terminal)?;
        debug!(fd, "entered raw mode");
        Ok(Self {
            fd,
            original,
            raw,
            active: true,
        })
    }

    /// Hands the terminal back in its original mode until the returned scope drops.
    pub fn cooked(&mut self) -> CookedScope<'_> {
        if let Err(e) = self.restore() {
            report(&e);
        }
        CookedScope { mode: self }
    }

    fn restore(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        tcsetattr(self.fd, SetArg::TCSANOW, &self.original).map_err(ShellError::Terminal)?;
        self.active = false;
        Ok(())
    }

    fn reenter(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }
        tcsetattr(self.fd, SetArg::TCSANOW, &self.raw).map_err(ShellError::Terminal)?;
        self.active = true;
        Ok(())
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        match self.restore() {
            Ok(()) => debug!(fd = self.fd, "restored terminal mode"),
            Err(e) => report(&e),
        }
    }
}

pub struct CookedScope<'a> {
    mode: &'a mut RawMode,
}

impl Drop for CookedScope<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.mode.reenter() {
            report(&e);
        }
    }
}

fn report(err: &ShellError) {
    warn!(error = %err, "terminal mode change failed");
    eprintln!("rawsh: {}", err);
}

extern "C" fn restore_on_signal(signum: libc::c_int) {
    if let Some(saved) = SAVED_TERMIOS.get() {
        unsafe {
            libc::tcsetattr(SAVED_FD.load(Ordering::Relaxed), libc::TCSANOW, saved);
        }
    }
    unsafe {
        libc::signal(signum, libc::SIG_DFL);
        libc::raise(signum);
    }
}

fn install_signal_restore() {
    let action = SigAction::new(
        SigHandler::Handler(restore_on_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGINT, Signal::SIGTERM, Signal::SIGHUP, Signal::SIGQUIT] {
        // exec resets caught handlers, so children keep default dispositions
        if let Err(e) = unsafe { sigaction(signal, &action) } {
            warn!(?signal, error = %e, "cannot install terminal restore handler");
        }
    }
}

/// Unbuffered reader over standard input.
///
/// `std::io::stdin()` buffers ahead; bytes it slurps would be lost to
/// children that share the descriptor.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinBytes;

impl Read for StdinBytes {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        unistd::read(libc::STDIN_FILENO, buf).map_err(io::Error::from)
    }
}
