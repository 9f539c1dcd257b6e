// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! SIGCHLD handling (§5). A flag set from the handler tells the scheduler a
//! child exited; `suspend` blocks the scheduler until that flag is raised,
//! without the race of checking the flag and then sleeping separately.
//!
//! The `Guard` shape is lifted from `moss`'s signal module; the mask/suspend
//! dance itself mirrors the source's `sigprocmask(SIG_BLOCK, ...)` +
//! `sigsuspend(&orig_mask)` pairing around `wait_for_children`.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::sys::signal::{pthread_sigmask, sigsuspend, SigmaskHow};
use thiserror::Error;

static CHLD_FLAG: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_sigchld(_: std::os::raw::c_int) {
    CHLD_FLAG.store(true, Ordering::SeqCst);
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to install SIGCHLD handler: {0}")]
    Install(#[source] nix::Error),
    #[error("failed to adjust the signal mask: {0}")]
    Mask(#[source] nix::Error),
}

/// Installs the SIGCHLD handler for the process lifetime. Restores the
/// previous handler when dropped, matching `moss::signal::Guard`.
pub struct Guard {
    previous: SigAction,
}

impl Guard {
    pub fn install() -> Result<Self, Error> {
        let action = SigAction::new(SigHandler::Handler(handle_sigchld), SaFlags::SA_RESTART, SigSet::empty());
        // SAFETY: handle_sigchld only stores to an AtomicBool, async-signal-safe.
        let previous = unsafe { sigaction(Signal::SIGCHLD, &action) }.map_err(Error::Install)?;
        Ok(Self { previous })
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        // SAFETY: restoring a previously-installed handler.
        let _ = unsafe { sigaction(Signal::SIGCHLD, &self.previous) };
    }
}

/// Blocks the calling thread until a SIGCHLD has arrived since the last call
/// to `suspend` or `take_pending`, without missing a signal delivered between
/// the flag check and going to sleep.
///
/// Blocks SIGCHLD, checks the flag, and if clear atomically unblocks it while
/// suspending (`sigsuspend`) using the mask captured before blocking — so
/// SIGCHLD is unblocked only for the duration of the wait itself.
pub fn suspend() -> Result<(), Error> {
    let mut block = SigSet::empty();
    block.add(Signal::SIGCHLD);

    let mut orig_mask = SigSet::empty();
    pthread_sigmask(SigmaskHow::SIG_BLOCK, Some(&block), Some(&mut orig_mask)).map_err(Error::Mask)?;

    if !CHLD_FLAG.swap(false, Ordering::SeqCst) {
        let _ = sigsuspend(&orig_mask);
    }

    pthread_sigmask(SigmaskHow::SIG_SETMASK, Some(&orig_mask), None).map_err(Error::Mask)?;
    Ok(())
}

/// Consumes and returns the pending-SIGCHLD flag without blocking.
pub fn take_pending() -> bool {
    CHLD_FLAG.swap(false, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_pending_clears_the_flag() {
        CHLD_FLAG.store(true, Ordering::SeqCst);
        assert!(take_pending());
        assert!(!take_pending());
    }
}
