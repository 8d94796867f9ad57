//! # Thread Attachment
//!
//! The dump code expects its thread to be stopped under our ptrace. This is
//! the small piece of the crash reporter that arranges that for the CLI:
//! `PTRACE_ATTACH`, wait for the stop, and `PTRACE_DETACH` when done (also on
//! early return or panic, through `Drop`).
//!
//! If the first stop we see is not the `SIGSTOP` our attach caused, the thread
//! was stopped for its own reasons (a crash signal, typically). That signal is
//! handed back on detach so it is not lost.

use std::io;
use std::ptr;

use tombstone_core::{ThreadId, TombstoneError, TombstoneResult};
use tombstone_utils::{debug, info, warn};

/// RAII guard for a thread stopped under our ptrace.
#[derive(Debug)]
pub struct ThreadAttachment
{
    tid: ThreadId,
    pending_signal: libc::c_int,
    attached: bool,
}

impl ThreadAttachment
{
    /// Attach to `tid` and wait until it is stopped.
    pub fn attach(tid: ThreadId) -> TombstoneResult<Self>
    {
        // SAFETY: PTRACE_ATTACH takes no pointers.
        let rc = unsafe {
            libc::ptrace(
                libc::PTRACE_ATTACH,
                tid.raw(),
                ptr::null_mut::<libc::c_void>(),
                ptr::null_mut::<libc::c_void>(),
            )
        };
        if rc == -1 {
            return Err(TombstoneError::Attach {
                thread: tid,
                source: io::Error::last_os_error(),
            });
        }

        let mut attachment = Self {
            tid,
            pending_signal: 0,
            attached: true,
        };
        // On failure `attachment` is dropped here, which detaches.
        attachment.pending_signal = attachment.wait_for_stop()?;
        info!(tid = tid.raw(), "attached");
        Ok(attachment)
    }

    /// Thread this guard holds.
    pub fn tid(&self) -> ThreadId
    {
        self.tid
    }

    /// Detach now, reporting failure instead of only logging it.
    pub fn detach(mut self) -> TombstoneResult<()>
    {
        self.attached = false;
        detach_raw(self.tid, self.pending_signal)
    }

    /// Wait for the attach stop; returns the signal to re-deliver on detach.
    fn wait_for_stop(&self) -> TombstoneResult<libc::c_int>
    {
        loop {
            let mut status: libc::c_int = 0;
            // SAFETY: `status` is a valid out-pointer for the duration of the call.
            let rc = unsafe { libc::waitpid(self.tid.raw(), &mut status, libc::__WALL) };
            if rc == -1 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(TombstoneError::Attach {
                    thread: self.tid,
                    source: err,
                });
            }

            if libc::WIFSTOPPED(status) {
                let signal = libc::WSTOPSIG(status);
                debug!(tid = self.tid.raw(), signal, "thread stopped");
                return Ok(if signal == libc::SIGSTOP { 0 } else { signal });
            }
            if libc::WIFEXITED(status) || libc::WIFSIGNALED(status) {
                return Err(TombstoneError::Attach {
                    thread: self.tid,
                    source: io::Error::new(io::ErrorKind::NotFound, "thread exited before it stopped"),
                });
            }
        }
    }
}

impl Drop for ThreadAttachment
{
    fn drop(&mut self)
    {
        if self.attached {
            self.attached = false;
            if let Err(err) = detach_raw(self.tid, self.pending_signal) {
                warn!(error = %err, "detach on drop failed");
            }
        }
    }
}

fn detach_raw(tid: ThreadId, signal: libc::c_int) -> TombstoneResult<()>
{
    // SAFETY: PTRACE_DETACH takes the signal number in the data argument.
    let rc = unsafe {
        libc::ptrace(
            libc::PTRACE_DETACH,
            tid.raw(),
            ptr::null_mut::<libc::c_void>(),
            signal as libc::c_long as *mut libc::c_void,
        )
    };
    if rc == -1 {
        return Err(TombstoneError::Detach {
            thread: tid,
            source: io::Error::last_os_error(),
        });
    }
    info!(tid = tid.raw(), signal, "detached");
    Ok(())
}
