//! Administrative privilege check.

use anyhow::{bail, Result};

pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

/// Fails unless `euid` is root.
pub fn check(euid: u32) -> Result<()> {
    if euid != 0 {
        bail!(
            "ramcheck must run as root (effective uid is {}). Re-run it with: sudo ramcheck",
            euid
        );
    }
    Ok(())
}
