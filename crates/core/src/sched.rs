// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[derive(Debug, thiserror::Error)]
pub enum SchedError {
    #[error("sched_setscheduler(SCHED_FIFO) failed: {0}")]
    SetScheduler(std::io::Error),
    #[error("realtime scheduling not available on this platform")]
    Unsupported,
}

/// Request SCHED_FIFO at maximum static priority for the calling process.
///
/// Failure means degraded edge jitter, not a broken toggle sequence, so the
/// caller treats it as a warning.
#[cfg(target_os = "linux")]
pub fn elevate_to_realtime() -> Result<(), SchedError> {
    let priority = unsafe { libc::sched_get_priority_max(libc::SCHED_FIFO) };
    if priority < 0 {
        return Err(SchedError::SetScheduler(std::io::Error::last_os_error()));
    }

    let param = libc::sched_param {
        sched_priority: priority,
    };
    let rc = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(SchedError::SetScheduler(std::io::Error::last_os_error()));
    }

    tracing::debug!("Elevated to SCHED_FIFO priority {}", priority);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub fn elevate_to_realtime() -> Result<(), SchedError> {
    Err(SchedError::Unsupported)
}
