// PinPulse - Hardware PPS Pulse Generator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use memmap2::{MmapMut, MmapOptions};
use std::fs::OpenOptions;
use std::path::PathBuf;

/// Size of one mapped peripheral register page.
pub const WINDOW_BYTES: usize = 4096;
/// Same extent in 32-bit register words.
pub const WINDOW_WORDS: usize = WINDOW_BYTES / 4;

const PHYS_MEM_DEVICE: &str = "/dev/mem";

#[derive(Debug, thiserror::Error)]
pub enum MmioError {
    #[error("register word index {index} outside mapped window of 1024 words")]
    OutOfBounds { index: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("cannot open {path:?} for register access (run as root?): {source}")]
    Privilege {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("mmap of one page at physical {phys_addr:#x} failed: {source}")]
    Map {
        phys_addr: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("region offset {0:#x} is not page-aligned")]
    UnalignedOffset(u64),
}

/// Word-granular access to one 4 KiB page of peripheral registers.
///
/// All register traffic goes through this trait; nothing else in the crate
/// performs pointer arithmetic on the mapping.
pub trait RegisterWindow {
    fn read_word(&self, index: usize) -> Result<u32, MmioError>;
    fn write_word(&mut self, index: usize, value: u32) -> Result<(), MmioError>;
}

fn check_bounds(index: usize) -> Result<(), MmioError> {
    if index >= WINDOW_WORDS {
        return Err(MmioError::OutOfBounds { index });
    }
    Ok(())
}

/// A live mapping of one peripheral register page out of `/dev/mem`.
///
/// Created once per process and held for the process lifetime; the privileged
/// file descriptor is closed before `open` returns, since the mapping rather
/// than the descriptor provides ongoing access.
#[derive(Debug)]
pub struct DevMemWindow {
    mmap: MmapMut,
}

impl DevMemWindow {
    /// Map `WINDOW_BYTES` of peripheral space at `peripheral_base + region_offset`.
    pub fn open(peripheral_base: u64, region_offset: u64) -> Result<Self, MapError> {
        if region_offset % WINDOW_BYTES as u64 != 0 {
            return Err(MapError::UnalignedOffset(region_offset));
        }
        let phys_addr = peripheral_base + region_offset;

        // O_SYNC keeps register writes uncached and ordered.
        let file = {
            use std::os::unix::fs::OpenOptionsExt;
            OpenOptions::new()
                .read(true)
                .write(true)
                .custom_flags(libc::O_SYNC)
                .open(PHYS_MEM_DEVICE)
                .map_err(|source| MapError::Privilege {
                    path: PathBuf::from(PHYS_MEM_DEVICE),
                    source,
                })?
        };

        let mmap = unsafe {
            MmapOptions::new()
                .len(WINDOW_BYTES)
                .offset(phys_addr)
                .map_mut(&file)
                .map_err(|source| MapError::Map { phys_addr, source })?
        };
        // `file` drops here; the mapping outlives it.

        tracing::debug!(
            "Mapped {} bytes of peripheral space at {:#x}",
            WINDOW_BYTES,
            phys_addr
        );
        Ok(Self { mmap })
    }
}

impl RegisterWindow for DevMemWindow {
    fn read_word(&self, index: usize) -> Result<u32, MmioError> {
        check_bounds(index)?;
        let base = self.mmap.as_ptr() as *const u32;
        // In bounds per check above; volatile because the other side is hardware.
        Ok(unsafe { base.add(index).read_volatile() })
    }

    fn write_word(&mut self, index: usize, value: u32) -> Result<(), MmioError> {
        check_bounds(index)?;
        let base = self.mmap.as_mut_ptr() as *mut u32;
        unsafe { base.add(index).write_volatile(value) };
        Ok(())
    }
}

/// In-memory register window for hosted runs and tests.
///
/// Also journals every write so a harness can assert on the exact register
/// traffic, which a real set/clear register (write-only, write-1-to-act)
/// would not expose.
#[derive(Debug)]
pub struct BufferWindow {
    words: [u32; WINDOW_WORDS],
    journal: Vec<(usize, u32)>,
}

impl Default for BufferWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl BufferWindow {
    pub fn new() -> Self {
        Self {
            words: [0; WINDOW_WORDS],
            journal: Vec::new(),
        }
    }

    /// Writes recorded so far, in order, as `(word_index, value)`.
    pub fn journal(&self) -> &[(usize, u32)] {
        &self.journal
    }
}

impl RegisterWindow for BufferWindow {
    fn read_word(&self, index: usize) -> Result<u32, MmioError> {
        check_bounds(index)?;
        Ok(self.words[index])
    }

    fn write_word(&mut self, index: usize, value: u32) -> Result<(), MmioError> {
        check_bounds(index)?;
        self.words[index] = value;
        self.journal.push((index, value));
        Ok(())
    }
}
