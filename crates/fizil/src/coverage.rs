//! The coverage channel between the fuzzer and the instrumented target.
//!
//! A region is a uniquely named, memory-mapped file in the system temp
//! directory. The target locates it through the environment (see
//! [`crate::instrumentation`]) and writes edge hits into it; the core only
//! ever snapshots the raw bytes. Each region belongs exclusively to its
//! creator and is unlinked on drop.

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    process::Command,
    sync::atomic::{AtomicU64, Ordering},
};

use anyhow::Context;
use memmap2::MmapMut;
use tracing::warn;

use crate::instrumentation;

static NEXT_REGION: AtomicU64 = AtomicU64::new(0);

#[derive(Debug)]
pub struct CoverageMap {
    path: PathBuf,
    map: MmapMut,
}

impl CoverageMap {
    /// Allocates a fresh zero-filled region. The name is unique within the
    /// machine: it combines the fuzzer's pid with a monotonic counter.
    pub fn create(map_size: usize) -> anyhow::Result<Self> {
        let serial = NEXT_REGION.fetch_add(1, Ordering::Relaxed);
        let name = format!("fizil-map-{}-{serial}", std::process::id());
        let path = std::env::temp_dir().join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&path)
            .with_context(|| format!("Creating coverage region {}", path.display()))?;
        file.set_len(map_size as u64)
            .context("Sizing coverage region")?;
        // SAFETY: the file was just created with a unique name; nothing else
        // maps it while this handle is alive.
        let map = unsafe { MmapMut::map_mut(&file) }.context("Mapping coverage region")?;
        Ok(Self { path, map })
    }

    /// The region's name: the absolute path of the backing file, exactly as
    /// published to the target.
    pub fn name(&self) -> String {
        self.path.display().to_string()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.fill(0);
    }

    /// Copies out the current contents.
    pub fn snapshot(&self) -> Vec<u8> {
        self.map.to_vec()
    }

    /// Publishes the region into a child's environment.
    pub fn apply_to_command(&self, command: &mut Command) {
        command.env(instrumentation::SHARED_MEMORY_ENV, self.name());
        command.env(
            instrumentation::SHARED_MEMORY_SIZE_ENV,
            self.len().to_string(),
        );
    }

    /// Publishes the region into this process's own environment, for a
    /// target loaded in-process.
    ///
    /// # Safety
    /// Mutates the process environment; the caller must guarantee no other
    /// thread is running yet (the in-process runner is constructed before
    /// any worker threads exist, and that mode is serial throughout).
    pub unsafe fn publish_in_process(&self) {
        unsafe {
            std::env::set_var(instrumentation::SHARED_MEMORY_ENV, self.name());
            std::env::set_var(
                instrumentation::SHARED_MEMORY_SIZE_ENV,
                self.len().to_string(),
            );
        }
    }
}

impl Drop for CoverageMap {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            warn!(%err, path = %self.path.display(), "Failed to remove coverage region");
        }
    }
}
