// ============================================================
// Layer 6 — Accelerator Probe
// ============================================================
// Counts the accelerators visible on this host. The NVIDIA
// driver lists one directory per GPU under
//
//   /proc/driver/nvidia/gpus/<pci-bus-id>/
//
// A missing directory means no driver, which counts as zero.
// The command line can override the probe entirely.
//
// Only NVIDIA devices are seen. The Accelerator backend is Wgpu,
// which also drives AMD, Intel and Metal GPUs; on those hosts the
// probe reports zero and the run falls back to the CPU unless
// --accelerators is given.

use std::{fs, path::Path};

const NVIDIA_GPUS_DIR: &str = "/proc/driver/nvidia/gpus";

pub fn accelerator_count() -> usize {
    count_entries(Path::new(NVIDIA_GPUS_DIR))
}

fn count_entries(dir: &Path) -> usize {
    let count = fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0);
    tracing::debug!("Found {} accelerator(s) under '{}'", count, dir.display());
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dir_counts_zero() {
        assert_eq!(count_entries(Path::new("/no/such/driver/dir")), 0);
    }

    #[test]
    fn test_counts_one_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("0000:01:00.0")).unwrap();
        fs::create_dir(dir.path().join("0000:02:00.0")).unwrap();
        assert_eq!(count_entries(dir.path()), 2);
    }
}
