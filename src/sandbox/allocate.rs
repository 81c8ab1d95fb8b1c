//! Unique output path allocation
//!
//! Finds a collision-free file name under a base path using a stem-suffix
//! scheme (`report.md`, `report-1.md`, `report-2.md`, ...). Atomic mode
//! claims the winning name with an exclusive create, which is correct even
//! across process boundaries on a shared filesystem.

use crate::PathSecurityError;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on suffix probing before giving up
const MAX_SUFFIX: u32 = 10_000;

/// Allocates a collision-free path derived from `base`
///
/// # Arguments
///
/// * `base` - The desired file path; siblings get `-1`, `-2`, ... appended
///   to the stem
/// * `atomic` - When true, the returned name is claimed by creating a
///   zero-byte placeholder with an exclusive create, so no two concurrent
///   callers (threads or processes) ever receive the same path. When false,
///   the first unoccupied name is returned without creating anything, which
///   carries a race window and suits single-threaded callers only.
pub fn allocate_unique_path(base: &Path, atomic: bool) -> Result<PathBuf, PathSecurityError> {
    for suffix in 0..=MAX_SUFFIX {
        let candidate = candidate_for(base, suffix);

        if atomic {
            // Check and claim in one filesystem operation
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(_) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(PathSecurityError::Io {
                        path: candidate,
                        source: e,
                    });
                }
            }
        } else if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(PathSecurityError::Io {
        path: base.to_path_buf(),
        source: io::Error::other(format!(
            "exhausted {} unique-name suffixes for {}",
            MAX_SUFFIX,
            base.display()
        )),
    })
}

/// Builds the candidate path for a given suffix number
///
/// Suffix 0 is the base path itself; `report.md` with suffix 3 becomes
/// `report-3.md`.
fn candidate_for(base: &Path, suffix: u32) -> PathBuf {
    if suffix == 0 {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}-{}", stem, suffix),
    };

    match base.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}
