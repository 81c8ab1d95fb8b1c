//! TOCTOU-safe output writing
//!
//! A validated path is a precondition, not a guarantee: a symlink can be
//! planted between validation and the write. The open primitive here refuses
//! to follow a symlink in the final component at open time, so that race
//! fails loudly instead of writing through to an unintended location.

use crate::config::SandboxOptions;
use crate::sandbox::{allocate_unique_path, validate_output_path};
use crate::PathSecurityError;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

/// Result of a sandboxed write
#[derive(Debug)]
pub struct WriteOutcome {
    /// Canonical path the content lives at (or would have lived at)
    pub path: PathBuf,
    /// Whether the content was actually written; callers that degrade on a
    /// security violation construct a `written: false` outcome instead
    pub written: bool,
}

/// Scoped acquisition of writable handles that refuse symlinks at open time
pub struct SecureWriter;

impl SecureWriter {
    /// Opens `path` for writing, failing if the final component is a symlink
    ///
    /// On unix this is `O_NOFOLLOW` on the open itself, so there is no
    /// window between a symlink check and the open. On other platforms the
    /// symlink probe happens immediately before the open, which is weaker
    /// but the best available without platform-specific open flags.
    #[cfg(unix)]
    pub fn open_no_follow(path: &Path) -> Result<File, PathSecurityError> {
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .custom_flags(libc::O_NOFOLLOW)
            .open(path)
            .map_err(|e| {
                if e.raw_os_error() == Some(libc::ELOOP) {
                    PathSecurityError::SymlinkRefused {
                        path: path.to_path_buf(),
                    }
                } else {
                    PathSecurityError::Io {
                        path: path.to_path_buf(),
                        source: e,
                    }
                }
            })
    }

    #[cfg(not(unix))]
    pub fn open_no_follow(path: &Path) -> Result<File, PathSecurityError> {
        if let Ok(meta) = std::fs::symlink_metadata(path) {
            if meta.file_type().is_symlink() {
                return Err(PathSecurityError::SymlinkRefused {
                    path: path.to_path_buf(),
                });
            }
        }

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| PathSecurityError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

/// Writes `content` into `dir` under `file_name`, running the full output
/// pipeline: validate the directory, create it, atomically allocate a
/// collision-free name, and write through the no-follow open
///
/// `file_name` must be a bare name; separators or `..` in it are a
/// traversal attempt. Callers are expected to map a returned
/// [`PathSecurityError`] to their degraded non-writing output mode rather
/// than aborting the surrounding conversion.
pub fn write_validated(
    dir: &Path,
    file_name: &str,
    content: &[u8],
    opts: &SandboxOptions,
) -> Result<WriteOutcome, PathSecurityError> {
    let name_path = Path::new(file_name);
    let is_bare_name = name_path.components().count() == 1
        && matches!(name_path.components().next(), Some(Component::Normal(_)));
    if !is_bare_name {
        return Err(PathSecurityError::Traversal {
            path: file_name.to_string(),
            root: dir.display().to_string(),
        });
    }

    let canonical_dir = validate_output_path(dir, opts)?;
    std::fs::create_dir_all(&canonical_dir).map_err(|e| PathSecurityError::Io {
        path: canonical_dir.clone(),
        source: e,
    })?;

    let target = allocate_unique_path(&canonical_dir.join(file_name), true)?;

    let mut file = SecureWriter::open_no_follow(&target)?;
    file.write_all(content).map_err(|e| PathSecurityError::Io {
        path: target.clone(),
        source: e,
    })?;

    tracing::debug!("Wrote {} bytes to {}", content.len(), target.display());
    Ok(WriteOutcome {
        path: target,
        written: true,
    })
}
