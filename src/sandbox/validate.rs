//! Output path validation
//!
//! Canonicalizes and authorizes a target directory before anything is
//! written under it. Symlinks are resolved to their real target before any
//! authorization decision: a symlink's legitimacy is judged by where it
//! points, never by where it sits.

use crate::config::SandboxOptions;
use crate::PathSecurityError;
use std::path::{Component, Path, PathBuf};

#[cfg(unix)]
const SENSITIVE_ROOTS: &[&str] = &["/etc", "/sys", "/proc", "/dev", "/boot", "/root"];

#[cfg(windows)]
const SENSITIVE_ROOTS: &[&str] = &["C:\\Windows", "C:\\Program Files", "C:\\Program Files (x86)"];

#[cfg(not(any(unix, windows)))]
const SENSITIVE_ROOTS: &[&str] = &[];

/// Validates an output directory against traversal, sensitive-location, and
/// allowlist rules
///
/// The path is absolutized, lexically normalized, and symlink-resolved
/// through its deepest existing ancestor (the target directory itself may
/// not exist yet). With an allowlist supplied, the resolved path must
/// descend from one of the listed directories and working-directory
/// reasoning is bypassed; otherwise, with `block_sensitive_paths` set, the
/// resolved path must stay inside the current working directory.
///
/// Returns the fully resolved, absolute, symlink-free canonical path.
pub fn validate_output_path(
    path: &Path,
    opts: &SandboxOptions,
) -> Result<PathBuf, PathSecurityError> {
    let raw = path.as_os_str().to_string_lossy();
    if raw.trim().is_empty() {
        return Err(PathSecurityError::EmptyPath);
    }

    let cwd = std::env::current_dir().map_err(|e| PathSecurityError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let resolved = resolve_real_path(&absolute)?;

    if opts.block_sensitive_paths {
        for root in SENSITIVE_ROOTS {
            if resolved.starts_with(root) {
                return Err(PathSecurityError::SensitiveLocation {
                    path: resolved.display().to_string(),
                });
            }
        }
    }

    match &opts.allowed_base_dirs {
        Some(dirs) if dirs.is_empty() => Err(PathSecurityError::EmptyAllowlist),
        Some(dirs) => {
            for base in dirs {
                // A base that cannot be resolved cannot contain anything
                if let Ok(base_resolved) = resolve_real_path(base) {
                    if resolved.starts_with(&base_resolved) {
                        return Ok(resolved);
                    }
                }
            }
            Err(PathSecurityError::OutsideAllowedDirs {
                path: resolved.display().to_string(),
            })
        }
        None => {
            if opts.block_sensitive_paths {
                let root = resolve_real_path(&cwd)?;
                if !resolved.starts_with(&root) {
                    return Err(PathSecurityError::Traversal {
                        path: raw.to_string(),
                        root: root.display().to_string(),
                    });
                }
            }
            Ok(resolved)
        }
    }
}

/// Resolves an absolute path to its real, symlink-free form
///
/// The deepest existing prefix is canonicalized (following symlinks); the
/// non-existing remainder is appended after lexical normalization, so a
/// directory that has not been created yet still resolves deterministically.
fn resolve_real_path(path: &Path) -> Result<PathBuf, PathSecurityError> {
    let normalized = lexical_normalize(path);
    let components: Vec<_> = normalized.components().map(|c| c.as_os_str().to_os_string()).collect();

    for split in (1..=components.len()).rev() {
        let prefix: PathBuf = components[..split].iter().collect();
        if prefix.exists() {
            let canonical = prefix.canonicalize().map_err(|e| PathSecurityError::Io {
                path: prefix.clone(),
                source: e,
            })?;
            let rest: PathBuf = components[split..].iter().collect();
            return Ok(canonical.join(rest));
        }
    }

    // Nothing along the path exists, not even the filesystem root; treat the
    // normalized form as final
    Ok(normalized)
}

/// Collapses `.` and `..` components without touching the filesystem
///
/// `..` pops the previous component and never climbs above the root, which
/// is exactly what makes mid-path traversal sequences detectable after
/// resolution.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => result.push(component.as_os_str()),
            Component::CurDir => {}
            // "/.." is "/"; the input is always absolute by the time it
            // gets here, so a pop at the root just stays at the root
            Component::ParentDir => {
                result.pop();
            }
            Component::Normal(name) => result.push(name),
        }
    }
    result
}
