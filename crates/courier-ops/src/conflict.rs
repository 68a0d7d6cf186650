//! Target resolution for copy and move.

use std::path::{Path, PathBuf};

use courier_core::ConflictPolicy;

/// Where a top-level source ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    /// Write to this path.
    Target(PathBuf),
    /// Leave the existing target alone.
    Skip,
}

/// Pick the target for a top-level source whose natural target is `candidate`.
pub(crate) fn resolve(
    candidate: PathBuf,
    policy: ConflictPolicy,
    exists: impl Fn(&Path) -> bool,
) -> Resolution {
    if !exists(&candidate) {
        return Resolution::Target(candidate);
    }
    match policy {
        ConflictPolicy::Overwrite => Resolution::Target(candidate),
        ConflictPolicy::Skip => Resolution::Skip,
        ConflictPolicy::AutoRename => Resolution::Target(auto_rename_path(&candidate, exists)),
    }
}

/// Generate an auto-renamed path to avoid conflicts.
///
/// For "file.txt", tries "file (1).txt", "file (2).txt", etc.
pub(crate) fn auto_rename_path(path: &Path, exists: impl Fn(&Path) -> bool) -> PathBuf {
    let parent = path.parent().unwrap_or(Path::new(""));
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path.extension().map(|e| e.to_string_lossy().into_owned());

    for i in 1..1000 {
        let new_name = match &extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };

        let new_path = parent.join(new_name);
        if !exists(&new_path) {
            return new_path;
        }
    }

    // Fallback: use timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let new_name = match &extension {
        Some(ext) => format!("{stem}_{timestamp}.{ext}"),
        None => format!("{stem}_{timestamp}"),
    };

    parent.join(new_name)
}
