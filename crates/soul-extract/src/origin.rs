//! Origin-category inference from a file's path segments relative to the
//! memory root (spec §4.2 step 2).

use soul_core::KNOWN_ORIGIN_CATEGORIES;
use std::path::Path;

/// Case-folds and splits on either slash variant, then matches each
/// segment against the known origin set. The first matching segment wins;
/// no match falls back to `"other"`.
pub fn classify_origin(root: &Path, file_path: &Path) -> String {
    let relative = file_path.strip_prefix(root).unwrap_or(file_path);
    let normalized = relative.to_string_lossy().replace('\\', "/").to_lowercase();

    for segment in normalized.split('/') {
        if KNOWN_ORIGIN_CATEGORIES.contains(&segment) {
            return segment.to_string();
        }
    }

    "other".to_string()
}
