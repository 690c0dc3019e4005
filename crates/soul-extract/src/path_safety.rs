//! Path-escape rejection (spec §8 "Path-escape safety", §9 "File
//! enumeration"). A candidate path is in-root only if its lexically
//! normalized form equals the root or has the root as a component-wise
//! prefix — `Path::starts_with` is component-aware, unlike the naive
//! string `startsWith` the spec calls out as explicitly wrong (it would
//! wrongly accept `/memory-root-evil` against root `/memory-root`).

use std::path::{Component, Path, PathBuf};

/// Resolves `.`/`..` components lexically, without touching the
/// filesystem — paths under a memory root may not exist yet when checked.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut stack: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                stack.pop();
            }
            Component::CurDir => {}
            other => stack.push(other),
        }
    }
    stack.into_iter().collect()
}

pub fn is_within_root(root: &Path, candidate: &Path) -> bool {
    let root_norm = normalize_lexical(root);
    let candidate_norm = normalize_lexical(candidate);
    candidate_norm == root_norm || candidate_norm.starts_with(&root_norm)
}

/// `true` if `path` is itself a symlink, checked via `symlink_metadata`
/// (stat-without-follow) — never `metadata`, which would follow it.
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}
