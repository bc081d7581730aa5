use crate::glob::to_recursive_glob;
use crate::{NodeId, TreeEntry};

/// Every `$path` in the subtree as a `dir/**` glob, in pre-order.
///
/// Duplicates across branches are kept; the consolidator removes them.
pub fn extract_paths(entry: &TreeEntry) -> Vec<String> {
    let mut out = Vec::new();
    collect_paths(entry, &NodeId::root(), &|_| false, &mut out);
    out
}

/// Like [`extract_paths`], but does not descend into children for which
/// `prune` returns true.
pub(crate) fn collect_paths(
    entry: &TreeEntry,
    id: &NodeId,
    prune: &dyn Fn(&NodeId) -> bool,
    out: &mut Vec<String>,
) {
    if let Some(path) = &entry.path {
        out.push(to_recursive_glob(path));
    }
    for (key, child) in &entry.children {
        let child_id = id.child(key);
        if prune(&child_id) {
            continue;
        }
        collect_paths(child, &child_id, prune, out);
    }
}
