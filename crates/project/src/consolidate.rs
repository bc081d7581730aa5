use crate::glob::{glob_base, has_wildcard, is_recursive, RECURSIVE_SUFFIX};
use std::collections::{HashMap, HashSet};

/// Vendor roots whose package folders are collapsed by default (Wally's install dir).
pub const DEFAULT_GROUPABLE_ROOTS: &[&str] = &["Packages"];

/// Shrinks a glob list without ever shrinking the set of files it covers.
///
/// 1. A glob is dropped when an already accepted `dir/**` glob covers it.
/// 2. Under each groupable root, two or more surviving globs that share the
///    root's immediate child are replaced by `root/child/**`.
///
/// Survivors keep their input order; a grouped glob takes the position of its
/// first member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consolidator {
    groupable_roots: Vec<String>,
}

impl Default for Consolidator {
    fn default() -> Self {
        Self::new(DEFAULT_GROUPABLE_ROOTS.iter().copied())
    }
}

impl Consolidator {
    pub fn new<I, S>(groupable_roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groupable_roots: groupable_roots
                .into_iter()
                .map(|root| {
                    let root: String = root.into();
                    root.trim_matches('/').to_string()
                })
                .filter(|root| !root.is_empty())
                .collect(),
        }
    }

    pub fn groupable_roots(&self) -> &[String] {
        &self.groupable_roots
    }

    pub fn consolidate(&self, paths: &[String]) -> Vec<String> {
        if paths.len() <= 1 {
            return paths.to_vec();
        }

        let survivors = drop_dominated(paths);
        let grouped = self.group_siblings(&survivors);
        if grouped.len() != paths.len() {
            log::debug!(
                "Consolidated {} globs into {}",
                paths.len(),
                grouped.len()
            );
        }
        grouped
    }

    fn group_siblings(&self, paths: &[&String]) -> Vec<String> {
        if self.groupable_roots.is_empty() {
            return paths.iter().map(|p| (*p).clone()).collect();
        }

        let keys: Vec<Option<String>> = paths.iter().map(|p| self.group_key(p)).collect();
        let mut sizes: HashMap<&str, usize> = HashMap::new();
        for key in keys.iter().flatten() {
            *sizes.entry(key.as_str()).or_default() += 1;
        }

        let mut emitted = HashSet::new();
        let mut out = Vec::with_capacity(paths.len());
        for (path, key) in paths.iter().zip(&keys) {
            match key {
                Some(key) if sizes[key.as_str()] > 1 => {
                    if emitted.insert(key.as_str()) {
                        out.push(format!("{key}{RECURSIVE_SUFFIX}"));
                    }
                }
                _ => out.push((*path).clone()),
            }
        }
        out
    }

    /// `Root/Sub` for a path strictly below `Root/Sub` under a groupable root.
    fn group_key(&self, path: &str) -> Option<String> {
        let base = glob_base(path);
        self.groupable_roots.iter().find_map(|root| {
            let rest = base.strip_prefix(root.as_str())?.strip_prefix('/')?;
            let (child, below) = rest.split_once('/')?;
            if child.is_empty() || below.is_empty() || has_wildcard(child) {
                return None;
            }
            Some(format!("{root}/{child}"))
        })
    }
}

/// Consolidate with the default groupable roots.
pub fn consolidate(paths: &[String]) -> Vec<String> {
    Consolidator::default().consolidate(paths)
}

fn drop_dominated(paths: &[String]) -> Vec<&String> {
    let mut order: Vec<usize> = (0..paths.len()).collect();
    // Shorter is more general; the sort is stable, so ties keep input order.
    order.sort_by_key(|&idx| paths[idx].len());

    let mut accepted: Vec<&str> = Vec::new();
    let mut keep = vec![false; paths.len()];
    for idx in order {
        let candidate = paths[idx].as_str();
        if accepted.iter().any(|general| covers(general, candidate)) {
            continue;
        }
        accepted.push(candidate);
        keep[idx] = true;
    }

    paths
        .iter()
        .zip(keep)
        .filter_map(|(path, keep)| keep.then_some(path))
        .collect()
}

/// Whether `general` already matches everything `specific` matches.
///
/// Only recursive globs cover other entries; a plain path covers just itself.
fn covers(general: &str, specific: &str) -> bool {
    if general == specific {
        return true;
    }
    if !is_recursive(general) {
        return false;
    }
    let general_base = glob_base(general);
    let specific_base = glob_base(specific);
    general_base.is_empty()
        || specific_base == general_base
        || specific_base
            .strip_prefix(general_base)
            .is_some_and(|rest| rest.starts_with('/'))
}
