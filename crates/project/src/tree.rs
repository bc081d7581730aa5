use serde::{Serialize, Serializer};
use std::fmt;

/// One node of a Rojo project tree.
///
/// Children keep their declared order so classification output is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeEntry {
    pub class_name: Option<String>,
    pub path: Option<String>,
    pub children: Vec<(String, TreeEntry)>,
}

impl TreeEntry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: TreeEntry) -> Self {
        self.children.push((name.into(), child));
        self
    }

    pub fn child(&self, name: &str) -> Option<&TreeEntry> {
        self.children
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// True when the node carries a class name or a filesystem path.
    pub fn has_signal(&self) -> bool {
        self.class_name.is_some() || self.path.is_some()
    }

    /// A node with no class, no path and no children carries no information.
    pub fn is_empty(&self) -> bool {
        !self.has_signal() && self.children.is_empty()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|(_, child)| child.node_count())
            .sum::<usize>()
    }
}

/// Stable identity of a node: the key path from the tree root.
///
/// Keys are kept as separate segments. A key may itself contain `/` or be
/// empty, so the joined form is not unique and only serves display and
/// configuration matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(Vec<String>);

impl NodeId {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn child(&self, key: &str) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.to_string());
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Slash-joined key path, as written in configuration. Empty for the root.
    pub fn joined(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.joined())
        }
    }
}

impl Serialize for NodeId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_join_keys() {
        let root = NodeId::root();
        let child = root.child("ReplicatedStorage").child("Shared");
        assert!(root.is_root());
        assert_eq!(child.joined(), "ReplicatedStorage/Shared");
        assert_eq!(root.to_string(), "<root>");
    }

    #[test]
    fn slash_and_empty_keys_keep_distinct_ids() {
        let root = NodeId::root();
        let flat = root.child("A/B");
        let nested = root.child("A").child("B");
        assert_eq!(flat.joined(), nested.joined());
        assert_ne!(flat, nested);

        let empty = root.child("");
        assert_eq!(empty.joined(), root.joined());
        assert_ne!(empty, root);
        assert!(!empty.is_root());
        assert_eq!(empty.segments(), [String::new()]);
    }

    #[test]
    fn builder_keeps_declared_order() {
        let tree = TreeEntry::new()
            .with_child("B", TreeEntry::new().with_path("b"))
            .with_child("A", TreeEntry::new().with_path("a"));
        let keys: Vec<_> = tree.children.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);
        assert_eq!(tree.node_count(), 3);
        assert!(tree.child("A").is_some_and(TreeEntry::has_signal));
        assert!(TreeEntry::new().is_empty());
    }
}
