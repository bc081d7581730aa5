use crate::{ContextMap, NodeId, RuntimeContext, ServiceMetadata, TreeEntry};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Identifiers (node key, class name or node path) configured per context.
pub type ConfiguredPaths = ContextMap<BTreeSet<String>>;

/// Why a node ended up in its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    /// Key, class name or node path listed in the configuration.
    Configured,
    /// Class name found in [`ServiceMetadata`].
    Metadata,
    /// Class name already claimed by a configured node elsewhere in the tree.
    ClaimedClass,
    /// Carries a class name or path that nothing recognises.
    Unknown,
    /// Follows its nearest classified ancestor.
    Inherited,
}

impl AssignmentSource {
    /// Every source except [`AssignmentSource::Inherited`] starts a new subtree.
    pub fn is_decision(self) -> bool {
        !matches!(self, AssignmentSource::Inherited)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            AssignmentSource::Configured => "configured",
            AssignmentSource::Metadata => "metadata",
            AssignmentSource::ClaimedClass => "claimed_class",
            AssignmentSource::Unknown => "unknown",
            AssignmentSource::Inherited => "inherited",
        }
    }
}

impl fmt::Display for AssignmentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Assignment<'a> {
    pub id: NodeId,
    pub entry: &'a TreeEntry,
    pub source: AssignmentSource,
}

/// Nodes per runtime context. A node appears in at most one context.
#[derive(Debug, Default)]
pub struct Classification<'a> {
    contexts: ContextMap<Vec<Assignment<'a>>>,
    claimed: HashMap<NodeId, (RuntimeContext, AssignmentSource)>,
}

impl<'a> Classification<'a> {
    pub fn entries(&self, context: RuntimeContext) -> &[Assignment<'a>] {
        self.contexts.get(context)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuntimeContext, &[Assignment<'a>])> {
        self.contexts
            .iter()
            .map(|(ctx, entries)| (ctx, entries.as_slice()))
    }

    pub fn context_of(&self, id: &NodeId) -> Option<RuntimeContext> {
        self.claimed.get(id).map(|(ctx, _)| *ctx)
    }

    pub fn source_of(&self, id: &NodeId) -> Option<AssignmentSource> {
        self.claimed.get(id).map(|(_, source)| *source)
    }

    pub fn is_decision_root(&self, id: &NodeId) -> bool {
        self.source_of(id).is_some_and(AssignmentSource::is_decision)
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }

    fn claim(&mut self, context: RuntimeContext, assignment: Assignment<'a>) -> bool {
        if self.claimed.contains_key(&assignment.id) {
            return false;
        }
        self.claimed
            .insert(assignment.id.clone(), (context, assignment.source));
        self.contexts.get_mut(context).push(assignment);
        true
    }
}

/// Assigns runtime contexts to a project tree.
///
/// Precedence at every node: configuration, then a class name claimed by a
/// configured node, then service metadata, then the inherited context, and
/// finally `Unknown` for nodes that still carry a class name or path.
pub struct Classifier<'c> {
    configured: &'c ConfiguredPaths,
    metadata: &'c ServiceMetadata,
}

impl<'c> Classifier<'c> {
    pub fn new(configured: &'c ConfiguredPaths, metadata: &'c ServiceMetadata) -> Self {
        Self {
            configured,
            metadata,
        }
    }

    pub fn classify<'a>(&self, root: &'a TreeEntry) -> Classification<'a> {
        let root_id = NodeId::root();

        let mut claims = HashMap::new();
        for (key, child) in &root.children {
            self.collect_claims(key, child, &mut claims);
        }

        let mut result = Classification::default();
        if root.path.is_some() {
            result.claim(
                RuntimeContext::Unknown,
                Assignment {
                    id: root_id.clone(),
                    entry: root,
                    source: AssignmentSource::Unknown,
                },
            );
        }
        for (key, child) in &root.children {
            self.visit(key, child, root_id.child(key), None, &claims, &mut result);
        }

        log::debug!(
            "Classified {} nodes ({})",
            result.len(),
            result
                .iter()
                .map(|(ctx, entries)| format!("{ctx}={}", entries.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        result
    }

    /// Contexts whose identifiers match the node. The node path is only
    /// compared when `id` is given.
    fn configured_contexts(
        &self,
        key: &str,
        id: Option<&NodeId>,
        class_name: Option<&str>,
    ) -> Vec<RuntimeContext> {
        let joined = id.map(NodeId::joined);
        RuntimeContext::ALL
            .into_iter()
            .filter(|ctx| {
                let identifiers = self.configured.get(*ctx);
                identifiers.contains(key)
                    || joined.as_ref().is_some_and(|path| identifiers.contains(path))
                    || class_name.is_some_and(|class| identifiers.contains(class))
            })
            .collect()
    }

    /// First pass: class names of configured nodes, so fallback resolution
    /// does not depend on sibling order.
    ///
    /// Only key and class name matches claim a class. A node configured by
    /// its path is a one-off and leaves other nodes of its class alone.
    fn collect_claims<'a>(
        &self,
        key: &str,
        entry: &'a TreeEntry,
        claims: &mut HashMap<&'a str, RuntimeContext>,
    ) {
        let class_name = entry.class_name.as_deref();
        if let (Some(class), Some(ctx)) = (
            class_name,
            self.configured_contexts(key, None, class_name).first(),
        ) {
            claims.entry(class).or_insert(*ctx);
        }
        for (child_key, child) in &entry.children {
            self.collect_claims(child_key, child, claims);
        }
    }

    fn visit<'a>(
        &self,
        key: &str,
        entry: &'a TreeEntry,
        id: NodeId,
        inherited: Option<RuntimeContext>,
        claims: &HashMap<&'a str, RuntimeContext>,
        result: &mut Classification<'a>,
    ) {
        if result.claimed.contains_key(&id) {
            return;
        }

        let context = match self.decide(key, &id, entry, inherited, claims) {
            Some((ctx, source)) => {
                if source.is_decision() || entry.has_signal() {
                    result.claim(
                        ctx,
                        Assignment {
                            id: id.clone(),
                            entry,
                            source,
                        },
                    );
                }
                Some(ctx)
            }
            None => None,
        };

        for (child_key, child) in &entry.children {
            self.visit(child_key, child, id.child(child_key), context, claims, result);
        }
    }

    fn decide(
        &self,
        key: &str,
        id: &NodeId,
        entry: &TreeEntry,
        inherited: Option<RuntimeContext>,
        claims: &HashMap<&str, RuntimeContext>,
    ) -> Option<(RuntimeContext, AssignmentSource)> {
        let class_name = entry.class_name.as_deref();

        let configured = self.configured_contexts(key, Some(id), class_name);
        if let Some(&ctx) = configured.first() {
            if configured.len() > 1 {
                log::warn!(
                    "`{id}` is configured for several contexts ({}); using {ctx}",
                    configured
                        .iter()
                        .map(|c| c.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            return Some((ctx, AssignmentSource::Configured));
        }

        if let Some(class) = class_name {
            if let Some(&claimed) = claims.get(class) {
                return Some(match inherited {
                    Some(ctx) => (ctx, AssignmentSource::Inherited),
                    None => (claimed, AssignmentSource::ClaimedClass),
                });
            }
            if let Some(ctx) = self.metadata.lookup(class) {
                return Some((ctx, AssignmentSource::Metadata));
            }
        }

        match inherited {
            Some(ctx) => Some((ctx, AssignmentSource::Inherited)),
            None if entry.has_signal() => {
                Some((RuntimeContext::Unknown, AssignmentSource::Unknown))
            }
            None => None,
        }
    }
}

/// Classify with the built-in service table.
pub fn classify<'a>(root: &'a TreeEntry, configured: &ConfiguredPaths) -> Classification<'a> {
    Classifier::new(configured, ServiceMetadata::builtin()).classify(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(classification: &Classification<'_>, ctx: RuntimeContext) -> Vec<String> {
        classification
            .entries(ctx)
            .iter()
            .map(|a| a.id.joined())
            .collect()
    }

    fn configured(pairs: &[(RuntimeContext, &str)]) -> ConfiguredPaths {
        let mut map = ConfiguredPaths::default();
        for (ctx, ident) in pairs {
            map.get_mut(*ctx).insert((*ident).to_string());
        }
        map
    }

    fn sample_tree() -> TreeEntry {
        TreeEntry::new()
            .with_class("DataModel")
            .with_child(
                "ReplicatedStorage",
                TreeEntry::new()
                    .with_class("ReplicatedStorage")
                    .with_child("Shared", TreeEntry::new().with_path("src/shared"))
                    .with_child("Packages", TreeEntry::new().with_path("Packages")),
            )
            .with_child(
                "ServerScriptService",
                TreeEntry::new()
                    .with_class("ServerScriptService")
                    .with_child("Server", TreeEntry::new().with_path("src/server")),
            )
    }

    #[test]
    fn metadata_classifies_services_and_children_inherit() {
        let tree = sample_tree();
        let result = classify(&tree, &ConfiguredPaths::default());

        assert_eq!(
            ids(&result, RuntimeContext::Shared),
            vec![
                "ReplicatedStorage",
                "ReplicatedStorage/Shared",
                "ReplicatedStorage/Packages"
            ]
        );
        assert_eq!(
            ids(&result, RuntimeContext::Server),
            vec!["ServerScriptService", "ServerScriptService/Server"]
        );
        assert!(result.entries(RuntimeContext::Unknown).is_empty());
        assert_eq!(
            result.source_of(&NodeId::root().child("ReplicatedStorage")),
            Some(AssignmentSource::Metadata)
        );
        assert_eq!(
            result.source_of(&NodeId::root().child("ReplicatedStorage").child("Shared")),
            Some(AssignmentSource::Inherited)
        );
    }

    #[test]
    fn configuration_beats_metadata() {
        let tree = sample_tree();
        let config = configured(&[(RuntimeContext::Client, "ReplicatedStorage")]);
        let result = classify(&tree, &config);

        assert_eq!(
            ids(&result, RuntimeContext::Client),
            vec![
                "ReplicatedStorage",
                "ReplicatedStorage/Shared",
                "ReplicatedStorage/Packages"
            ]
        );
        assert!(result.entries(RuntimeContext::Shared).is_empty());
    }

    #[test]
    fn child_match_overrides_inherited_context() {
        let tree = sample_tree();
        let config = configured(&[(RuntimeContext::Testing, "ReplicatedStorage/Packages")]);
        let result = classify(&tree, &config);

        assert_eq!(
            ids(&result, RuntimeContext::Shared),
            vec!["ReplicatedStorage", "ReplicatedStorage/Shared"]
        );
        assert_eq!(
            ids(&result, RuntimeContext::Testing),
            vec!["ReplicatedStorage/Packages"]
        );
    }

    #[test]
    fn unrecognised_class_is_unknown_unless_inherited() {
        let tree = TreeEntry::new()
            .with_child(
                "Tools",
                TreeEntry::new()
                    .with_class("Folder")
                    .with_child("Gizmo", TreeEntry::new().with_class("Model")),
            )
            .with_child(
                "ServerStorage",
                TreeEntry::new()
                    .with_class("ServerStorage")
                    .with_child("Assets", TreeEntry::new().with_class("Folder")),
            );
        let result = classify(&tree, &ConfiguredPaths::default());

        assert_eq!(ids(&result, RuntimeContext::Unknown), vec!["Tools", "Tools/Gizmo"]);
        assert_eq!(
            result.source_of(&NodeId::root().child("Tools").child("Gizmo")),
            Some(AssignmentSource::Inherited)
        );
        assert_eq!(
            ids(&result, RuntimeContext::Server),
            vec!["ServerStorage", "ServerStorage/Assets"]
        );
    }

    #[test]
    fn signal_free_nodes_pass_context_through() {
        let tree = TreeEntry::new().with_child(
            "StarterPlayer",
            TreeEntry::new().with_class("StarterPlayer").with_child(
                "Group",
                TreeEntry::new().with_child("Client", TreeEntry::new().with_path("src/client")),
            ),
        );
        let result = classify(&tree, &ConfiguredPaths::default());

        // `Group` has no class or path, so it is not listed, but its child inherits.
        assert_eq!(
            ids(&result, RuntimeContext::Client),
            vec!["StarterPlayer", "StarterPlayer/Group/Client"]
        );
    }

    #[test]
    fn claimed_class_skips_metadata_fallback() {
        let tree = TreeEntry::new()
            .with_child(
                "Gameplay",
                TreeEntry::new()
                    .with_class("ServerStorage")
                    .with_path("src/gameplay"),
            )
            .with_child(
                "ServerStorage",
                TreeEntry::new()
                    .with_class("ServerStorage")
                    .with_path("src/storage"),
            );
        let config = configured(&[(RuntimeContext::Shared, "Gameplay")]);
        let result = classify(&tree, &config);

        assert_eq!(
            ids(&result, RuntimeContext::Shared),
            vec!["Gameplay", "ServerStorage"]
        );
        assert_eq!(
            result.source_of(&NodeId::root().child("ServerStorage")),
            Some(AssignmentSource::ClaimedClass)
        );
        assert!(result.entries(RuntimeContext::Server).is_empty());
    }

    #[test]
    fn path_without_context_is_unknown() {
        let tree = TreeEntry::new()
            .with_path("lib")
            .with_child("Loose", TreeEntry::new().with_path("loose"))
            .with_child("Empty", TreeEntry::new().with_child("Deeper", TreeEntry::new()));
        let result = classify(&tree, &ConfiguredPaths::default());

        assert_eq!(ids(&result, RuntimeContext::Unknown), vec!["", "Loose"]);
        assert!(result.is_decision_root(&NodeId::root().child("Loose")));
        assert_eq!(result.context_of(&NodeId::root().child("Empty")), None);
    }

    #[test]
    fn first_configured_context_wins() {
        let tree = sample_tree();
        let config = configured(&[
            (RuntimeContext::Server, "ServerScriptService"),
            (RuntimeContext::Client, "ServerScriptService"),
        ]);
        let result = classify(&tree, &config);
        assert_eq!(
            ids(&result, RuntimeContext::Client),
            vec!["ServerScriptService", "ServerScriptService/Server"]
        );
        assert!(result.entries(RuntimeContext::Server).is_empty());
    }

    #[test]
    fn custom_metadata_is_honoured() {
        let tree = TreeEntry::new().with_child(
            "Specs",
            TreeEntry::new().with_class("Folder").with_path("specs"),
        );
        let meta = ServiceMetadata::from_pairs([("Folder", RuntimeContext::Testing)]);
        let config = ConfiguredPaths::default();
        let result = Classifier::new(&config, &meta).classify(&tree);
        assert_eq!(ids(&result, RuntimeContext::Testing), vec!["Specs"]);
    }

    #[test]
    fn node_path_match_does_not_claim_its_class() {
        let tree = TreeEntry::new()
            .with_child(
                "ReplicatedStorage",
                TreeEntry::new()
                    .with_class("ReplicatedStorage")
                    .with_child(
                        "Tests",
                        TreeEntry::new().with_class("Folder").with_path("tests"),
                    ),
            )
            .with_child(
                "Tools",
                TreeEntry::new().with_class("Folder").with_path("tools"),
            );
        let config = configured(&[(RuntimeContext::Testing, "ReplicatedStorage/Tests")]);
        let result = classify(&tree, &config);

        assert_eq!(
            ids(&result, RuntimeContext::Testing),
            vec!["ReplicatedStorage/Tests"]
        );
        assert_eq!(ids(&result, RuntimeContext::Unknown), vec!["Tools"]);
        assert_eq!(
            result.source_of(&NodeId::root().child("Tools")),
            Some(AssignmentSource::Unknown)
        );
    }

    #[test]
    fn colliding_joined_ids_are_classified_separately() {
        let tree = TreeEntry::new()
            .with_path("lib")
            .with_child("A/B", TreeEntry::new().with_path("x"))
            .with_child(
                "A",
                TreeEntry::new()
                    .with_class("ServerScriptService")
                    .with_child("B", TreeEntry::new().with_path("y")),
            )
            .with_child(
                "",
                TreeEntry::new()
                    .with_class("ServerScriptService")
                    .with_path("z"),
            );
        let result = classify(&tree, &ConfiguredPaths::default());

        assert_eq!(ids(&result, RuntimeContext::Unknown), vec!["", "A/B"]);
        assert_eq!(ids(&result, RuntimeContext::Server), vec!["A", "A/B", ""]);
        assert_eq!(
            result.context_of(&NodeId::root().child("A").child("B")),
            Some(RuntimeContext::Server)
        );
        assert_eq!(
            result.context_of(&NodeId::root().child("")),
            Some(RuntimeContext::Server)
        );
        assert_eq!(result.context_of(&NodeId::root()), Some(RuntimeContext::Unknown));
    }
}
