use once_cell::sync::Lazy;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Execution domain a source file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeContext {
    Client,
    Server,
    Shared,
    Testing,
    Unknown,
}

impl RuntimeContext {
    /// Every context, in the order used for output and for configuration lookups.
    pub const ALL: [RuntimeContext; 5] = [
        RuntimeContext::Client,
        RuntimeContext::Server,
        RuntimeContext::Shared,
        RuntimeContext::Testing,
        RuntimeContext::Unknown,
    ];

    /// Contexts that can be assigned from configuration.
    pub const CONFIGURABLE: [RuntimeContext; 4] = [
        RuntimeContext::Client,
        RuntimeContext::Server,
        RuntimeContext::Shared,
        RuntimeContext::Testing,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            RuntimeContext::Client => "client",
            RuntimeContext::Server => "server",
            RuntimeContext::Shared => "shared",
            RuntimeContext::Testing => "testing",
            RuntimeContext::Unknown => "unknown",
        }
    }

    /// Field name under `[paths]` in the configuration file.
    pub const fn config_key(self) -> Option<&'static str> {
        match self {
            RuntimeContext::Unknown => None,
            other => Some(other.as_str()),
        }
    }

    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::CONFIGURABLE
            .into_iter()
            .find(|ctx| ctx.config_key() == Some(key))
    }

    const fn slot(self) -> usize {
        match self {
            RuntimeContext::Client => 0,
            RuntimeContext::Server => 1,
            RuntimeContext::Shared => 2,
            RuntimeContext::Testing => 3,
            RuntimeContext::Unknown => 4,
        }
    }
}

impl fmt::Display for RuntimeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dense map with one slot per [`RuntimeContext`], iterated in [`RuntimeContext::ALL`] order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMap<T> {
    slots: [T; 5],
}

impl<T: Default> Default for ContextMap<T> {
    fn default() -> Self {
        Self {
            slots: Default::default(),
        }
    }
}

impl<T> ContextMap<T> {
    pub fn from_fn(mut f: impl FnMut(RuntimeContext) -> T) -> Self {
        Self {
            slots: RuntimeContext::ALL.map(&mut f),
        }
    }

    pub fn get(&self, context: RuntimeContext) -> &T {
        &self.slots[context.slot()]
    }

    pub fn get_mut(&mut self, context: RuntimeContext) -> &mut T {
        &mut self.slots[context.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuntimeContext, &T)> {
        RuntimeContext::ALL.into_iter().zip(self.slots.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(RuntimeContext, &T) -> U) -> ContextMap<U> {
        ContextMap::from_fn(|ctx| f(ctx, self.get(ctx)))
    }
}

impl<T: Serialize> Serialize for ContextMap<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (ctx, value) in self.iter() {
            map.serialize_entry(ctx.as_str(), value)?;
        }
        map.end()
    }
}

/// Default runtime context for well-known Roblox service classes.
#[derive(Debug, Clone, Default)]
pub struct ServiceMetadata {
    contexts: HashMap<String, RuntimeContext>,
}

static BUILTIN_SERVICES: Lazy<ServiceMetadata> = Lazy::new(|| {
    ServiceMetadata::from_pairs([
        // server-only
        ("ServerScriptService", RuntimeContext::Server),
        ("ServerStorage", RuntimeContext::Server),
        // client-only
        ("StarterPlayer", RuntimeContext::Client),
        ("StarterPlayerScripts", RuntimeContext::Client),
        ("StarterCharacterScripts", RuntimeContext::Client),
        ("StarterGui", RuntimeContext::Client),
        ("StarterPack", RuntimeContext::Client),
        ("ReplicatedFirst", RuntimeContext::Client),
        // replicated to both sides
        ("ReplicatedStorage", RuntimeContext::Shared),
        ("Workspace", RuntimeContext::Shared),
        ("Lighting", RuntimeContext::Shared),
        ("SoundService", RuntimeContext::Shared),
        ("Chat", RuntimeContext::Shared),
        ("TestService", RuntimeContext::Testing),
    ])
});

impl ServiceMetadata {
    /// The process-wide table of built-in services.
    pub fn builtin() -> &'static ServiceMetadata {
        &BUILTIN_SERVICES
    }

    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, RuntimeContext)>,
        S: Into<String>,
    {
        Self {
            contexts: pairs
                .into_iter()
                .map(|(name, ctx)| (name.into(), ctx))
                .collect(),
        }
    }

    pub fn lookup(&self, class_name: &str) -> Option<RuntimeContext> {
        self.contexts.get(class_name).copied()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}
