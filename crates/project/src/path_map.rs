use crate::extract::collect_paths;
use crate::{Classification, Consolidator, ContextMap, RuntimeContext};
use serde::Serialize;

/// Glob lists per runtime context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PathMap(ContextMap<Vec<String>>);

impl PathMap {
    /// Raw globs for every classified subtree.
    ///
    /// Extraction starts at each entry that made its own decision and stops
    /// at descendants that made theirs, so every `$path` lands in exactly one
    /// context.
    pub fn from_classification(classification: &Classification<'_>) -> Self {
        let mut map = ContextMap::<Vec<String>>::default();
        for (ctx, entries) in classification.iter() {
            let out = map.get_mut(ctx);
            for assignment in entries.iter().filter(|a| a.source.is_decision()) {
                collect_paths(
                    assignment.entry,
                    &assignment.id,
                    &|id| classification.is_decision_root(id),
                    out,
                );
            }
        }
        Self(map)
    }

    pub fn consolidated(&self, consolidator: &Consolidator) -> Self {
        Self(self.0.map(|_, globs| consolidator.consolidate(globs)))
    }

    pub fn get(&self, context: RuntimeContext) -> &[String] {
        self.0.get(context)
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuntimeContext, &[String])> {
        self.0.iter().map(|(ctx, globs)| (ctx, globs.as_slice()))
    }

    pub fn retain(&mut self, mut keep: impl FnMut(RuntimeContext, &str) -> bool) {
        for ctx in RuntimeContext::ALL {
            self.0.get_mut(ctx).retain(|glob| keep(ctx, glob));
        }
    }

    pub fn total(&self) -> usize {
        self.iter().map(|(_, globs)| globs.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl FromIterator<(RuntimeContext, Vec<String>)> for PathMap {
    fn from_iter<I: IntoIterator<Item = (RuntimeContext, Vec<String>)>>(iter: I) -> Self {
        let mut map = ContextMap::<Vec<String>>::default();
        for (ctx, globs) in iter {
            map.get_mut(ctx).extend(globs);
        }
        Self(map)
    }
}
