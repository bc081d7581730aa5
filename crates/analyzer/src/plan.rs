use rojo_check_project::glob::glob_base;
use rojo_check_project::{PathMap, RuntimeContext};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How paths classified `unknown` are analyzed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownPolicy {
    /// Analyzed together with shared code.
    #[default]
    Shared,
    /// Analyzed in a run of their own.
    Separate,
    /// Not analyzed.
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextAnalyzerConfig {
    pub definitions: Vec<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub command: String,
    pub args: Vec<String>,
    pub definitions: Vec<String>,
    /// Per-context extras, keyed by context name (`client`, `server`, ...).
    pub context: BTreeMap<String, ContextAnalyzerConfig>,
    pub concurrency: usize,
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: "luau-lsp".to_string(),
            args: vec!["analyze".to_string(), "--formatter=plain".to_string()],
            definitions: Vec::new(),
            context: BTreeMap::new(),
            concurrency: 4,
            timeout_secs: 300,
        }
    }
}

impl AnalyzerConfig {
    fn for_context(&self, context: RuntimeContext) -> Option<&ContextAnalyzerConfig> {
        self.context.get(context.as_str())
    }
}

/// One analyzer process: what to analyze and what to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub context: RuntimeContext,
    /// Directories (or files) passed as positional arguments.
    pub targets: Vec<String>,
    /// Globs passed verbatim through `--ignore=`.
    pub ignores: Vec<String>,
    pub definitions: Vec<String>,
    pub extra_args: Vec<String>,
}

impl Invocation {
    pub fn args(&self, config: &AnalyzerConfig) -> Vec<String> {
        let mut args = config.args.clone();
        args.extend(self.extra_args.iter().cloned());
        args.extend(
            self.definitions
                .iter()
                .map(|def| format!("--definitions={def}")),
        );
        args.extend(self.ignores.iter().map(|glob| format!("--ignore={glob}")));
        args.extend(self.targets.iter().cloned());
        args
    }
}

/// One invocation per runtime context that has paths to analyze.
///
/// Globs of other contexts that sit strictly inside one of a run's targets are
/// ignored in that run, so nested overrides are only analyzed in their own
/// context. `extra_ignores` (user and ignore-file patterns) apply to every run.
pub fn plan_invocations(
    paths: &PathMap,
    extra_ignores: &[String],
    policy: UnknownPolicy,
    config: &AnalyzerConfig,
) -> Vec<Invocation> {
    let mut plans = Vec::new();

    for context in RuntimeContext::ALL {
        let mut globs: Vec<&str> = paths.get(context).iter().map(String::as_str).collect();
        match (context, policy) {
            (RuntimeContext::Unknown, UnknownPolicy::Separate) => {}
            (RuntimeContext::Unknown, _) => continue,
            (RuntimeContext::Shared, UnknownPolicy::Shared) => {
                let unknown = paths.get(RuntimeContext::Unknown);
                globs.extend(unknown.iter().map(String::as_str));
            }
            _ => {}
        }
        if globs.is_empty() {
            continue;
        }

        let mut targets: Vec<String> = Vec::new();
        for glob in &globs {
            let target = match glob_base(glob) {
                "" => ".".to_string(),
                base => base.to_string(),
            };
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        // Merged unknown paths can sit inside a target that is already listed.
        let targets: Vec<String> = targets
            .iter()
            .filter(|target| !targets.iter().any(|outer| strictly_inside(target, outer)))
            .cloned()
            .collect();

        let merged_unknown = context == RuntimeContext::Shared && policy == UnknownPolicy::Shared;
        let mut ignores: Vec<String> = Vec::new();
        for (other, other_globs) in paths.iter() {
            if other == context || (merged_unknown && other == RuntimeContext::Unknown) {
                continue;
            }
            for glob in other_globs {
                let nested = targets
                    .iter()
                    .any(|target| strictly_inside(glob_base(glob), target));
                if nested && !ignores.contains(glob) {
                    ignores.push(glob.clone());
                }
            }
        }
        for glob in extra_ignores {
            if !ignores.contains(glob) {
                ignores.push(glob.clone());
            }
        }

        let context_config = config.for_context(context);
        let mut definitions = config.definitions.clone();
        let mut extra_args = Vec::new();
        if let Some(extra) = context_config {
            definitions.extend(extra.definitions.iter().cloned());
            extra_args.extend(extra.args.iter().cloned());
        }

        plans.push(Invocation {
            context,
            targets,
            ignores,
            definitions,
            extra_args,
        });
    }

    plans
}

fn strictly_inside(base: &str, target: &str) -> bool {
    if target == "." {
        return !base.is_empty();
    }
    base.strip_prefix(target)
        .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(entries: &[(RuntimeContext, &[&str])]) -> PathMap {
        entries
            .iter()
            .map(|(ctx, globs)| (*ctx, globs.iter().map(|g| g.to_string()).collect()))
            .collect()
    }

    #[test]
    fn one_run_per_non_empty_context() {
        let paths = map(&[
            (RuntimeContext::Shared, &["src/shared/**", "Packages/**"]),
            (RuntimeContext::Server, &["src/server/**"]),
        ]);
        let plans = plan_invocations(&paths, &[], UnknownPolicy::Shared, &AnalyzerConfig::default());
        let contexts: Vec<_> = plans.iter().map(|p| p.context).collect();
        assert_eq!(contexts, vec![RuntimeContext::Server, RuntimeContext::Shared]);
        assert_eq!(plans[1].targets, vec!["src/shared", "Packages"]);
        assert!(plans[1].ignores.is_empty());
    }

    #[test]
    fn nested_globs_of_other_contexts_are_ignored() {
        let paths = map(&[
            (RuntimeContext::Shared, &["src/**"]),
            (RuntimeContext::Client, &["src/client/**"]),
            (RuntimeContext::Server, &["server/**"]),
        ]);
        let extra = vec!["**/*.spec.luau".to_string()];
        let plans = plan_invocations(&paths, &extra, UnknownPolicy::Shared, &AnalyzerConfig::default());
        let shared = plans.iter().find(|p| p.context == RuntimeContext::Shared).unwrap();
        assert_eq!(shared.ignores, vec!["src/client/**", "**/*.spec.luau"]);
        let client = plans.iter().find(|p| p.context == RuntimeContext::Client).unwrap();
        assert_eq!(client.ignores, vec!["**/*.spec.luau"]);
    }

    #[test]
    fn unknown_policy_controls_unknown_paths() {
        let paths = map(&[(RuntimeContext::Unknown, &["lib/**"])]);
        let config = AnalyzerConfig::default();

        let shared = plan_invocations(&paths, &[], UnknownPolicy::Shared, &config);
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].context, RuntimeContext::Shared);
        assert_eq!(shared[0].targets, vec!["lib"]);

        let separate = plan_invocations(&paths, &[], UnknownPolicy::Separate, &config);
        assert_eq!(separate[0].context, RuntimeContext::Unknown);

        assert!(plan_invocations(&paths, &[], UnknownPolicy::Skip, &config).is_empty());
    }

    #[test]
    fn merged_unknown_paths_inside_shared_targets_are_not_repeated() {
        let paths = map(&[
            (RuntimeContext::Shared, &["src/**"]),
            (RuntimeContext::Unknown, &["src/lib/**", "lib/**"]),
        ]);
        let plans = plan_invocations(&paths, &[], UnknownPolicy::Shared, &AnalyzerConfig::default());
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].targets, vec!["src", "lib"]);
        assert!(plans[0].ignores.is_empty());
    }

    #[test]
    fn root_glob_targets_project_directory() {
        let paths = map(&[
            (RuntimeContext::Unknown, &["**"]),
            (RuntimeContext::Server, &["server/**"]),
        ]);
        let plans = plan_invocations(&paths, &[], UnknownPolicy::Shared, &AnalyzerConfig::default());
        let shared = plans.iter().find(|p| p.context == RuntimeContext::Shared).unwrap();
        assert_eq!(shared.targets, vec!["."]);
        assert_eq!(shared.ignores, vec!["server/**"]);
        let server = plans.iter().find(|p| p.context == RuntimeContext::Server).unwrap();
        assert!(server.ignores.is_empty());
    }

    #[test]
    fn args_include_definitions_ignores_and_targets() {
        let mut config = AnalyzerConfig {
            definitions: vec!["globalTypes.d.luau".into()],
            ..AnalyzerConfig::default()
        };
        config.context.insert(
            "client".into(),
            ContextAnalyzerConfig {
                definitions: vec!["client.d.luau".into()],
                args: vec!["--platform=roblox".into()],
            },
        );
        let paths = map(&[(RuntimeContext::Client, &["src/client/**"])]);
        let extra = vec!["Packages/**".to_string()];
        let plans = plan_invocations(&paths, &extra, UnknownPolicy::Shared, &config);
        assert_eq!(
            plans[0].args(&config),
            vec![
                "analyze",
                "--formatter=plain",
                "--platform=roblox",
                "--definitions=globalTypes.d.luau",
                "--definitions=client.d.luau",
                "--ignore=Packages/**",
                "src/client"
            ]
        );
    }
}
