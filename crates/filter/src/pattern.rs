use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use rojo_check_project::glob::{glob_base, normalize_path, RECURSIVE_SUFFIX};
use std::path::{Path, PathBuf};

/// One accepted ignore line and the globs it compiles to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnorePattern {
    /// The line as written.
    pub source: String,
    /// Root-relative glob, without the leading `/` or trailing `/`.
    pub glob: String,
    /// Written with a trailing `/`.
    pub dir_only: bool,
}

impl IgnorePattern {
    /// Parse one ignore-file line. Blank lines, comments and negations yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return None;
        }
        if trimmed.starts_with('!') {
            log::warn!("Negated ignore pattern `{trimmed}` is not supported by the analyzer; skipping");
            return None;
        }

        let unescaped = trimmed
            .strip_prefix("\\#")
            .map(|rest| format!("#{rest}"))
            .or_else(|| trimmed.strip_prefix("\\!").map(|rest| format!("!{rest}")))
            .unwrap_or_else(|| trimmed.to_string());
        let dir_only = unescaped.ends_with('/');
        let glob = normalize_path(unescaped.trim_start_matches('/'));
        if glob.is_empty() {
            return None;
        }

        Some(Self {
            source: trimmed.to_string(),
            glob,
            dir_only,
        })
    }

    fn is_recursive(&self) -> bool {
        self.glob == "**" || self.glob.ends_with(RECURSIVE_SUFFIX)
    }

    /// Analyzer form: the pattern itself plus its "everything beneath" form.
    /// Directory patterns only cover what lies beneath.
    pub fn globs(&self) -> Vec<String> {
        if self.is_recursive() {
            vec![self.glob.clone()]
        } else if self.dir_only {
            vec![format!("{}{RECURSIVE_SUFFIX}", self.glob)]
        } else {
            vec![self.glob.clone(), format!("{}{RECURSIVE_SUFFIX}", self.glob)]
        }
    }

    /// Matcher form. A directory pattern matches the `dir/` spelling, which
    /// only directory candidates produce.
    fn match_globs(&self) -> Vec<String> {
        if self.dir_only && !self.is_recursive() {
            vec![format!("{}/", self.glob), format!("{}{RECURSIVE_SUFFIX}", self.glob)]
        } else {
            self.globs()
        }
    }
}

/// Predicate "is this path ignored", built once from a fixed pattern list.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    root: Option<PathBuf>,
    patterns: Vec<IgnorePattern>,
    set: GlobSet,
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self {
            root: None,
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }
}

impl IgnoreFilter {
    /// Compile ignore lines. Invalid globs are logged and skipped, never fatal.
    pub fn build<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut patterns = Vec::new();

        for line in lines {
            let Some(pattern) = IgnorePattern::parse(line.as_ref()) else {
                continue;
            };
            let compiled: Result<Vec<_>, _> = pattern
                .match_globs()
                .iter()
                .map(|glob| GlobBuilder::new(glob).literal_separator(true).build())
                .collect();
            match compiled {
                Ok(globs) => {
                    for glob in globs {
                        builder.add(glob);
                    }
                    patterns.push(pattern);
                }
                Err(err) => log::warn!("Skipping invalid ignore pattern `{}`: {err}", pattern.source),
            }
        }

        let set = builder.build().unwrap_or_else(|err| {
            log::warn!("Failed to compile ignore patterns: {err}");
            GlobSet::empty()
        });
        log::debug!("Ignore filter built from {} patterns", patterns.len());

        Self {
            root: None,
            patterns,
            set,
        }
    }

    /// Resolve absolute candidate paths against `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn patterns(&self) -> &[IgnorePattern] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Globs in the form the analyzer's `--ignore=` flag expects.
    pub fn analyzer_globs(&self) -> Vec<String> {
        self.patterns
            .iter()
            .flat_map(IgnorePattern::globs)
            .collect()
    }

    /// Whether a root-relative path (or a `dir/**` glob) is ignored. Both the
    /// file and the directory spelling are tried.
    pub fn ignores(&self, path: &str) -> bool {
        self.matches(path, true)
    }

    /// Whether a root-relative file path is ignored. Directory-only patterns
    /// match files beneath them but not a file of the same name.
    pub fn ignores_file(&self, path: &str) -> bool {
        self.matches(path, false)
    }

    fn matches(&self, path: &str, as_dir: bool) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        let normalized = normalize_path(path);
        let candidate = glob_base(&normalized);
        if candidate.is_empty() {
            return false;
        }
        self.set.is_match(candidate) || (as_dir && self.set.is_match(format!("{candidate}/")))
    }

    /// Like [`IgnoreFilter::ignores`] for filesystem paths; absolute paths
    /// outside the root are never ignored. Paths that are not existing
    /// directories are matched as files.
    pub fn ignores_path(&self, path: &Path) -> bool {
        let relative = match (&self.root, path.is_absolute()) {
            (Some(root), true) => match path.strip_prefix(root) {
                Ok(rel) => rel,
                Err(_) => return false,
            },
            _ => path,
        };
        let resolved = match (&self.root, path.is_absolute()) {
            (Some(root), false) => root.join(path),
            _ => path.to_path_buf(),
        };
        self.matches(&relative.to_string_lossy(), resolved.is_dir())
    }
}
