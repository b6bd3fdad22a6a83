//! Ignore-rule evaluation
//!
//! Two independent rule sources decide whether a path is off limits to the
//! engine: the working copy's own VCS ignore rules, and an optional custom
//! ignore document fetched from the bucket. A path excluded by either source
//! is never fetched, overwritten or deleted.
//!
//! VCS rules live in files inside the working tree that the fetch phase may
//! itself rewrite, so they are evaluated once into a [`VcsIgnoreSnapshot`]
//! before any worker starts, and never consulted live.

use std::collections::HashSet;

use mirror_fs::validate_object_key;
use regex::Regex;
use serde::Serialize;

use crate::tree::WorkingTree;

/// File name of git's per-directory ignore rules.
pub const VCS_IGNORE_FILE: &str = ".gitignore";

/// Whether `key` is a VCS ignore file, at the root or in any subdirectory.
pub fn is_vcs_rule_file(key: &str) -> bool {
    key.rsplit('/').next() == Some(VCS_IGNORE_FILE)
}

/// Compiled gitignore-style rules from the custom ignore document.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    pattern: String,
    regex: Regex,
    negated: bool,
    dir_only: bool,
}

impl IgnoreRules {
    /// Compile rules from the text of an ignore document.
    ///
    /// Patterns that fail to compile are skipped with a warning.
    pub fn parse(text: &str) -> Self {
        let mut rules = Vec::new();

        for line in text.lines() {
            let line = line.trim_end();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (negated, body) = match line.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, line.strip_prefix('\\').unwrap_or(line)),
            };

            let (dir_only, body) = match body.strip_suffix('/') {
                Some(rest) => (true, rest),
                None => (false, body),
            };

            let anchored = body.contains('/');
            let body = body.strip_prefix('/').unwrap_or(body);
            if body.is_empty() {
                continue;
            }

            match Regex::new(&translate(body, anchored)) {
                Ok(regex) => rules.push(Rule {
                    pattern: line.to_string(),
                    regex,
                    negated,
                    dir_only,
                }),
                Err(e) => {
                    tracing::warn!(pattern = %line, error = %e, "Skipping invalid ignore pattern");
                }
            }
        }

        Self { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether `path` is excluded, either directly or through an excluded
    /// parent directory.
    pub fn is_ignored(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');

        for (idx, _) in path.match_indices('/') {
            if self.matches(&path[..idx], true) {
                return true;
            }
        }
        self.matches(path, false)
    }

    /// Last matching rule wins.
    fn matches(&self, path: &str, is_dir: bool) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| (is_dir || !rule.dir_only) && rule.regex.is_match(path))
            .is_some_and(|rule| {
                tracing::trace!(path = %path, pattern = %rule.pattern, negated = rule.negated, "Ignore rule matched");
                !rule.negated
            })
    }
}

/// Translate one gitignore pattern into an anchored regex.
fn translate(pattern: &str, anchored: bool) -> String {
    let mut out = String::from(if anchored { "^" } else { "^(?:.*/)?" });
    let segments: Vec<&str> = pattern.split('/').collect();
    let last = segments.len() - 1;

    for (i, segment) in segments.iter().enumerate() {
        if *segment == "**" {
            if i == last {
                out.push_str(".*");
            } else {
                out.push_str("(?:.*/)?");
            }
            continue;
        }
        translate_segment(segment, &mut out);
        if i != last {
            out.push('/');
        }
    }

    out.push('$');
    out
}

fn translate_segment(segment: &str, out: &mut String) {
    let chars: Vec<char> = segment.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '*' => {
                while i + 1 < chars.len() && chars[i + 1] == '*' {
                    i += 1;
                }
                out.push_str("[^/]*");
            }
            '?' => out.push_str("[^/]"),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                out.push_str(&regex::escape(&chars[i].to_string()));
            }
            '[' => match chars[i + 1..].iter().position(|&c| c == ']') {
                Some(offset) if offset > 0 => {
                    let class = &chars[i + 1..i + 1 + offset];
                    out.push('[');
                    let mut body = class;
                    if let Some(&first) = class.first()
                        && (first == '!' || first == '^')
                    {
                        out.push('^');
                        body = &class[1..];
                    }
                    for &c in body {
                        if matches!(c, '\\' | '[' | ']' | '&' | '~') {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                    out.push(']');
                    i += offset + 1;
                }
                _ => out.push_str("\\["),
            },
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }
}

/// Why a path is or is not excluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IgnoreDecision {
    pub path: String,
    pub ignored_by_vcs_rules: bool,
    pub ignored_by_custom_rules: bool,
}

impl IgnoreDecision {
    pub fn is_ignored(&self) -> bool {
        self.ignored_by_vcs_rules || self.ignored_by_custom_rules
    }
}

/// VCS ignore decisions for a fixed set of paths, evaluated at one instant.
///
/// Paths that were not captured are reported as not ignored. Keys that can
/// never be materialized are not looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VcsIgnoreSnapshot {
    ignored: HashSet<String>,
    captured: usize,
}

impl VcsIgnoreSnapshot {
    /// Evaluate `paths` against the tree's current ignore rules.
    ///
    /// A lookup that errors records the path as ignored.
    pub fn capture<'p>(tree: &dyn WorkingTree, paths: impl IntoIterator<Item = &'p str>) -> Self {
        let mut snapshot = Self::default();

        for path in paths {
            if validate_object_key(path).is_err() {
                continue;
            }
            snapshot.captured += 1;
            let ignored = match tree.is_vcs_ignored(path) {
                Ok(ignored) => ignored,
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "VCS ignore lookup failed, treating path as ignored");
                    true
                }
            };
            if ignored {
                snapshot.ignored.insert(path.to_string());
            }
        }

        tracing::debug!(
            captured = snapshot.captured,
            ignored = snapshot.ignored.len(),
            "Captured VCS ignore rules"
        );
        snapshot
    }

    /// Snapshot from precomputed decisions.
    pub fn from_ignored(ignored: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let ignored: HashSet<String> = ignored.into_iter().map(Into::into).collect();
        Self {
            captured: ignored.len(),
            ignored,
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.ignored.contains(path)
    }

    /// Number of paths evaluated.
    pub fn captured(&self) -> usize {
        self.captured
    }
}

/// Combined view over both rule sources.
///
/// Either source may be absent. A missing custom document contributes no
/// exclusions. Both sources are immutable, so the filter is shared freely
/// across fetch workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreFilter<'a> {
    vcs: Option<&'a VcsIgnoreSnapshot>,
    custom: Option<&'a IgnoreRules>,
}

impl<'a> IgnoreFilter<'a> {
    pub fn new(vcs: Option<&'a VcsIgnoreSnapshot>, custom: Option<&'a IgnoreRules>) -> Self {
        Self { vcs, custom }
    }

    /// A filter that excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_ignored(&self, path: &str) -> bool {
        self.custom_ignored(path) || self.vcs_ignored(path)
    }

    pub fn decide(&self, path: &str) -> IgnoreDecision {
        IgnoreDecision {
            path: path.to_string(),
            ignored_by_vcs_rules: self.vcs_ignored(path),
            ignored_by_custom_rules: self.custom_ignored(path),
        }
    }

    fn custom_ignored(&self, path: &str) -> bool {
        self.custom.is_some_and(|rules| rules.is_ignored(path))
    }

    fn vcs_ignored(&self, path: &str) -> bool {
        self.vcs.is_some_and(|snapshot| snapshot.contains(path))
    }
}
