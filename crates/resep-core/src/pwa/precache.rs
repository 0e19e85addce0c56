//! Build-time precache list: which built assets are stored for offline use.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use walkdir::WalkDir;

/// A file glob as used in precache configuration.
///
/// Supports `**` (any number of directories), `*` and `?` within one path
/// segment, and `{a,b}` alternatives, e.g. `**/*.{js,css,html}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobPattern {
    raw: String,
    alternatives: Vec<String>,
}

impl GlobPattern {
    pub fn new(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            alternatives: expand_braces(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a `/`-separated path relative to the build directory.
    pub fn matches(&self, path: &str) -> bool {
        let path: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        self.alternatives.iter().any(|alternative| {
            let pattern: Vec<&str> = alternative.split('/').collect();
            match_segments(&pattern, &path)
        })
    }
}

/// `a.{js,css}` -> `a.js`, `a.css`. Braces do not nest.
fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };
    let Some(close) = pattern[open..].find('}').map(|i| open + i) else {
        return vec![pattern.to_string()];
    };

    let (head, tail) = (&pattern[..open], &pattern[close + 1..]);
    pattern[open + 1..close]
        .split(',')
        .flat_map(|choice| expand_braces(&format!("{}{}{}", head, choice, tail)))
        .collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"**", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((segment, rest)) => match path.split_first() {
            Some((name, path_rest)) => match_wildcard(segment, name) && match_segments(rest, path_rest),
            None => false,
        },
    }
}

fn match_wildcard(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    // matched[j]: pattern prefix so far matches name[..j]
    let mut matched = vec![false; name.len() + 1];
    matched[0] = true;
    for &p in &pattern {
        let mut next = vec![false; name.len() + 1];
        match p {
            '*' => {
                let mut any = false;
                for j in 0..=name.len() {
                    any |= matched[j];
                    next[j] = any;
                }
            }
            _ => {
                for j in 1..=name.len() {
                    next[j] = matched[j - 1] && (p == '?' || p == name[j - 1]);
                }
            }
        }
        matched = next;
    }
    matched[name.len()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrecacheEntry {
    pub url: String,
    pub size: u64,
}

/// Walk a build directory and list the files any pattern matches, plus the
/// explicitly included assets that exist. Sorted by URL, without duplicates.
pub fn collect(dir: &Path, patterns: &[GlobPattern], include_assets: &[String]) -> Result<Vec<PrecacheEntry>> {
    let mut entries: Vec<PrecacheEntry> = Vec::new();

    for entry in WalkDir::new(dir) {
        let entry = entry.with_context(|| format!("Failed to walk build directory: {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("Unexpected path outside build directory: {}", entry.path().display()))?;
        let url = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let included = include_assets.iter().any(|asset| asset.trim_start_matches('/') == url);
        if included || patterns.iter().any(|pattern| pattern.matches(&url)) {
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            entries.push(PrecacheEntry { url, size });
        }
    }

    entries.sort_by(|a, b| a.url.cmp(&b.url));
    entries.dedup_by(|a, b| a.url == b.url);
    Ok(entries)
}
