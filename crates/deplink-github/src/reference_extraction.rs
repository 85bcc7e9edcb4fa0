//! Dependency reference extraction from free-form issue and pull request text.
//!
//! References are only recognised inside declaration blocks: a block starts at
//! a line beginning with one of the configured key phrases followed by a colon
//! and ends at the next blank line (or end of input). Inside a block every line
//! is scanned for five reference syntaxes, richest first, and each accepted
//! match is masked out so weaker syntaxes cannot re-match its substrings.

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use regex::{Captures, Regex};

use crate::entity::{EntityReference, RepositoryScope};

pub const DEFAULT_KEY_PHRASES: &str = "depends on|blocked by";
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

const OWNER_PATTERN: &str = r"[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?";
const REPO_PATTERN: &str = r"[A-Za-z0-9._-]+";

type ReferenceHandler =
    fn(&ReferenceExtractor, &Captures<'_>, &RepositoryScope) -> Option<EntityReference>;

/// One reference syntax: a pattern and the handler normalising its captures.
struct ReferenceSyntax {
    name: &'static str,
    pattern: Regex,
    handler: ReferenceHandler,
    /// Qualified syntaxes must not start right after `/`, or they would match
    /// the tail of URLs on other hosts.
    qualified: bool,
}

/// Precompiled extractor, built once per run from configuration.
pub struct ReferenceExtractor {
    block_start: Regex,
    syntaxes: Vec<ReferenceSyntax>,
    link_targets: Vec<ReferenceSyntax>,
}

impl std::fmt::Debug for ReferenceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceExtractor")
            .field("block_start", &self.block_start.as_str())
            .field(
                "syntaxes",
                &self
                    .syntaxes
                    .iter()
                    .map(|syntax| syntax.name)
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ReferenceExtractor {
    /// `phrases` is pipe-delimited; each phrase is matched literally and
    /// case-insensitively. `server_url` is the origin full URLs must use.
    pub fn new(phrases: &str, server_url: &str) -> Result<Self> {
        let block_start = Regex::new(&format!(
            r"(?i)^(?:{})\s*:",
            key_phrase_alternation(phrases)?
        ))
        .context("failed to compile key phrase pattern")?;
        let host = server_host_pattern(server_url)?;

        let mut syntaxes = vec![ReferenceSyntax {
            name: "markdown_link",
            pattern: Regex::new(r"\[[^\]\n]*\]\(\s*([^)\s]+)\s*\)")
                .context("failed to compile markdown link pattern")?,
            handler: resolve_markdown_link,
            qualified: true,
        }];
        syntaxes.extend(plain_syntaxes(&host, false)?);
        let link_targets = plain_syntaxes(&host, true)?;

        Ok(Self {
            block_start,
            syntaxes,
            link_targets,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_KEY_PHRASES, DEFAULT_SERVER_URL)
    }

    /// Extracts deduplicated references in first-seen order. Intra-repo
    /// shorthand (`#N`) resolves against `scope`.
    pub fn extract(&self, text: &str, scope: &RepositoryScope) -> Vec<EntityReference> {
        let mut references = Vec::new();
        let mut seen = HashSet::new();
        let mut inside_block = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                inside_block = false;
                continue;
            }
            let scanned = match self.block_start.find(trimmed) {
                Some(phrase) => {
                    inside_block = true;
                    &trimmed[phrase.end()..]
                }
                None if inside_block => trimmed,
                None => continue,
            };
            for reference in self.scan_line(scanned, scope) {
                if seen.insert(reference.identity_key()) {
                    references.push(reference);
                }
            }
        }
        references
    }

    /// True when `text` declares `target` inside one of its blocks.
    pub fn declares(&self, text: &str, scope: &RepositoryScope, target: &EntityReference) -> bool {
        self.extract(text, scope)
            .iter()
            .any(|reference| reference.same_entity(target))
    }

    fn scan_line(&self, line: &str, scope: &RepositoryScope) -> Vec<EntityReference> {
        let mut masked = line.to_string();
        let mut found: Vec<(usize, EntityReference)> = Vec::new();

        for syntax in &self.syntaxes {
            let mut consumed = Vec::new();
            for captures in syntax.pattern.captures_iter(&masked) {
                let Some(whole) = captures.get(0) else {
                    continue;
                };
                if !is_left_boundary(&masked, whole.start(), syntax.qualified)
                    || !is_right_boundary(&masked, whole.end())
                {
                    continue;
                }
                if let Some(reference) = (syntax.handler)(self, &captures, scope) {
                    found.push((whole.start(), reference));
                }
                consumed.push(whole.range());
            }
            for range in consumed {
                let width = range.len();
                masked.replace_range(range, &" ".repeat(width));
            }
        }

        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, reference)| reference).collect()
    }

    fn resolve_link_target(&self, target: &str, scope: &RepositoryScope) -> Option<EntityReference> {
        self.link_targets.iter().find_map(|syntax| {
            let captures = syntax.pattern.captures(target)?;
            (syntax.handler)(self, &captures, scope)
        })
    }
}

fn key_phrase_alternation(phrases: &str) -> Result<String> {
    let escaped = phrases
        .split('|')
        .map(str::trim)
        .filter(|phrase| !phrase.is_empty())
        .map(|phrase| {
            phrase
                .split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s+")
        })
        .collect::<Vec<_>>();
    if escaped.is_empty() {
        bail!("key phrases must contain at least one non-empty phrase, got '{phrases}'");
    }
    Ok(escaped.join("|"))
}

/// Escaped `host[:port]` of the server origin; the scheme is matched loosely.
fn server_host_pattern(server_url: &str) -> Result<String> {
    let trimmed = server_url.trim();
    let parsed = reqwest::Url::parse(trimmed)
        .with_context(|| format!("invalid server url '{server_url}'"))?;
    let Some(host) = parsed.host_str() else {
        bail!("server url '{server_url}' has no host");
    };
    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    let path = parsed.path().trim_end_matches('/');
    Ok(format!("{}{}", regex::escape(&authority), regex::escape(path)))
}

fn plain_syntaxes(host: &str, anchored: bool) -> Result<Vec<ReferenceSyntax>> {
    let (start, end) = if anchored { ("^", "$") } else { ("", "") };
    let entries: [(&'static str, String, ReferenceHandler); 4] = [
        (
            "full_url",
            format!(
                r"(?i){start}https?://{host}/({OWNER_PATTERN})/({REPO_PATTERN})/(?:issues|pull)/(\d+)(?:[/?#][^\s)\]>]*)?{end}"
            ),
            resolve_qualified,
        ),
        (
            "path_shorthand",
            format!(r"(?i){start}({OWNER_PATTERN})/({REPO_PATTERN})/(?:issues|pull)/(\d+){end}"),
            resolve_qualified,
        ),
        (
            "cross_repo_shorthand",
            format!(r"{start}({OWNER_PATTERN})/({REPO_PATTERN})#(\d+){end}"),
            resolve_qualified,
        ),
        (
            "intra_repo_shorthand",
            format!(r"{start}#(\d+){end}"),
            resolve_intra_repo,
        ),
    ];

    entries
        .into_iter()
        .map(|(name, pattern, handler)| -> Result<ReferenceSyntax> {
            let pattern = Regex::new(&pattern)
                .with_context(|| format!("failed to compile {name} pattern"))?;
            Ok(ReferenceSyntax {
                name,
                pattern,
                handler,
                qualified: name != "intra_repo_shorthand",
            })
        })
        .collect()
}

fn parse_number(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().filter(|number| *number > 0)
}

fn resolve_markdown_link(
    extractor: &ReferenceExtractor,
    captures: &Captures<'_>,
    scope: &RepositoryScope,
) -> Option<EntityReference> {
    let target = captures.get(1)?.as_str();
    extractor.resolve_link_target(target, scope)
}

fn resolve_qualified(
    _extractor: &ReferenceExtractor,
    captures: &Captures<'_>,
    _scope: &RepositoryScope,
) -> Option<EntityReference> {
    let owner = captures.get(1)?.as_str();
    let repo = captures.get(2)?.as_str();
    let number = parse_number(captures.get(3)?.as_str())?;
    Some(EntityReference::new(owner, repo, number))
}

fn resolve_intra_repo(
    _extractor: &ReferenceExtractor,
    captures: &Captures<'_>,
    scope: &RepositoryScope,
) -> Option<EntityReference> {
    let number = parse_number(captures.get(1)?.as_str())?;
    Some(EntityReference::in_scope(scope, number))
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

/// `#N` may follow `/` (as in `#6/#7`) unless the token is a URL.
fn is_left_boundary(text: &str, start: usize, qualified: bool) -> bool {
    let before = &text[..start];
    match before.chars().next_back() {
        None => true,
        Some('/') if qualified => false,
        Some('/') => !before
            .rsplit(char::is_whitespace)
            .next()
            .is_some_and(|token| token.contains("://")),
        Some(ch) => !is_word_char(ch),
    }
}

fn is_right_boundary(text: &str, end: usize) -> bool {
    text[end..].chars().next().map_or(true, |ch| !is_word_char(ch))
}
