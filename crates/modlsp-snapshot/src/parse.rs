//! Parsed-file cache keyed by content-hash rather than file identity.
//!
//! Two files with identical bytes (a copy-pasted module, or the same file
//! reachable through two view roots) must share one [`ParsedFile`] — salsa's
//! per-`File` tracked-query cache would key on the `File` input instead, so
//! this is a hand-rolled content-addressed cache on top of it, per spec
//! §4.3.3 ("cached keyed by content-hash + parse-mode; equal key ⇒
//! pointer-equal tree").

use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;

use modlsp_source::LineIndex;
use modlsp_source::Span;

use crate::cache::GenerationalCache;

/// A single parse error: owned, so it can live inside a cached, `Arc`-shared
/// [`ParsedFile`] independent of the source text's lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub span: Span,
    pub message: String,
}

/// How a file is being parsed: full syntax, or a cheaper pass that only
/// extracts top-level declarations (used for workspace symbol search and
/// import-graph loading, where a full parse would be wasted work).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParseMode {
    Full,
    DeclarationsOnly,
}

/// A single top-level declaration extracted while parsing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    pub name: String,
    pub offset: u32,
    pub exported: bool,
}

/// The result of parsing one file's content.
///
/// Cheap to clone (`Arc` internally); two [`ParsedFile`]s produced from the
/// same `(content-hash, mode)` key are pointer-equal via the cache in
/// [`ParsedFileCache`].
#[derive(Clone, Debug)]
pub struct ParsedFile {
    inner: Arc<ParsedFileInner>,
}

#[derive(Debug)]
struct ParsedFileInner {
    content_hash: u64,
    mode: ParseMode,
    line_index: LineIndex,
    declarations: Vec<Declaration>,
    errors: Vec<ParseError>,
}

impl ParsedFile {
    #[must_use]
    pub fn content_hash(&self) -> u64 {
        self.inner.content_hash
    }

    #[must_use]
    pub fn mode(&self) -> ParseMode {
        self.inner.mode
    }

    #[must_use]
    pub fn line_index(&self) -> &LineIndex {
        &self.inner.line_index
    }

    #[must_use]
    pub fn declarations(&self) -> &[Declaration] {
        &self.inner.declarations
    }

    #[must_use]
    pub fn errors(&self) -> &[ParseError] {
        &self.inner.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.inner.errors.is_empty()
    }
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}

/// A module-level declaration header: an identifier at the start of a line,
/// optionally preceded by a visibility marker (`pub`), terminated at the
/// first non-identifier character. Good enough to drive workspace-symbol
/// search without a real grammar, which spec.md never defines.
fn scan_declarations(text: &str) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut offset = 0u32;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_start();
        let leading_ws = u32::try_from(line.len() - trimmed.len()).unwrap_or(0);
        let (exported, rest) = if let Some(rest) = trimmed.strip_prefix("pub ") {
            (true, rest)
        } else {
            (false, trimmed)
        };

        let name: String = rest
            .chars()
            .take_while(|c| c.is_alphanumeric() || *c == '_')
            .collect();

        if !name.is_empty() && name.chars().next().is_some_and(char::is_alphabetic) {
            declarations.push(Declaration {
                name,
                offset: offset + leading_ws,
                exported,
            });
        }

        offset += u32::try_from(line.len()).unwrap_or(0);
    }

    declarations
}

fn unbalanced_delimiters(text: &str) -> Vec<ParseError> {
    let mut depth: i32 = 0;
    let mut errors = Vec::new();

    for (offset, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    errors.push(ParseError {
                        span: Span::new(u32::try_from(offset).unwrap_or(0), 1),
                        message: "unmatched closing brace".to_string(),
                    });
                    depth = 0;
                }
            }
            _ => {}
        }
    }

    if depth > 0 {
        errors.push(ParseError {
            span: Span::new(u32::try_from(text.len()).unwrap_or(0), 0),
            message: "unclosed brace".to_string(),
        });
    }

    errors
}

fn parse(text: &str, mode: ParseMode) -> ParsedFile {
    let declarations = scan_declarations(text);
    let errors = match mode {
        ParseMode::Full => unbalanced_delimiters(text),
        ParseMode::DeclarationsOnly => Vec::new(),
    };

    ParsedFile {
        inner: Arc::new(ParsedFileInner {
            content_hash: content_hash(text),
            mode,
            line_index: LineIndex::from_text(text),
            declarations,
            errors,
        }),
    }
}

/// Content-addressed, generation-tracked cache of [`ParsedFile`]s.
pub struct ParsedFileCache {
    cache: GenerationalCache<(u64, ParseMode), ParsedFile>,
}

impl ParsedFileCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: GenerationalCache::new(),
        }
    }

    /// Parse `text`, reusing a cached [`ParsedFile`] if this exact
    /// `(content-hash, mode)` pair was already parsed in a live generation.
    pub fn parse(&self, text: &str, mode: ParseMode) -> ParsedFile {
        let hash = content_hash(text);
        self.cache
            .get_or_insert_with((hash, mode), || parse(text, mode))
    }

    pub fn advance_generation(&self) -> u64 {
        self.cache.advance_generation()
    }

    pub fn evict_older_than(&self, keep_within: u64) {
        self.cache.evict_older_than(keep_within, |_| false);
    }
}

impl Default for ParsedFileCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_content_shares_pointer_equal_tree() {
        let cache = ParsedFileCache::new();
        let a = cache.parse("pub fn main() {}", ParseMode::Full);
        let b = cache.parse("pub fn main() {}", ParseMode::Full);
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn different_content_produces_distinct_trees() {
        let cache = ParsedFileCache::new();
        let a = cache.parse("pub fn a() {}", ParseMode::Full);
        let b = cache.parse("pub fn b() {}", ParseMode::Full);
        assert!(!Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn unclosed_brace_is_a_parse_error() {
        let parsed = parse("pub fn main() {", ParseMode::Full);
        assert!(parsed.has_errors());
    }

    #[test]
    fn declarations_only_mode_skips_error_scan() {
        let parsed = parse("pub fn main() {", ParseMode::DeclarationsOnly);
        assert!(!parsed.has_errors());
        assert_eq!(parsed.declarations().len(), 1);
    }

    #[test]
    fn scans_exported_and_private_declarations() {
        let parsed = parse("pub fn visible() {}\nfn hidden() {}\n", ParseMode::Full);
        let names: Vec<_> = parsed.declarations().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["visible", "hidden"]);
        assert!(parsed.declarations()[0].exported);
        assert!(!parsed.declarations()[1].exported);
    }
}
