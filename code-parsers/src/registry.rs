//! Parser selection: explicit language tag first, then the extension table,
//! otherwise the file is skipped.

use crate::languages::ecma::{JavascriptParser, TypescriptParser};
use crate::languages::generic::GenericParser;
use crate::languages::go::GoParser;
use crate::languages::java::JavaParser;
use crate::types::{Language, ParseResult};
use crate::LanguageParser;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Dispatch table over the registered language parsers.
///
/// Built once at startup; every extension is claimed by exactly one parser
/// (a duplicate claim is a registration bug and is logged, first wins).
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn LanguageParser>>,
    by_language: HashMap<Language, usize>,
    by_extension: HashMap<String, usize>,
}

impl ParserRegistry {
    /// Registry with the built-in parser set.
    pub fn new() -> Self {
        let parsers: Vec<Arc<dyn LanguageParser>> = vec![
            Arc::new(GoParser),
            Arc::new(JavascriptParser),
            Arc::new(TypescriptParser),
            Arc::new(JavaParser),
            Arc::new(GenericParser),
        ];

        let mut by_language = HashMap::new();
        let mut by_extension = HashMap::new();
        for (idx, parser) in parsers.iter().enumerate() {
            by_language.entry(parser.language()).or_insert(idx);
            for ext in parser.extensions() {
                let key = ext.to_ascii_lowercase();
                if by_extension.contains_key(&key) {
                    warn!(extension = %key, "duplicate extension registration ignored");
                    continue;
                }
                by_extension.insert(key, idx);
            }
        }

        Self {
            parsers,
            by_language,
            by_extension,
        }
    }

    /// Select a parser: explicit tag wins over the extension table.
    /// Unknown extensions return `None` (debug log, not an error).
    pub fn select(
        &self,
        tag: Option<Language>,
        path: &Path,
    ) -> Option<&Arc<dyn LanguageParser>> {
        if let Some(lang) = tag {
            return self.by_language.get(&lang).map(|&i| &self.parsers[i]);
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_ascii_lowercase())
            .unwrap_or_default();
        match self.by_extension.get(&ext) {
            Some(&i) => Some(&self.parsers[i]),
            None => {
                debug!(path = %path.display(), extension = %ext, "no parser registered, skipping");
                None
            }
        }
    }

    /// Language a path would be parsed as, if any.
    pub fn language_of(&self, path: &Path) -> Option<Language> {
        self.select(None, path).map(|p| p.language())
    }

    /// Parse in-memory source, selecting the parser by tag or path.
    pub fn parse_source(
        &self,
        tag: Option<Language>,
        source: &str,
        namespace: &str,
        file_path: &str,
    ) -> Option<ParseResult> {
        self.select(tag, Path::new(file_path))
            .map(|p| p.parse_string(source, namespace, file_path))
    }

    /// Parse a file from disk, selecting the parser by tag or extension.
    pub fn parse_path(
        &self,
        tag: Option<Language>,
        path: &Path,
        namespace: &str,
    ) -> Option<ParseResult> {
        self.select(tag, path).map(|p| p.parse_file(path, namespace))
    }
}

impl Default for ParserRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_dispatch() {
        let reg = ParserRegistry::new();
        assert_eq!(reg.language_of(Path::new("a/b/main.go")), Some(Language::Go));
        assert_eq!(
            reg.language_of(Path::new("index.js")),
            Some(Language::Javascript)
        );
        assert_eq!(
            reg.language_of(Path::new("app.ts")),
            Some(Language::Typescript)
        );
        assert_eq!(reg.language_of(Path::new("App.java")), Some(Language::Java));
        assert_eq!(reg.language_of(Path::new("tool.py")), Some(Language::Other));
    }

    #[test]
    fn unknown_extension_is_skipped() {
        let reg = ParserRegistry::new();
        assert!(reg.select(None, Path::new("notes.txt")).is_none());
        assert!(reg
            .parse_source(None, "hello", "ns:x", "notes.txt")
            .is_none());
    }

    #[test]
    fn explicit_tag_overrides_extension() {
        let reg = ParserRegistry::new();
        let parser = reg
            .select(Some(Language::Go), Path::new("weird.txt"))
            .expect("tag dispatch");
        assert_eq!(parser.language(), Language::Go);
    }
}
