//! Prefix to parser lookup table

use std::collections::HashMap;
use std::sync::Arc;

use super::fields::FormatResult;
use super::pnor::{Family, Message};

/// Anything that turns a full sentence into a [`Message`]
pub trait SentenceParser: Send + Sync {
    fn parse(&self, sentence: &str) -> FormatResult<Message>;
}

impl SentenceParser for Family {
    fn parse(&self, sentence: &str) -> FormatResult<Message> {
        Family::parse(*self, sentence)
    }
}

/// Built once during pipeline setup and shared read-only with the consumer
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn SentenceParser>>,
}

impl ParserRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a parser for every built-in family
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for family in Family::ALL {
            registry.register(family.prefix(), Arc::new(family));
        }
        registry
    }

    /// Associate `prefix` with `parser`, replacing any earlier entry
    pub fn register(&mut self, prefix: impl Into<String>, parser: Arc<dyn SentenceParser>) {
        let prefix = prefix.into();
        if self.parsers.insert(prefix.clone(), parser).is_some() {
            tracing::debug!(%prefix, "Replaced registered parser");
        }
    }

    /// Exact-match lookup
    pub fn resolve(&self, prefix: &str) -> Option<&Arc<dyn SentenceParser>> {
        self.parsers.get(prefix)
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }

    /// Registered prefixes, sorted
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("prefixes", &self.prefixes())
            .finish()
    }
}
