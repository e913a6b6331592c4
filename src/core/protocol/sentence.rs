//! Sentence framing: prefix, fields and tagged (`TAG=VALUE`) scanning

use super::checksum;
use super::fields::{FormatError, FormatResult};

/// A sentence split into prefix, fields and optional checksum.
///
/// Borrowed from the input text and dropped once the record is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence<'a> {
    /// Type prefix without `$`
    pub prefix: &'a str,
    /// Fields after the prefix, in order
    pub fields: Vec<&'a str>,
    /// Upper-cased checksum trailer, if present
    pub checksum: Option<String>,
}

impl<'a> Sentence<'a> {
    /// Split a sentence. The checksum is recorded, not verified.
    pub fn parse(text: &'a str) -> FormatResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(FormatError::Empty);
        }
        let (payload, checksum) = checksum::split(text);
        let payload = payload.strip_prefix('$').unwrap_or(payload);
        let mut parts = payload.split(',');
        let prefix = parts.next().unwrap_or_default().trim();
        if prefix.is_empty() {
            return Err(FormatError::Empty);
        }
        Ok(Self {
            prefix,
            fields: parts.collect(),
            checksum,
        })
    }

    /// Fail unless the sentence carries `expected` as its prefix
    pub fn expect_prefix(&self, expected: &str) -> FormatResult<()> {
        if self.prefix == expected {
            Ok(())
        } else {
            Err(FormatError::UnexpectedPrefix {
                expected: expected.to_string(),
                actual: self.prefix.to_string(),
            })
        }
    }

    /// Fields of a fixed-layout sentence
    pub fn positional(&self, family: &'static str, expected: usize) -> FormatResult<&[&'a str]> {
        if self.fields.len() == expected {
            Ok(&self.fields)
        } else {
            Err(FormatError::FieldCount {
                family,
                expected,
                actual: self.fields.len(),
            })
        }
    }

    /// Fields of a variable-length sentence: `head` fixed fields ending in a
    /// count, then exactly that many trailing values.
    pub fn counted(
        &self,
        family: &'static str,
        head: usize,
        count_field: &'static str,
    ) -> FormatResult<(&[&'a str], usize, &[&'a str])> {
        if self.fields.len() < head {
            return Err(FormatError::FieldCount {
                family,
                expected: head,
                actual: self.fields.len(),
            });
        }
        let (fixed, values) = self.fields.split_at(head);
        let declared = super::fields::uint::<usize>(count_field, fixed[head - 1])?;
        if declared != values.len() {
            return Err(FormatError::CountMismatch {
                field: count_field,
                declared,
                actual: values.len(),
            });
        }
        Ok((fixed, declared, values))
    }

    /// Scan order-independent `TAG=VALUE` fields against a tag table
    pub fn tagged(&self, family: &'static str, table: &[TagDef]) -> FormatResult<TagValues<'a>> {
        let mut found: Vec<TagValue<'a>> = Vec::with_capacity(table.len());
        for token in &self.fields {
            let Some((tag, value)) = token.split_once('=') else {
                return Err(FormatError::MalformedTag {
                    family,
                    token: token.to_string(),
                });
            };
            let tag = tag.trim();
            let def = table
                .iter()
                .find(|d| d.spellings.iter().any(|s| *s == tag))
                .ok_or_else(|| FormatError::UnknownTag {
                    family,
                    tag: tag.to_string(),
                })?;
            if found.iter().any(|f| f.canonical == def.canonical) {
                return Err(FormatError::DuplicateTag {
                    family,
                    tag: tag.to_string(),
                });
            }
            found.push(TagValue {
                canonical: def.canonical,
                spelling: tag,
                value: value.trim(),
            });
        }

        let missing: Vec<String> = table
            .iter()
            .filter(|d| d.required && !found.iter().any(|f| f.canonical == d.canonical))
            .map(|d| d.canonical.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FormatError::MissingTags {
                family,
                tags: missing,
            });
        }
        Ok(TagValues { family, found })
    }
}

/// One accepted tag, with the spellings that map onto it
#[derive(Debug, Clone, Copy)]
pub struct TagDef {
    /// Canonical tag name
    pub canonical: &'static str,
    /// Accepted spellings (the canonical one included)
    pub spellings: &'static [&'static str],
    /// Whether the tag must be present
    pub required: bool,
}

impl TagDef {
    /// Required tag; the first spelling is the canonical one
    pub const fn required(tag: &'static [&'static str]) -> Self {
        Self {
            canonical: tag[0],
            spellings: tag,
            required: true,
        }
    }

    /// Optional tag; the first spelling is the canonical one
    pub const fn optional(tag: &'static [&'static str]) -> Self {
        Self {
            canonical: tag[0],
            spellings: tag,
            required: false,
        }
    }
}

#[derive(Debug, Clone)]
struct TagValue<'a> {
    canonical: &'static str,
    spelling: &'a str,
    value: &'a str,
}

/// Result of a tagged scan, looked up by canonical tag
#[derive(Debug, Clone)]
pub struct TagValues<'a> {
    family: &'static str,
    found: Vec<TagValue<'a>>,
}

impl<'a> TagValues<'a> {
    /// Value of an optional tag
    pub fn get(&self, canonical: &str) -> Option<&'a str> {
        self.found
            .iter()
            .find(|f| f.canonical == canonical)
            .map(|f| f.value)
    }

    /// Value of a required tag
    pub fn require(&self, canonical: &str) -> FormatResult<&'a str> {
        self.get(canonical).ok_or_else(|| FormatError::MissingTags {
            family: self.family,
            tags: vec![canonical.to_string()],
        })
    }

    /// Spelling used in the sentence for a canonical tag
    pub fn spelling(&self, canonical: &str) -> Option<&'a str> {
        self.found
            .iter()
            .find(|f| f.canonical == canonical)
            .map(|f| f.spelling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &[TagDef] = &[
        TagDef::required(&["A"]),
        TagDef::required(&["VE", "VX", "VB1"]),
        TagDef::optional(&["OPT"]),
    ];

    #[test]
    fn test_parse_splits_fields_and_checksum() {
        let s = Sentence::parse("$PNORH4,083013,132455,0,0*5D\r\n").unwrap();
        assert_eq!(s.prefix, "PNORH4");
        assert_eq!(s.fields, vec!["083013", "132455", "0", "0"]);
        assert_eq!(s.checksum.as_deref(), Some("5D"));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Sentence::parse("  "), Err(FormatError::Empty));
        assert_eq!(Sentence::parse("$,1,2"), Err(FormatError::Empty));
    }

    #[test]
    fn test_positional_count() {
        let s = Sentence::parse("$X,1,2,3").unwrap();
        assert!(s.positional("X", 3).is_ok());
        let err = s.positional("X", 4).unwrap_err();
        assert_eq!(err.to_string(), "X: expected 4 fields, got 3");
    }

    #[test]
    fn test_counted() {
        let s = Sentence::parse("$X,a,2,0.1,0.2").unwrap();
        let (head, n, values) = s.counted("X", 2, "count").unwrap();
        assert_eq!(head, &["a", "2"]);
        assert_eq!(n, 2);
        assert_eq!(values, &["0.1", "0.2"]);

        let s = Sentence::parse("$X,a,3,0.1,0.2").unwrap();
        assert_eq!(
            s.counted("X", 2, "count").unwrap_err(),
            FormatError::CountMismatch {
                field: "count",
                declared: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn test_tagged_order_independent_with_synonyms() {
        let s = Sentence::parse("$X,VX=1.5,A=2").unwrap();
        let tags = s.tagged("X", TABLE).unwrap();
        assert_eq!(tags.get("VE"), Some("1.5"));
        assert_eq!(tags.spelling("VE"), Some("VX"));
        assert_eq!(tags.require("A"), Ok("2"));
        assert_eq!(tags.get("OPT"), None);
    }

    #[test]
    fn test_tagged_unknown_duplicate_missing() {
        let s = Sentence::parse("$X,A=1,VE=1,Q=3").unwrap();
        assert!(matches!(
            s.tagged("X", TABLE),
            Err(FormatError::UnknownTag { tag, .. }) if tag == "Q"
        ));

        // a synonym of an already-seen tag counts as a repeat
        let s = Sentence::parse("$X,A=1,VE=1,VB1=2").unwrap();
        assert!(matches!(
            s.tagged("X", TABLE),
            Err(FormatError::DuplicateTag { tag, .. }) if tag == "VB1"
        ));

        let s = Sentence::parse("$X,OPT=1").unwrap();
        let err = s.tagged("X", TABLE).unwrap_err();
        assert_eq!(err.to_string(), "X: missing required tags A, VE");
    }

    #[test]
    fn test_tagged_malformed() {
        let s = Sentence::parse("$X,A=1,VE").unwrap();
        assert!(matches!(
            s.tagged("X", TABLE),
            Err(FormatError::MalformedTag { .. })
        ));
    }
}
