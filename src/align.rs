//! Locating translated counterparts of source lines.
//!
//! Script translations are made of marker blocks: a label carrying the
//! source line's content hash, followed by the translated line. Record
//! translations are aligned by record identifier.

use std::collections::HashMap;

use crate::document::{Document, DocumentFormat, Line, LineKind};
use crate::error::{Result, ToolError};

/// The translated line matching a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counterpart<'a> {
    /// `None` when the marker region holds no translatable line, i.e. the
    /// source line is left untranslated.
    pub line: Option<&'a Line>,
    /// Number of translatable lines found in the marker region.
    pub candidates: usize,
}

/// Finds the counterpart of `source` in `translated`.
///
/// Returns `None` when no marker carries the source line's hash.
pub fn find_counterpart<'a>(source: &Line, translated: &'a Document) -> Option<Counterpart<'a>> {
    match translated.format {
        DocumentFormat::Script => find_in_script(source, translated),
        DocumentFormat::Records { .. } => find_record(source, translated),
    }
}

fn find_in_script<'a>(source: &Line, translated: &'a Document) -> Option<Counterpart<'a>> {
    let lines = &translated.lines;
    let start = lines
        .iter()
        .position(|line| line.label() == Some(source.hash.as_str()))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.kind == LineKind::Label)
        .map_or(lines.len(), |offset| start + 1 + offset);

    let mut candidates = lines[start + 1..end]
        .iter()
        .filter(|line| line.is_structurally_translatable());
    let line = candidates.next();
    Some(Counterpart {
        line,
        candidates: line.map_or(0, |_| 1 + candidates.count()),
    })
}

fn find_record<'a>(source: &Line, translated: &'a Document) -> Option<Counterpart<'a>> {
    let mut matches = translated
        .lines
        .iter()
        .filter(|line| line.kind == LineKind::Record && line.hash == source.hash);
    let line = matches.next()?;
    Some(Counterpart {
        line: Some(line),
        candidates: 1 + matches.count(),
    })
}

/// Parses the locale tag from the first freestanding comment of a translated
/// document, e.g. `; <ja-JP> Japanese`.
///
/// Comments after the first marker describe source lines and are ignored.
pub fn extract_locale_tag(document: &Document) -> Result<String> {
    document
        .lines
        .iter()
        .take_while(|line| line.kind != LineKind::Label)
        .find_map(Line::comment)
        .and_then(parse_tag)
        .ok_or_else(|| ToolError::LocaleTag(document.id.clone()))
}

/// Returns whether `candidate` is shaped like a BCP 47 language tag: a
/// two- or three-letter lowercase language subtag, optionally followed by
/// `-` or `_` separated subtags of one to eight alphanumerics (`ja`,
/// `pt-BR`, `zh_Hans_CN`).
pub fn is_locale_tag(candidate: &str) -> bool {
    let mut subtags = candidate.split(['-', '_']);
    let language = subtags.next().unwrap_or_default();
    let language_ok = (2..=3).contains(&language.len())
        && language.bytes().all(|byte| byte.is_ascii_lowercase());

    language_ok
        && subtags.all(|subtag| {
            (1..=8).contains(&subtag.len()) && subtag.bytes().all(|byte| byte.is_ascii_alphanumeric())
        })
}

fn parse_tag(comment: &str) -> Option<String> {
    let open = comment.find('<')?;
    let close = open + comment[open..].find('>')?;
    let tag = comment[open + 1..close].trim();
    is_locale_tag(tag).then(|| tag.to_string())
}

/// Locale tags memoized per document identifier for one conversion run.
#[derive(Debug, Default)]
pub struct LocaleTagCache {
    tags: HashMap<String, String>,
}

impl LocaleTagCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the tag of `document`, parsing it on first use.
    pub fn tag_for(&mut self, document: &Document) -> Result<String> {
        if let Some(tag) = self.tags.get(&document.id) {
            return Ok(tag.clone());
        }
        let tag = extract_locale_tag(document)?;
        self.tags.insert(document.id.clone(), tag.clone());
        Ok(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(id: &str, text: &str) -> Document {
        Document::parse(id, text, DocumentFormat::Script)
    }

    #[test]
    fn counterpart_is_first_translatable_line_after_marker() {
        let source = script("intro", "Alice: Hi.\nBob: Bye.\n");
        let translated = script(
            "ja/intro",
            &format!(
                "; <ja>\n# {}\n; Alice: Hi.\nAlice: Konnichiwa.\n# {}\n; Bob: Bye.\nBob: Sayonara.\n",
                source.lines[0].hash, source.lines[1].hash
            ),
        );

        let first = find_counterpart(&source.lines[0], &translated).unwrap();
        assert_eq!(first.line.unwrap().text, "Alice: Konnichiwa.");
        assert_eq!(first.candidates, 1);

        let second = find_counterpart(&source.lines[1], &translated).unwrap();
        assert_eq!(second.line.unwrap().text, "Bob: Sayonara.");
    }

    #[test]
    fn marker_without_translated_line_is_untranslated() {
        let source = script("intro", "Alice: Hi.\nBob: Bye.\n");
        let translated = script(
            "ja/intro",
            &format!("# {}\n; Alice: Hi.\n# {}\nBob: Sayonara.\n", source.lines[0].hash, source.lines[1].hash),
        );

        let counterpart = find_counterpart(&source.lines[0], &translated).unwrap();
        assert_eq!(counterpart.line, None);
        assert_eq!(counterpart.candidates, 0);
    }

    #[test]
    fn multiple_candidates_are_counted() {
        let source = script("intro", "Alice: Hi.\n");
        let translated = script(
            "ja/intro",
            &format!("# {}\nAlice: One.\n@wait 1\nAlice: Two.\n", source.lines[0].hash),
        );

        let counterpart = find_counterpart(&source.lines[0], &translated).unwrap();
        assert_eq!(counterpart.line.unwrap().text, "Alice: One.");
        assert_eq!(counterpart.candidates, 3);
    }

    #[test]
    fn missing_marker_yields_none() {
        let source = script("intro", "Alice: Hi.\n");
        let translated = script("ja/intro", "; <ja>\n# 000000000000\nAlice: Hm.\n");
        assert!(find_counterpart(&source.lines[0], &translated).is_none());
    }

    #[test]
    fn records_align_by_identifier() {
        let format = DocumentFormat::Records {
            separator: "=".to_string(),
        };
        let source = Document::parse("ui", "farewell=Bye\ngreeting=Hello\n", format.clone());
        let translated = Document::parse("de/ui", "; <de>\ngreeting=Hallo\nfarewell=Tschüss\n", format);

        let counterpart = find_counterpart(&source.lines[1], &translated).unwrap();
        assert_eq!(counterpart.line.unwrap().text, "greeting=Hallo");
    }

    #[test]
    fn locale_tag_comes_from_first_freestanding_comment() {
        let document = script("ja/intro", "; <ja-JP> Japanese\n# abc\n; <xx> source echo\n");
        assert_eq!(extract_locale_tag(&document).unwrap(), "ja-JP");
    }

    #[test]
    fn missing_or_malformed_tag_is_locale_tag_error() {
        let document = script("ja/intro", "; Japanese\n# abc\n; <xx>\n");
        assert!(matches!(extract_locale_tag(&document), Err(ToolError::LocaleTag(ref id)) if id == "ja/intro"));

        let document = script("bad", "; <ja JP>\n");
        assert!(extract_locale_tag(&document).is_err());
    }

    #[test]
    fn locale_tags_follow_language_tag_shape() {
        for tag in ["ja", "en", "fil", "ja-JP", "pt_BR", "zh-Hans-CN"] {
            assert!(is_locale_tag(tag), "{tag}");
        }
        for header in ["", "Notes", "Comments", "JA", "j", "english", "ja-", "ja JP", "ja-toolongsubtag"] {
            assert!(!is_locale_tag(header), "{header}");
        }
    }

    #[test]
    fn cache_memoizes_by_document_identifier() {
        let mut cache = LocaleTagCache::new();
        let first = script("locale/intro", "; <fr>\n");
        let renamed = script("locale/intro", "; <de>\n");

        assert_eq!(cache.tag_for(&first).unwrap(), "fr");
        assert_eq!(cache.tag_for(&renamed).unwrap(), "fr");
    }
}
