//! Typed view over a QA report document.
//!
//! Reports arrive as loosely shaped JSON. Everything is resolved once here,
//! including gate defaults, so the orchestrator never inspects raw values.

use serde_json::{Map, Value};
use std::path::Path;

/// JSON truthiness: `null`, `false`, `0`, `""`, `[]` and `{}` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// A gate flag: only an absent key means apply. An explicit `null` is falsy.
fn gate(root: &Map<String, Value>, name: &str) -> bool {
    match root.get(name) {
        None => true,
        Some(value) => is_truthy(value),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gates {
    pub title: bool,
    pub abstract_text: bool,
    pub publication_date: bool,
    pub descriptors: bool,
    pub affiliations: bool,
}

impl Default for Gates {
    fn default() -> Self {
        Self {
            title: true,
            abstract_text: true,
            publication_date: true,
            descriptors: true,
            affiliations: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePair {
    pub old: String,
    pub new: String,
}

impl RenamePair {
    fn from_value(value: &Value, old_field: &str, new_field: &str) -> Self {
        let field = |name: &str| value.get(name).map(text_of).unwrap_or_default();
        Self {
            old: field(old_field),
            new: field(new_field),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.old.is_empty() && !self.new.is_empty()
    }
}

/// Correction payloads. `Some` means the key was present in `corrections`,
/// even when its value is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corrections {
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub publication_date: Option<String>,
    pub delete_descriptor: Option<Vec<String>>,
    pub related_identifiers: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateReason {
    Title,
    Doi,
    TitleAndDoi,
}

impl DuplicateReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Doi => "doi",
            Self::TitleAndDoi => "title and doi",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaReport {
    pub record_id: Option<String>,
    pub corrections: Corrections,
    pub gates: Gates,
    pub affiliation_corrections: Vec<RenamePair>,
    pub organizational_author_corrections: Vec<RenamePair>,
    pub scope_ok: Option<Value>,
    pub duplicate_by_title: bool,
    pub duplicate_by_doi: bool,
    pub recommendations: Vec<String>,
}

fn list_of<'a>(root: &'a Map<String, Value>, name: &str) -> &'a [Value] {
    match root.get(name) {
        Some(Value::Array(items)) => items,
        _ => &[],
    }
}

fn parse_descriptor_deletions(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(ToOwned::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_related_identifiers(value: &Value) -> Vec<Map<String, Value>> {
    match value {
        Value::Object(obj) if !obj.is_empty() => vec![obj.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .cloned()
            .collect(),
        _ => Vec::new(),
    }
}

impl Corrections {
    fn from_value(value: Option<&Value>) -> Self {
        let Some(Value::Object(obj)) = value else {
            return Self::default();
        };
        Self {
            title: obj.get("title").map(text_of),
            abstract_text: obj.get("abstract").map(text_of),
            publication_date: obj.get("publication_date").map(text_of),
            delete_descriptor: obj.get("delete_descriptor").map(parse_descriptor_deletions),
            related_identifiers: obj
                .get("related_identifiers")
                .map(parse_related_identifiers)
                .unwrap_or_default(),
        }
    }
}

impl QaReport {
    /// Returns `None` when the document is not a JSON object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let root = value.as_object()?;
        Some(Self {
            record_id: root
                .get("record_id")
                .filter(|v| is_truthy(v))
                .map(text_of),
            corrections: Corrections::from_value(root.get("corrections")),
            gates: Gates {
                title: gate(root, "title_corrected"),
                abstract_text: gate(root, "abstract_corrected"),
                publication_date: gate(root, "date_corrected"),
                descriptors: gate(root, "descriptor_corrected"),
                affiliations: gate(root, "affiliation_correction_recommended"),
            },
            affiliation_corrections: list_of(root, "affiliation_corrections")
                .iter()
                .map(|v| RenamePair::from_value(v, "old_affiliation", "recommended_affiliation"))
                .collect(),
            organizational_author_corrections: list_of(root, "organizational_author_corrections")
                .iter()
                .map(|v| {
                    RenamePair::from_value(
                        v,
                        "old_organizational_author",
                        "recommended_organizational_author",
                    )
                })
                .collect(),
            scope_ok: root.get("scope_ok").cloned(),
            duplicate_by_title: root.get("duplicate_by_title").is_some_and(is_truthy),
            duplicate_by_doi: root.get("duplicate_by_doi").is_some_and(is_truthy),
            recommendations: list_of(root, "recommendations")
                .iter()
                .map(text_of)
                .collect(),
        })
    }

    pub fn out_of_scope(&self) -> bool {
        matches!(self.scope_ok, Some(Value::Bool(false)))
    }

    pub fn duplicate_reason(&self) -> Option<DuplicateReason> {
        match (self.duplicate_by_title, self.duplicate_by_doi) {
            (true, true) => Some(DuplicateReason::TitleAndDoi),
            (true, false) => Some(DuplicateReason::Title),
            (false, true) => Some(DuplicateReason::Doi),
            (false, false) => None,
        }
    }
}

/// Join key for a report: explicit `record_id`, else the file stem with
/// `suffix` removed, else the raw stem. An empty result yields `None`.
pub fn report_key(report_path: &Path, report: &QaReport, suffix: &str) -> Option<String> {
    if let Some(id) = &report.record_id {
        return Some(id.clone());
    }
    let stem = report_path.file_stem()?.to_str()?;
    let key = if suffix.is_empty() {
        stem
    } else {
        stem.strip_suffix(suffix).unwrap_or(stem)
    };
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> QaReport {
        QaReport::from_value(&value).expect("object report")
    }

    #[test]
    fn key_prefers_record_id_then_stem() {
        let with_id = parse(json!({"record_id": 123}));
        assert_eq!(
            report_key(Path::new("/qa/abc-report.json"), &with_id, "-report").as_deref(),
            Some("123")
        );

        let bare = parse(json!({}));
        assert_eq!(
            report_key(Path::new("/qa/abc-report.json"), &bare, "-report").as_deref(),
            Some("abc")
        );
        assert_eq!(
            report_key(Path::new("/qa/abc.json"), &bare, "-report").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn falsy_record_id_falls_back_to_stem() {
        let report = parse(json!({"record_id": ""}));
        assert_eq!(
            report_key(Path::new("xyz-report.json"), &report, "-report").as_deref(),
            Some("xyz")
        );
    }

    #[test]
    fn bare_suffix_filename_has_no_key() {
        let report = parse(json!({}));
        assert_eq!(report_key(Path::new("-report.json"), &report, "-report"), None);
    }

    #[test]
    fn gates_default_to_true_only_when_absent() {
        let report = parse(json!({"title_corrected": false, "date_corrected": null}));
        assert!(!report.gates.title);
        assert!(!report.gates.publication_date);
        assert!(report.gates.abstract_text);
        assert!(report.gates.affiliations);
    }

    #[test]
    fn corrections_presence_is_tracked_even_when_empty() {
        let report = parse(json!({"corrections": {"title": "", "delete_descriptor": "Foo"}}));
        assert_eq!(report.corrections.title.as_deref(), Some(""));
        assert_eq!(report.corrections.abstract_text, None);
        assert_eq!(
            report.corrections.delete_descriptor,
            Some(vec!["Foo".to_string()])
        );
    }

    #[test]
    fn single_related_identifier_object_becomes_list() {
        let report = parse(json!({
            "corrections": {"related_identifiers": {"identifier": "10.1/x", "scheme": "doi"}}
        }));
        assert_eq!(report.corrections.related_identifiers.len(), 1);
    }

    #[test]
    fn scope_flag_only_counts_literal_false() {
        assert!(parse(json!({"scope_ok": false})).out_of_scope());
        assert!(!parse(json!({"scope_ok": 0})).out_of_scope());
        assert!(!parse(json!({"scope_ok": null})).out_of_scope());
        assert!(!parse(json!({})).out_of_scope());
    }

    #[test]
    fn duplicate_reason_combines_flags() {
        let both = parse(json!({"duplicate_by_title": true, "duplicate_by_doi": "yes"}));
        assert_eq!(both.duplicate_reason(), Some(DuplicateReason::TitleAndDoi));
        let doi = parse(json!({"duplicate_by_doi": 1}));
        assert_eq!(doi.duplicate_reason(), Some(DuplicateReason::Doi));
        assert_eq!(parse(json!({"duplicate_by_title": false})).duplicate_reason(), None);
    }

    #[test]
    fn non_object_report_is_rejected() {
        assert!(QaReport::from_value(&json!([1, 2])).is_none());
    }
}
