use serde_json::Value;

use crate::logging::LogSink;
use crate::reconcile::appliers;
use crate::reconcile::report::QaReport;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionOutcome {
    pub changed: bool,
    pub actions: Vec<String>,
    pub unapplied: Vec<String>,
}

impl CorrectionOutcome {
    fn applied(&mut self, action: impl Into<String>) {
        self.changed = true;
        self.actions.push(action.into());
    }

    fn withheld(&mut self, note: impl Into<String>) {
        self.unapplied.push(note.into());
    }
}

fn current_text(record: &Value, field: &str) -> String {
    record
        .get("metadata")
        .and_then(|m| m.get(field))
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

/// Applies every correction carried by `report` to `record`.
///
/// Fields are handled in a fixed order: title, abstract, publication date,
/// descriptors, affiliations, organizational authors, related identifiers.
/// Affiliations run before organizational authors with no conflict check
/// between the two.
pub fn apply_corrections(
    record: &mut Value,
    report: &QaReport,
    descriptor_field: &str,
    key: &str,
    log: &mut dyn LogSink,
) -> CorrectionOutcome {
    let mut out = CorrectionOutcome::default();
    let corrections = &report.corrections;
    let gates = report.gates;

    if let Some(title) = &corrections.title {
        if gates.title {
            let old = current_text(record, "title");
            if appliers::apply_title(record, title) {
                log.info("apply", Some(key), format!("Title corrected: '{old}' -> '{title}'"));
                out.applied("Title corrected");
            }
        } else {
            out.withheld("Title correction present but title_corrected=false");
        }
    }

    if let Some(abstract_text) = &corrections.abstract_text {
        if gates.abstract_text {
            if appliers::apply_abstract(record, abstract_text) {
                log.info("apply", Some(key), "Abstract corrected".to_string());
                out.applied("Abstract corrected");
            }
        } else {
            out.withheld("Abstract correction present but abstract_corrected=false");
        }
    }

    if let Some(date) = &corrections.publication_date {
        if gates.publication_date {
            let old = current_text(record, "publication_date");
            if appliers::apply_publication_date(record, date) {
                log.info(
                    "apply",
                    Some(key),
                    format!("Publication date corrected: '{old}' -> '{date}'"),
                );
                out.applied("Publication date corrected");
            }
        } else {
            out.withheld("Publication date correction present but date_corrected=false");
        }
    }

    if let Some(deletions) = &corrections.delete_descriptor {
        if gates.descriptors {
            match appliers::delete_descriptors(record, descriptor_field, deletions) {
                Ok(true) => {
                    log.info(
                        "apply",
                        Some(key),
                        format!("Descriptors deleted: {}", deletions.join(", ")),
                    );
                    out.applied("Descriptors deleted");
                }
                Ok(false) => {}
                Err(err) => log.warn("apply", Some(key), err.to_string()),
            }
        } else {
            out.withheld("Descriptor deletions present but descriptor_corrected=false");
        }
    }

    let affiliations = &report.affiliation_corrections;
    if gates.affiliations {
        let applied = appliers::apply_affiliations(record, affiliations);
        if applied > 0 {
            log.info(
                "apply",
                Some(key),
                format!("Affiliations corrected ({applied})"),
            );
            out.applied(format!("Affiliations corrected ({applied})"));
        } else if !affiliations.is_empty() {
            out.withheld("Affiliation corrections present but no matches found");
        }
    } else if !affiliations.is_empty() {
        out.withheld(
            "Affiliation corrections present but affiliation_correction_recommended=false",
        );
    }

    let org_authors = &report.organizational_author_corrections;
    if !org_authors.is_empty() {
        let applied = appliers::apply_org_authors(record, org_authors);
        if applied > 0 {
            log.info(
                "apply",
                Some(key),
                format!("Organizational authors corrected ({applied})"),
            );
            out.applied(format!("Organizational authors corrected ({applied})"));
        } else {
            out.withheld("Organizational author corrections present but no matches found");
        }
    }

    if !corrections.related_identifiers.is_empty() {
        let added = appliers::add_related_identifiers(record, &corrections.related_identifiers);
        if added > 0 {
            log.info(
                "apply",
                Some(key),
                format!("Related identifiers added ({added})"),
            );
            out.applied(format!("Related identifiers added ({added})"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, MemorySink};
    use serde_json::json;

    const FIELD: &str = "iaea:descriptors_cai_text";

    fn run(record: &mut Value, report: Value) -> (CorrectionOutcome, MemorySink) {
        let report = QaReport::from_value(&report).unwrap();
        let mut log = MemorySink::default();
        let out = apply_corrections(record, &report, FIELD, "k", &mut log);
        (out, log)
    }

    #[test]
    fn gated_title_is_applied() {
        let mut record = json!({"metadata": {"title": "Old"}});
        let (out, _) = run(
            &mut record,
            json!({"corrections": {"title": "New"}, "title_corrected": true}),
        );
        assert!(out.changed);
        assert_eq!(out.actions, vec!["Title corrected"]);
        assert_eq!(record, json!({"metadata": {"title": "New"}}));
    }

    #[test]
    fn title_withheld_when_gate_false() {
        let mut record = json!({"metadata": {"title": "Old"}});
        let (out, _) = run(
            &mut record,
            json!({"corrections": {"title": "New"}, "title_corrected": false}),
        );
        assert!(!out.changed);
        assert!(out.actions.is_empty());
        assert_eq!(
            out.unapplied,
            vec!["Title correction present but title_corrected=false"]
        );
        assert_eq!(record["metadata"]["title"], "Old");
    }

    #[test]
    fn absent_corrections_are_silent() {
        let mut record = json!({"metadata": {"title": "Old"}});
        let (out, _) = run(&mut record, json!({"title_corrected": false}));
        assert_eq!(out, CorrectionOutcome::default());
    }

    #[test]
    fn every_gate_produces_its_own_note() {
        let mut record = json!({"metadata": {}});
        let (out, _) = run(
            &mut record,
            json!({
                "corrections": {"abstract": "A", "publication_date": "2020", "delete_descriptor": ["x"]},
                "abstract_corrected": false,
                "date_corrected": false,
                "descriptor_corrected": false,
                "affiliation_correction_recommended": false,
                "affiliation_corrections": [{"old_affiliation": "a", "recommended_affiliation": "b"}]
            }),
        );
        assert_eq!(
            out.unapplied,
            vec![
                "Abstract correction present but abstract_corrected=false",
                "Publication date correction present but date_corrected=false",
                "Descriptor deletions present but descriptor_corrected=false",
                "Affiliation corrections present but affiliation_correction_recommended=false",
            ]
        );
    }

    #[test]
    fn unmatched_rename_lists_are_surfaced() {
        let mut record = json!({"metadata": {"creators": []}});
        let (out, _) = run(
            &mut record,
            json!({
                "affiliation_corrections": [{"old_affiliation": "a", "recommended_affiliation": "b"}],
                "organizational_author_corrections": [{"old_organizational_author": "o", "recommended_organizational_author": "p"}]
            }),
        );
        assert!(!out.changed);
        assert_eq!(
            out.unapplied,
            vec![
                "Affiliation corrections present but no matches found",
                "Organizational author corrections present but no matches found",
            ]
        );
    }

    #[test]
    fn actions_follow_fixed_field_order_with_counts() {
        let mut record = json!({
            "metadata": {
                "title": "t",
                "creators": [
                    {"person_or_org": {"type": "organizational", "name": "Old Org"}, "affiliations": [{"name": "Lab"}]},
                    {"person_or_org": {"type": "personal", "name": "X"}, "affiliations": [{"name": "Lab"}]}
                ]
            },
            "custom_fields": {FIELD: ["A", "B"]}
        });
        let (out, log) = run(
            &mut record,
            json!({
                "corrections": {
                    "related_identifiers": [{"identifier": "10.1/z"}],
                    "delete_descriptor": "a",
                    "title": "T"
                },
                "affiliation_corrections": [{"old_affiliation": "Lab", "recommended_affiliation": "Laboratory"}],
                "organizational_author_corrections": [{"old_organizational_author": "Old Org", "recommended_organizational_author": "New Org"}]
            }),
        );
        assert_eq!(
            out.actions,
            vec![
                "Title corrected",
                "Descriptors deleted",
                "Affiliations corrected (2)",
                "Organizational authors corrected (1)",
                "Related identifiers added (1)",
            ]
        );
        assert!(out.unapplied.is_empty());
        assert_eq!(log.at_level(Level::Info).count(), 5);
    }

    #[test]
    fn second_application_is_a_noop() {
        let mut record = json!({
            "metadata": {"title": "Old", "creators": [{"person_or_org": {"type": "personal"}, "affiliations": [{"name": "A"}]}]},
            "custom_fields": {FIELD: "x; y"}
        });
        let report = json!({
            "corrections": {"title": "New", "delete_descriptor": "x", "related_identifiers": {"identifier": "id"}},
            "affiliation_corrections": [{"old_affiliation": "A", "recommended_affiliation": "B"}]
        });
        let (first, _) = run(&mut record, report.clone());
        assert!(first.changed);
        let snapshot = record.clone();
        let (second, _) = run(&mut record, report);
        assert!(!second.changed);
        assert!(second.actions.is_empty());
        assert_eq!(record, snapshot);
    }

    #[test]
    fn null_gate_withholds_correction() {
        let mut record = json!({"metadata": {"title": "Old"}});
        let (out, _) = run(
            &mut record,
            json!({"corrections": {"title": "New"}, "title_corrected": null}),
        );
        assert!(!out.changed);
        assert_eq!(record["metadata"]["title"], "Old");
        assert_eq!(
            out.unapplied,
            vec!["Title correction present but title_corrected=false"]
        );
    }

    #[test]
    fn falsy_descriptor_value_is_silent() {
        for stored in [json!(false), json!(0)] {
            let mut record = json!({"custom_fields": {FIELD: stored}});
            let (out, log) = run(&mut record, json!({"corrections": {"delete_descriptor": "x"}}));
            assert!(!out.changed);
            assert_eq!(log.at_level(Level::Warn).count(), 0);
        }
    }

    #[test]
    fn unknown_descriptor_shape_logs_warning_only() {
        let mut record = json!({"custom_fields": {FIELD: 42}});
        let (out, log) = run(&mut record, json!({"corrections": {"delete_descriptor": "x"}}));
        assert!(!out.changed);
        assert!(out.unapplied.is_empty());
        assert_eq!(log.at_level(Level::Warn).count(), 1);
    }
}
