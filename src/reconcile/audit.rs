use std::path::{Path, PathBuf};

use crate::reconcile::batch::{BatchOptions, BatchOutcome};

#[derive(Debug, Clone)]
pub struct AuditHeader {
    pub generated: String,
    pub dry_run: bool,
    pub records_dir: PathBuf,
    pub qa_dir: PathBuf,
    pub out_of_scope_dir: PathBuf,
    pub duplicates_dir: PathBuf,
}

impl AuditHeader {
    pub fn for_run(opts: &BatchOptions) -> Self {
        Self {
            generated: chrono::Local::now()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            dry_run: opts.dry_run,
            records_dir: opts.records_dir.clone(),
            qa_dir: opts.qa_dir.clone(),
            out_of_scope_dir: opts.out_of_scope_dir(),
            duplicates_dir: opts.duplicates_dir(),
        }
    }
}

/// Where the audit goes: a directory gets `file_name` inside it, a `.md`
/// path is used as is, anything else lands next to it as `file_name`.
pub fn resolve_audit_path(requested: Option<&Path>, qa_dir: &Path, file_name: &str) -> PathBuf {
    let Some(requested) = requested else {
        return qa_dir.join(file_name);
    };
    if requested.is_dir() {
        return requested.join(file_name);
    }
    let is_markdown = requested
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    if is_markdown {
        return requested.to_path_buf();
    }
    requested
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(file_name)
}

pub fn render_markdown(header: &AuditHeader, outcome: &BatchOutcome) -> String {
    let mut out = String::new();
    let stats = &outcome.stats;

    out.push_str("# Local Auto-Correction Report\n\n");
    out.push_str(&format!("- Generated: {}\n", header.generated));
    out.push_str(&format!("- Dry run: {}\n", if header.dry_run { "yes" } else { "no" }));
    out.push_str(&format!("- Records dir: {}\n", header.records_dir.display()));
    out.push_str(&format!("- QA dir: {}\n", header.qa_dir.display()));
    out.push_str(&format!("- Out-of-scope dir: {}\n", header.out_of_scope_dir.display()));
    out.push_str(&format!("- Duplicates dir: {}\n", header.duplicates_dir.display()));
    out.push_str("\n## Summary\n\n");
    out.push_str(&format!("- Reports processed: {}\n", stats.processed));
    out.push_str(&format!("- Records corrected: {}\n", stats.corrected));
    out.push_str(&format!("- Records moved (out-of-scope): {}\n", stats.moved_out_of_scope));
    out.push_str(&format!("- Records moved (duplicates): {}\n", stats.moved_duplicate));
    out.push_str(&format!("- Records missing: {}\n", stats.missing));
    out.push_str("\n## Details\n\n");

    if outcome.entries.is_empty() {
        out.push_str("_No records processed._\n");
        return out;
    }

    for entry in &outcome.entries {
        out.push_str(&format!("### {}\n\n", entry.key));
        if let Some(record_path) = &entry.record_path {
            out.push_str(&format!("- Record file: `{}`\n", record_path.display()));
        }
        out.push_str(&format!("- QA report: `{}`\n", entry.report_path.display()));
        if entry.actions.is_empty() {
            out.push_str("- Actions: none\n");
        } else {
            out.push_str("- Actions:\n");
            for action in &entry.actions {
                out.push_str(&format!("  - {action}\n"));
            }
        }

        if entry.recommendations.is_empty() && entry.unapplied.is_empty() {
            out.push_str("- Recommendations not applied: none\n");
        } else {
            out.push_str("- Recommendations not applied:\n");
            for note in entry.recommendations.iter().chain(&entry.unapplied) {
                out.push_str(&format!("  - {note}\n"));
            }
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::batch::{AuditEntry, BatchStats};

    fn header(dry_run: bool) -> AuditHeader {
        AuditHeader {
            generated: "2026-01-02T03:04:05".to_string(),
            dry_run,
            records_dir: PathBuf::from("/records"),
            qa_dir: PathBuf::from("/qa"),
            out_of_scope_dir: PathBuf::from("/records/Possible_Out_Of_Scope"),
            duplicates_dir: PathBuf::from("/records/Possible_Duplicates"),
        }
    }

    #[test]
    fn empty_run_says_so() {
        let text = render_markdown(&header(false), &BatchOutcome::default());
        assert!(text.contains("- Dry run: no\n"));
        assert!(text.contains("- Reports processed: 0\n"));
        assert!(text.ends_with("_No records processed._\n"));
    }

    #[test]
    fn entries_list_actions_then_notes() {
        let outcome = BatchOutcome {
            reports_found: 2,
            stats: BatchStats {
                processed: 1,
                corrected: 1,
                missing: 1,
                ..BatchStats::default()
            },
            entries: vec![
                AuditEntry {
                    key: "1".to_string(),
                    record_path: Some(PathBuf::from("/records/1.json")),
                    report_path: PathBuf::from("/qa/1-report.json"),
                    actions: vec!["Title corrected".to_string()],
                    recommendations: vec!["Consider adding keywords".to_string()],
                    unapplied: vec!["Abstract correction present but abstract_corrected=false".to_string()],
                    relocations: Vec::new(),
                },
                AuditEntry {
                    key: "999".to_string(),
                    record_path: None,
                    report_path: PathBuf::from("/qa/999-report.json"),
                    actions: vec!["Record JSON missing".to_string()],
                    recommendations: Vec::new(),
                    unapplied: Vec::new(),
                    relocations: Vec::new(),
                },
            ],
        };
        let text = render_markdown(&header(true), &outcome);

        assert!(text.contains("- Dry run: yes\n"));
        assert!(text.contains(
            "### 1\n\n- Record file: `/records/1.json`\n- QA report: `/qa/1-report.json`\n- Actions:\n  - Title corrected\n- Recommendations not applied:\n  - Consider adding keywords\n  - Abstract correction present but abstract_corrected=false\n"
        ));
        assert!(text.contains(
            "### 999\n\n- QA report: `/qa/999-report.json`\n- Actions:\n  - Record JSON missing\n- Recommendations not applied: none\n"
        ));
    }

    #[test]
    fn audit_path_resolution() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let qa = Path::new("/qa");
        assert_eq!(
            resolve_audit_path(None, qa, "corrections-report.md"),
            PathBuf::from("/qa/corrections-report.md")
        );
        assert_eq!(
            resolve_audit_path(Some(tmp.path()), qa, "corrections-report.md"),
            tmp.path().join("corrections-report.md")
        );
        assert_eq!(
            resolve_audit_path(Some(Path::new("/out/Audit.MD")), qa, "corrections-report.md"),
            PathBuf::from("/out/Audit.MD")
        );
        assert_eq!(
            resolve_audit_path(Some(Path::new("/out/audit.txt")), qa, "corrections-report.md"),
            PathBuf::from("/out/corrections-report.md")
        );
    }
}
