use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::logging::LogSink;
use crate::reconcile::config::ReconcileConfig;
use crate::reconcile::disposition::{self, Disposition};
use crate::reconcile::orchestrator::apply_corrections;
use crate::reconcile::relocate::{Relocation, relocate_key};
use crate::reconcile::report::{QaReport, report_key};
use crate::reconcile::store::FileStore;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub records_dir: PathBuf,
    pub qa_dir: PathBuf,
    pub dry_run: bool,
    pub config: ReconcileConfig,
}

impl BatchOptions {
    pub fn out_of_scope_dir(&self) -> PathBuf {
        self.records_dir
            .join(&self.config.quarantine.out_of_scope_dir)
    }

    pub fn duplicates_dir(&self) -> PathBuf {
        self.records_dir.join(&self.config.quarantine.duplicates_dir)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub processed: usize,
    pub corrected: usize,
    pub moved_out_of_scope: usize,
    pub moved_duplicate: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub key: String,
    pub record_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub actions: Vec<String>,
    pub recommendations: Vec<String>,
    pub unapplied: Vec<String>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub reports_found: usize,
    pub stats: BatchStats,
    pub entries: Vec<AuditEntry>,
}

#[derive(Debug, Clone)]
pub struct LoadedReport {
    pub path: PathBuf,
    pub report: QaReport,
}

fn display_path(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn parse_json(store: &dyn FileStore, path: &Path) -> Result<Value> {
    let raw = store.read_to_string(path)?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON: {}", path.display()))
}

/// Reads every report in `qa_dir` and keys it. Unreadable or unkeyed reports
/// are logged and left out. When two reports share a key the later file in
/// sorted order wins.
pub fn load_reports(
    store: &dyn FileStore,
    qa_dir: &Path,
    cfg: &ReconcileConfig,
    log: &mut dyn LogSink,
) -> Result<(usize, BTreeMap<String, LoadedReport>)> {
    let report_files: Vec<PathBuf> = store
        .list_files(qa_dir)?
        .into_iter()
        .filter(|p| has_extension(p, &cfg.reports.extension))
        .collect();

    let mut map = BTreeMap::new();
    for path in &report_files {
        let value = match parse_json(store, path) {
            Ok(value) => value,
            Err(err) => {
                log.error("load", None, format!("{err:#}"));
                continue;
            }
        };
        let Some(report) = QaReport::from_value(&value) else {
            log.error(
                "load",
                None,
                format!("QA report is not a JSON object: {}", path.display()),
            );
            continue;
        };
        let Some(key) = report_key(path, &report, &cfg.reports.key_suffix) else {
            log.warn(
                "load",
                None,
                format!("Skipping report with no key: {}", path.display()),
            );
            continue;
        };
        let loaded = LoadedReport {
            path: path.clone(),
            report,
        };
        if let Some(previous) = map.insert(key.clone(), loaded) {
            log.warn(
                "load",
                Some(key.as_str()),
                format!(
                    "Report {} replaces {} for the same key",
                    path.display(),
                    previous.path.display()
                ),
            );
        }
    }
    Ok((report_files.len(), map))
}

#[derive(Debug, Default)]
struct KeyResult {
    corrected: bool,
    disposition: Option<Disposition>,
}

fn process_key(
    store: &mut dyn FileStore,
    opts: &BatchOptions,
    key: &str,
    loaded: &LoadedReport,
    record_path: &Path,
    log: &mut dyn LogSink,
) -> Result<(KeyResult, AuditEntry)> {
    let mut record = parse_json(store, record_path)?;
    if !record.is_object() {
        anyhow::bail!("record is not a JSON object: {}", record_path.display());
    }

    let report = &loaded.report;
    let outcome = apply_corrections(
        &mut record,
        report,
        &opts.config.records.descriptor_field,
        key,
        log,
    );
    let mut actions = outcome.actions;
    let mut result = KeyResult::default();
    let mut relocations = Vec::new();

    if outcome.changed {
        result.corrected = true;
        if opts.dry_run {
            log.info(
                "persist",
                Some(key),
                format!("Dry-run: would write {}", record_path.display()),
            );
        } else {
            let data = serde_json::to_string_pretty(&record)?;
            store.write(record_path, &format!("{data}\n"))?;
        }
    }

    let disposition = disposition::resolve(report);
    let dest_dir = match disposition {
        Disposition::Normal => None,
        Disposition::OutOfScope => Some(opts.out_of_scope_dir()),
        Disposition::Duplicate(_) => Some(opts.duplicates_dir()),
    };
    if let Some(dest_dir) = dest_dir {
        relocations = relocate_key(store, &opts.records_dir, key, &dest_dir, opts.dry_run, log)?;
        let folder = dest_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match disposition {
            Disposition::Duplicate(reason) => actions.push(format!(
                "Moved to {folder} (duplicate by {})",
                reason.as_str()
            )),
            _ => actions.push(format!("Moved to {folder}")),
        }
        result.disposition = Some(disposition);
    }

    if actions.is_empty() {
        actions.push("No changes applied".to_string());
    }

    let entry = AuditEntry {
        key: key.to_string(),
        record_path: Some(display_path(record_path)),
        report_path: display_path(&loaded.path),
        actions,
        recommendations: report.recommendations.clone(),
        unapplied: outcome.unapplied,
        relocations,
    };
    Ok((result, entry))
}

/// Joins every QA report to its record and reconciles them in key order.
/// Failures on a single key are logged and that key is skipped.
pub fn run_batch(
    store: &mut dyn FileStore,
    opts: &BatchOptions,
    log: &mut dyn LogSink,
) -> Result<BatchOutcome> {
    let (reports_found, reports) = load_reports(store, &opts.qa_dir, &opts.config, log)?;
    let mut outcome = BatchOutcome {
        reports_found,
        ..BatchOutcome::default()
    };
    if reports_found == 0 {
        log.warn(
            "load",
            None,
            format!("No QA report files found in {}", opts.qa_dir.display()),
        );
        return Ok(outcome);
    }

    for (key, loaded) in &reports {
        let record_path = opts
            .records_dir
            .join(format!("{key}.{}", opts.config.records.extension));
        if !store.is_file(&record_path) {
            log.warn(
                "lookup",
                Some(key.as_str()),
                format!("No local record JSON found for {key}"),
            );
            outcome.stats.missing += 1;
            outcome.entries.push(AuditEntry {
                key: key.clone(),
                record_path: None,
                report_path: display_path(&loaded.path),
                actions: vec!["Record JSON missing".to_string()],
                recommendations: loaded.report.recommendations.clone(),
                unapplied: Vec::new(),
                relocations: Vec::new(),
            });
            continue;
        }

        match process_key(store, opts, key, loaded, &record_path, log) {
            Ok((result, entry)) => {
                outcome.stats.processed += 1;
                if result.corrected {
                    outcome.stats.corrected += 1;
                }
                match result.disposition {
                    Some(Disposition::OutOfScope) => outcome.stats.moved_out_of_scope += 1,
                    Some(Disposition::Duplicate(_)) => outcome.stats.moved_duplicate += 1,
                    _ => {}
                }
                outcome.entries.push(entry);
            }
            Err(err) => log.error("process", Some(key.as_str()), format!("{err:#}")),
        }
    }

    let stats = outcome.stats;
    log.info("summary", None, format!("Processed: {}", stats.processed));
    log.info("summary", None, format!("Corrected: {}", stats.corrected));
    log.info(
        "summary",
        None,
        format!("Moved (out-of-scope): {}", stats.moved_out_of_scope),
    );
    log.info(
        "summary",
        None,
        format!("Moved (duplicates): {}", stats.moved_duplicate),
    );
    log.info("summary", None, format!("Missing records: {}", stats.missing));
    Ok(outcome)
}
