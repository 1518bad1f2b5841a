use anyhow::Result;
use std::path::PathBuf;

use crate::commands::CommandReport;
use crate::error::ReconcileError;
use crate::logging::{LogSink, StderrSink};
use crate::reconcile::audit::{AuditHeader, render_markdown, resolve_audit_path};
use crate::reconcile::batch::{BatchOptions, run_batch};
use crate::reconcile::config::{load_config, validate};
use crate::reconcile::store::{FileStore, FsStore};

#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
    pub records_dir: PathBuf,
    pub qa_dir: PathBuf,
    pub out_of_scope_dir: Option<String>,
    pub duplicates_dir: Option<String>,
    pub dry_run: bool,
    pub report: Option<PathBuf>,
    pub quiet: bool,
}

pub fn run(opts: &ReconcileOptions) -> Result<CommandReport> {
    if !opts.records_dir.exists() {
        return Err(ReconcileError::MissingRecordsDir(opts.records_dir.clone()).into());
    }
    if !opts.qa_dir.exists() {
        return Err(ReconcileError::MissingQaDir(opts.qa_dir.clone()).into());
    }

    let mut config = load_config()?;
    if let Some(name) = &opts.out_of_scope_dir {
        config.quarantine.out_of_scope_dir = name.clone();
    }
    if let Some(name) = &opts.duplicates_dir {
        config.quarantine.duplicates_dir = name.clone();
    }
    validate(&config)?;

    let batch_opts = BatchOptions {
        records_dir: opts.records_dir.clone(),
        qa_dir: opts.qa_dir.clone(),
        dry_run: opts.dry_run,
        config,
    };
    let mut store = FsStore;
    let mut log = StderrSink::new(opts.quiet);
    let mut report = CommandReport::new("reconcile");
    if opts.dry_run {
        report.detail("dry_run=true");
    }

    let outcome = run_batch(&mut store, &batch_opts, &mut log)?;
    if outcome.reports_found == 0 {
        report.detail(format!(
            "no QA report files found in {}",
            opts.qa_dir.display()
        ));
        return Ok(report);
    }

    let stats = outcome.stats;
    report.detail(format!("processed={}", stats.processed));
    report.detail(format!("corrected={}", stats.corrected));
    report.detail(format!("moved_out_of_scope={}", stats.moved_out_of_scope));
    report.detail(format!("moved_duplicates={}", stats.moved_duplicate));
    report.detail(format!("missing={}", stats.missing));
    let verb = if opts.dry_run { "would_relocate" } else { "relocated" };
    for relocation in outcome.entries.iter().flat_map(|e| &e.relocations) {
        report.detail(format!(
            "{verb} {} -> {}",
            relocation.from.display(),
            relocation.to.display()
        ));
    }

    let audit_path = resolve_audit_path(
        opts.report.as_deref(),
        &batch_opts.qa_dir,
        &batch_opts.config.audit.file_name,
    );
    let markdown = render_markdown(&AuditHeader::for_run(&batch_opts), &outcome);
    match store.write(&audit_path, &markdown) {
        Ok(()) => {
            log.info(
                "audit",
                None,
                format!("Report written to {}", audit_path.display()),
            );
            report.detail(format!("audit_path={}", audit_path.display()));
        }
        Err(err) => report.issue(format!("failed to write audit report: {err:#}")),
    }

    Ok(report)
}
