use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::reconcile::config::{load_config, resolve_config_path};

include!(concat!(env!("OUT_DIR"), "/reconcile_env_allowlist.rs"));

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("config");
    report.detail(format!("build_id={}", env!("BUILD_UUID")));

    match resolve_config_path() {
        Some(path) if path.exists() => {
            report.detail(format!("config_path={}", path.display()));
        }
        Some(path) => report.detail(format!("config_path={} (not present)", path.display())),
        None => report.detail("config_path=unresolved"),
    }

    match load_config() {
        Ok(cfg) => {
            report.detail(format!(
                "quarantine.out_of_scope_dir={}",
                cfg.quarantine.out_of_scope_dir
            ));
            report.detail(format!(
                "quarantine.duplicates_dir={}",
                cfg.quarantine.duplicates_dir
            ));
            report.detail(format!("audit.file_name={}", cfg.audit.file_name));
            report.detail(format!("records.extension={}", cfg.records.extension));
            report.detail(format!(
                "records.descriptor_field={}",
                cfg.records.descriptor_field
            ));
            report.detail(format!("reports.extension={}", cfg.reports.extension));
            report.detail(format!("reports.key_suffix={}", cfg.reports.key_suffix));
        }
        Err(err) => report.issue(format!("{err:#}")),
    }

    for var in GENERATED_RECONCILE_ENV_ALLOWLIST {
        if env::var_os(var).is_some() {
            report.detail(format!("env.{var}=set"));
        }
    }

    Ok(report)
}
