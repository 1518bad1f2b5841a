use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::ReconcileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuarantineConfig {
    pub out_of_scope_dir: String,
    pub duplicates_dir: String,
}

impl Default for QuarantineConfig {
    fn default() -> Self {
        Self {
            out_of_scope_dir: "Possible_Out_Of_Scope".to_string(),
            duplicates_dir: "Possible_Duplicates".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub file_name: String,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            file_name: "corrections-report.md".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordsConfig {
    pub extension: String,
    pub descriptor_field: String,
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            descriptor_field: "iaea:descriptors_cai_text".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportsConfig {
    pub extension: String,
    pub key_suffix: String,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            key_suffix: "-report".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReconcileConfig {
    pub quarantine: QuarantineConfig,
    pub audit: AuditConfig,
    pub records: RecordsConfig,
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialReconcileConfig {
    quarantine: Option<QuarantineConfig>,
    audit: Option<AuditConfig>,
    records: Option<RecordsConfig>,
    reports: Option<ReportsConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

pub fn validate(cfg: &ReconcileConfig) -> Result<(), ReconcileError> {
    for (label, name) in [
        ("quarantine.out_of_scope_dir", &cfg.quarantine.out_of_scope_dir),
        ("quarantine.duplicates_dir", &cfg.quarantine.duplicates_dir),
    ] {
        if !is_single_component(name) {
            return Err(ReconcileError::InvalidConfig(format!(
                "{label} must be a single folder name, got `{name}`"
            )));
        }
    }
    if cfg.quarantine.out_of_scope_dir == cfg.quarantine.duplicates_dir {
        return Err(ReconcileError::InvalidConfig(
            "out-of-scope and duplicates folders must differ".to_string(),
        ));
    }
    if cfg.audit.file_name.trim().is_empty() {
        return Err(ReconcileError::InvalidConfig(
            "audit.file_name cannot be empty".to_string(),
        ));
    }
    if cfg.records.descriptor_field.trim().is_empty() {
        return Err(ReconcileError::InvalidConfig(
            "records.descriptor_field cannot be empty".to_string(),
        ));
    }
    if cfg.records.extension.trim().is_empty() || cfg.reports.extension.trim().is_empty() {
        return Err(ReconcileError::InvalidConfig(
            "record and report extensions cannot be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("QA_RECONCILE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".qa-reconcile").join("config.toml"))
}

fn merge_toml(base: &mut ReconcileConfig, raw: &str, origin: &Path) -> Result<(), ReconcileError> {
    let parsed: PartialReconcileConfig = toml::from_str(raw).map_err(|err| {
        ReconcileError::InvalidConfig(format!("failed to parse {}: {err}", origin.display()))
    })?;
    if let Some(quarantine) = parsed.quarantine {
        base.quarantine = quarantine;
    }
    if let Some(audit) = parsed.audit {
        base.audit = audit;
    }
    if let Some(records) = parsed.records {
        base.records = records;
    }
    if let Some(reports) = parsed.reports {
        base.reports = reports;
    }
    Ok(())
}

fn merge_file_config(base: &mut ReconcileConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path).map_err(|err| {
        ReconcileError::InvalidConfig(format!("failed to read {}: {err}", path.display()))
    })?;
    merge_toml(base, &raw, &path)?;
    Ok(())
}

fn merge_env(cfg: &mut ReconcileConfig) {
    cfg.quarantine.out_of_scope_dir = env_or_string(
        "QA_RECONCILE_OUT_OF_SCOPE_DIR",
        &cfg.quarantine.out_of_scope_dir,
    );
    cfg.quarantine.duplicates_dir =
        env_or_string("QA_RECONCILE_DUPLICATES_DIR", &cfg.quarantine.duplicates_dir);
    cfg.audit.file_name = env_or_string("QA_RECONCILE_AUDIT_FILE", &cfg.audit.file_name);
    cfg.records.descriptor_field = env_or_string(
        "QA_RECONCILE_DESCRIPTOR_FIELD",
        &cfg.records.descriptor_field,
    );
    cfg.reports.key_suffix = env_or_string("QA_RECONCILE_REPORT_SUFFIX", &cfg.reports.key_suffix);
}

/// Defaults, then the TOML file, then environment overrides. CLI flags are
/// applied by the caller, which validates again afterwards.
pub fn load_config() -> Result<ReconcileConfig> {
    let mut cfg = ReconcileConfig::default();
    merge_file_config(&mut cfg)?;
    merge_env(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}
