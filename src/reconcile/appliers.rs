//! Field-scoped correction rules.
//!
//! Each applier mutates the record in place and reports whether anything
//! changed. Applying the same correction twice is always a no-op the
//! second time.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::error::ReconcileError;
use crate::reconcile::report::{RenamePair, is_truthy};

fn metadata_mut(record: &mut Value) -> Option<&mut Map<String, Value>> {
    let root = record.as_object_mut()?;
    root.entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()))
        .as_object_mut()
}

fn creators_mut(record: &mut Value) -> Option<&mut Vec<Value>> {
    record
        .get_mut("metadata")?
        .get_mut("creators")?
        .as_array_mut()
}

/// Overwrites `metadata.<field>` unless `correction` is empty or already
/// equal to the current value.
pub fn apply_metadata_text(record: &mut Value, field: &str, correction: &str) -> bool {
    if correction.is_empty() {
        return false;
    }
    let Some(metadata) = metadata_mut(record) else {
        return false;
    };
    if metadata.get(field).and_then(Value::as_str) == Some(correction) {
        return false;
    }
    metadata.insert(field.to_string(), Value::String(correction.to_string()));
    true
}

pub fn apply_title(record: &mut Value, correction: &str) -> bool {
    apply_metadata_text(record, "title", correction)
}

pub fn apply_abstract(record: &mut Value, correction: &str) -> bool {
    apply_metadata_text(record, "description", correction)
}

pub fn apply_publication_date(record: &mut Value, correction: &str) -> bool {
    apply_metadata_text(record, "publication_date", correction)
}

/// Rewrites every creator affiliation whose name matches a pair's old value.
/// Returns the number of affiliation entries rewritten.
pub fn apply_affiliations(record: &mut Value, corrections: &[RenamePair]) -> usize {
    if corrections.is_empty() {
        return 0;
    }
    let Some(creators) = creators_mut(record) else {
        return 0;
    };
    let mut applied = 0;
    for pair in corrections.iter().filter(|p| p.is_complete()) {
        for creator in creators.iter_mut() {
            let Some(affiliations) = creator
                .get_mut("affiliations")
                .and_then(Value::as_array_mut)
            else {
                continue;
            };
            for affiliation in affiliations.iter_mut().filter_map(Value::as_object_mut) {
                if affiliation.get("name").and_then(Value::as_str) == Some(pair.old.as_str()) {
                    affiliation.insert("name".to_string(), Value::String(pair.new.clone()));
                    applied += 1;
                }
            }
        }
    }
    applied
}

/// Renames organizational creators. Person creators are never touched.
pub fn apply_org_authors(record: &mut Value, corrections: &[RenamePair]) -> usize {
    if corrections.is_empty() {
        return 0;
    }
    let Some(creators) = creators_mut(record) else {
        return 0;
    };
    let mut applied = 0;
    for pair in corrections.iter().filter(|p| p.is_complete()) {
        for creator in creators.iter_mut() {
            let Some(identity) = creator
                .get_mut("person_or_org")
                .and_then(Value::as_object_mut)
            else {
                continue;
            };
            let is_org = identity.get("type").and_then(Value::as_str) == Some("organizational");
            if is_org && identity.get("name").and_then(Value::as_str) == Some(pair.old.as_str()) {
                identity.insert("name".to_string(), Value::String(pair.new.clone()));
                applied += 1;
            }
        }
    }
    applied
}

/// Stored shape of the descriptor field, kept so a rewrite serializes back
/// the way it was read.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptors {
    /// A single string split on `,` or `;`. Written back joined by `"; "`.
    DelimitedText(Vec<String>),
    List(Vec<Value>),
}

impl Descriptors {
    pub fn from_value(value: &Value) -> Result<Self, ReconcileError> {
        match value {
            Value::String(s) => Ok(Self::DelimitedText(
                s.split([',', ';'])
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(ToOwned::to_owned)
                    .collect(),
            )),
            Value::Array(items) => Ok(Self::List(items.clone())),
            Value::Null => Err(ReconcileError::UnrecognizedDescriptorShape("null")),
            Value::Bool(_) => Err(ReconcileError::UnrecognizedDescriptorShape("bool")),
            Value::Number(_) => Err(ReconcileError::UnrecognizedDescriptorShape("number")),
            Value::Object(_) => Err(ReconcileError::UnrecognizedDescriptorShape("object")),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::DelimitedText(items) => items.len(),
            Self::List(items) => items.len(),
        }
    }

    /// Drops entries matching any of `lowered` (already lowercased).
    pub fn remove_matching(&mut self, lowered: &HashSet<String>) {
        match self {
            Self::DelimitedText(items) => items.retain(|d| !lowered.contains(&d.to_lowercase())),
            Self::List(items) => items.retain(|d| {
                d.as_str()
                    .is_none_or(|text| !lowered.contains(&text.to_lowercase()))
            }),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::DelimitedText(items) => Value::String(items.join("; ")),
            Self::List(items) => Value::Array(items),
        }
    }
}

/// Removes descriptors matching `deletions` case-insensitively from
/// `custom_fields.<field>`. An absent or empty field is a no-op; a field of
/// an unknown shape is reported as an error for the caller to log.
pub fn delete_descriptors(
    record: &mut Value,
    field: &str,
    deletions: &[String],
) -> Result<bool, ReconcileError> {
    if deletions.is_empty() {
        return Ok(false);
    }
    let Some(custom_fields) = record
        .get_mut("custom_fields")
        .and_then(Value::as_object_mut)
    else {
        return Ok(false);
    };
    let Some(stored) = custom_fields.get(field) else {
        return Ok(false);
    };
    if !is_truthy(stored) {
        return Ok(false);
    }

    let mut descriptors = Descriptors::from_value(stored)?;
    let lowered: HashSet<String> = deletions
        .iter()
        .filter(|d| !d.is_empty())
        .map(|d| d.to_lowercase())
        .collect();
    let before = descriptors.len();
    descriptors.remove_matching(&lowered);
    if descriptors.len() == before {
        return Ok(false);
    }

    custom_fields.insert(field.to_string(), descriptors.into_value());
    Ok(true)
}

/// Appends related identifiers not already present, in input order.
/// Returns the number appended.
pub fn add_related_identifiers(record: &mut Value, identifiers: &[Map<String, Value>]) -> usize {
    if identifiers.is_empty() {
        return 0;
    }
    let Some(metadata) = metadata_mut(record) else {
        return 0;
    };

    let mut seen: HashSet<String> = metadata
        .get("related_identifiers")
        .and_then(Value::as_array)
        .map(|existing| {
            existing
                .iter()
                .filter_map(|ri| ri.get("identifier").and_then(Value::as_str))
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let mut additions = Vec::new();
    for identifier in identifiers {
        let Some(ident) = identifier.get("identifier").and_then(Value::as_str) else {
            continue;
        };
        if ident.is_empty() || !seen.insert(ident.to_string()) {
            continue;
        }
        additions.push(Value::Object(identifier.clone()));
    }
    if additions.is_empty() {
        return 0;
    }

    let added = additions.len();
    let slot = metadata
        .entry("related_identifiers")
        .or_insert_with(|| Value::Array(Vec::new()));
    match slot.as_array_mut() {
        Some(existing) => existing.extend(additions),
        None => *slot = Value::Array(additions),
    }
    added
}
