use crate::reconcile::report::{DuplicateReason, QaReport};

/// Where a record belongs after this run. Derived from the report every
/// time; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Normal,
    OutOfScope,
    Duplicate(DuplicateReason),
}

/// Out-of-scope takes precedence over duplicate.
pub fn resolve(report: &QaReport) -> Disposition {
    if report.out_of_scope() {
        return Disposition::OutOfScope;
    }
    match report.duplicate_reason() {
        Some(reason) => Disposition::Duplicate(reason),
        None => Disposition::Normal,
    }
}
