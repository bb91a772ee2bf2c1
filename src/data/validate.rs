use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::registry::{normalize_lookup, DataError};
use crate::data::ship::ShipStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

impl ValidationSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationDiagnostic {
    pub severity: ValidationSeverity,
    pub context: String,
    pub message: String,
}

impl fmt::Display for ValidationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.context, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub rows_checked: usize,
    pub diagnostics: Vec<ValidationDiagnostic>,
}

impl ValidationReport {
    pub fn push(
        &mut self,
        severity: ValidationSeverity,
        context: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(ValidationDiagnostic {
            severity,
            context: context.into(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diag| diag.severity == ValidationSeverity::Error)
    }

    pub fn count(&self, severity: ValidationSeverity) -> usize {
        self.diagnostics
            .iter()
            .filter(|diag| diag.severity == severity)
            .count()
    }
}

/// Check a ship table and collect every problem instead of stopping at the first.
/// Only an unreadable file is returned as `Err`.
pub fn validate_stats_table(path: impl AsRef<Path>) -> Result<ValidationReport, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(validate_stats_reader(file))
}

pub fn validate_stats_reader<R: Read>(source: R) -> ValidationReport {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(source);
    let mut report = ValidationReport::default();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for (index, row) in reader.deserialize::<ShipStats>().enumerate() {
        let row_number = index + 2;
        let context = format!("row {row_number}");
        report.rows_checked += 1;

        let stats = match row {
            Ok(stats) => stats,
            Err(err) => {
                report.push(ValidationSeverity::Error, context, err.to_string());
                continue;
            }
        };

        let key = normalize_lookup(&stats.name);
        if key.is_empty() {
            report.push(ValidationSeverity::Error, context, "ship name is empty");
            continue;
        }
        let context = format!("{context} ({})", stats.name);

        for (field, value) in stats.numeric_fields() {
            if !value.is_finite() || value < 0.0 {
                report.push(
                    ValidationSeverity::Error,
                    context.clone(),
                    format!("{field} must be a finite number >= 0, got {value}"),
                );
            }
        }

        match first_seen.get(&key) {
            Some(first_row) => report.push(
                ValidationSeverity::Error,
                context.clone(),
                format!("duplicate of row {first_row}"),
            ),
            None => {
                first_seen.insert(key, row_number);
            }
        }

        if stats.hit_points == 0.0 {
            report.push(
                ValidationSeverity::Warning,
                context.clone(),
                "hit_points is 0; units of this class start sunk",
            );
        }
        if stats.attack == 0.0 {
            report.push(
                ValidationSeverity::Warning,
                context,
                "attack is 0; units of this class never deal damage",
            );
        }
    }

    report
}
