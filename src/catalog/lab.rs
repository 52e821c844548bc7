//! Default laboratory tables of the workbench
//!
//! A small fixed catalog used by tests, benchmarks and embedders that want
//! the stock tables before any dataset is saved.

use super::Catalog;
use crate::error::CatalogError;
use crate::types::{Row, Value};

const SAMPLE_TYPES: [&str; 4] = ["blood", "serum", "urine", "plasma"];
const TEST_CODES: [(&str, &str, &str); 4] = [
    ("GLU", "Glucose", "mg/dL"),
    ("HGB", "Hemoglobin", "g/dL"),
    ("NA", "Sodium", "mmol/L"),
    ("K", "Potassium", "mmol/L"),
];
const INSTRUMENTS: [(&str, &str); 3] = [
    ("Cobas c311", "chemistry"),
    ("Sysmex XN", "hematology"),
    ("Architect i2000", "immunoassay"),
];

/// Register `samples`, `tests`, `results` and `instruments` with `sample_count` samples
pub fn install(catalog: &Catalog, sample_count: usize) -> Result<(), CatalogError> {
    catalog.register(
        "instruments",
        columns(&["id", "name", "department"]),
        INSTRUMENTS
            .iter()
            .enumerate()
            .map(|(i, (name, dept))| vec![Value::Integer(i as i64 + 1), Value::from(*name), Value::from(*dept)])
            .collect(),
        Some("Analyzers attached to the laboratory".into()),
    )?;

    catalog.register(
        "tests",
        columns(&["code", "name", "unit", "instrument_id"]),
        TEST_CODES
            .iter()
            .enumerate()
            .map(|(i, (code, name, unit))| {
                vec![
                    Value::from(*code),
                    Value::from(*name),
                    Value::from(*unit),
                    Value::Integer((i % INSTRUMENTS.len()) as i64 + 1),
                ]
            })
            .collect(),
        Some("Orderable test catalog".into()),
    )?;

    let samples: Vec<Row> = (0..sample_count)
        .map(|i| {
            let day = i % 28 + 1;
            let month = i / 28 % 12 + 1;
            vec![
                Value::Integer(i as i64 + 1),
                Value::from(SAMPLE_TYPES[i % SAMPLE_TYPES.len()]),
                Value::Date(format!("2024-{:02}-{:02}", month, day)),
                if i % 7 == 3 { Value::Null } else { Value::from(format!("P{:04}", i % 97)) },
            ]
        })
        .collect();
    catalog.register(
        "samples",
        columns(&["id", "sample_type", "collected_on", "patient"]),
        samples,
        Some("Specimens received by the laboratory".into()),
    )?;

    let results: Vec<Row> = (0..sample_count * 2)
        .map(|i| {
            let (code, _, _) = TEST_CODES[i % TEST_CODES.len()];
            let value = if i % 11 == 5 {
                Value::Null
            } else {
                Value::Float(((i * 37) % 200) as f64 / 4.0 + 1.0)
            };
            vec![
                Value::Integer(i as i64 + 1),
                Value::Integer((i / 2) as i64 + 1),
                Value::from(code),
                value,
            ]
        })
        .collect();
    catalog.register(
        "results",
        columns(&["id", "sample_id", "test_code", "value"]),
        results,
        Some("Measured results per sample and test".into()),
    )?;

    Ok(())
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableSource;
    use crate::types::ColumnKind;

    #[test]
    fn test_install_lab_catalog() {
        let catalog = Catalog::new();
        install(&catalog, 50).unwrap();

        let names: Vec<String> = catalog.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["instruments", "tests", "samples", "results"]);

        let samples = catalog.lookup("samples").unwrap();
        assert_eq!(samples.rows().len(), 50);
        assert_eq!(samples.columns()[2].kind, ColumnKind::Date);
        assert_eq!(catalog.lookup("results").unwrap().rows().len(), 100);
    }
}
