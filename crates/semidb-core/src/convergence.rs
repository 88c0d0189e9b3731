use crate::catalog::Catalog;
use crate::codec::decode_parameter;
use crate::domain::{Dataset, DbError, DbResult, SystemKey, TestType};
use crate::store::{LoadReport, Table, TableError, load_location};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceRecord {
    pub key: SystemKey,
    pub test_type: TestType,
    pub parameter: String,
    pub energy_total: f64,
    pub energy_per_atom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyMode {
    PerAtom,
    Total,
}

impl EnergyMode {
    pub const fn from_per_atom(per_atom: bool) -> Self {
        if per_atom { Self::PerAtom } else { Self::Total }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PerAtom => "Energy (eV/atom)",
            Self::Total => "Energy (eV)",
        }
    }

    fn select(self, record: &ConvergenceRecord) -> f64 {
        match self {
            Self::PerAtom => record.energy_per_atom,
            Self::Total => record.energy_total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergencePoint {
    pub parameter: String,
    pub axis: f64,
    pub energy: f64,
}

/// Energies ordered by the decoded convergence axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvergenceSeries {
    pub key: SystemKey,
    pub test_type: TestType,
    pub energy_mode: EnergyMode,
    pub axis_label: &'static str,
    pub energy_label: &'static str,
    pub points: Vec<ConvergencePoint>,
    /// Rows whose tag did not decode for this test type.
    pub dropped: usize,
}

impl ConvergenceSeries {
    pub fn axes(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.axis).collect()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.energy).collect()
    }
}

/// Both convergence axes for one key; a missing axis does not hide the other.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceOverview {
    pub kpt: DbResult<ConvergenceSeries>,
    pub encut: DbResult<ConvergenceSeries>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConvergenceDb {
    records: Vec<ConvergenceRecord>,
    catalog: Catalog,
    report: LoadReport,
}

impl ConvergenceDb {
    pub fn load(location: impl AsRef<Path>) -> DbResult<Self> {
        let loaded = load_location(
            location.as_ref(),
            Dataset::Convergence,
            decode_convergence_table,
        )?;
        let mut db = Self::from_records(loaded.rows);
        db.report = loaded.report;
        Ok(db)
    }

    pub fn from_records(records: Vec<ConvergenceRecord>) -> Self {
        let catalog = Catalog::from_entries(records.iter().map(|record| {
            (
                record.key.material.as_str(),
                record.key.structure.as_str(),
                record.key.functional.as_str(),
            )
        }));
        Self {
            records,
            catalog,
            report: LoadReport::default(),
        }
    }

    pub fn records(&self) -> &[ConvergenceRecord] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn materials(&self) -> Vec<String> {
        self.catalog.systems()
    }

    pub fn structures(&self, material: &str) -> Vec<String> {
        self.catalog.structures(material)
    }

    pub fn functionals(&self, material: &str, structure: &str) -> Vec<String> {
        self.catalog.functionals(material, structure)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn query(
        &self,
        material: &str,
        structure: &str,
        functional: &str,
        test_type: TestType,
        per_atom: bool,
    ) -> DbResult<ConvergenceSeries> {
        let key = SystemKey::new(material, structure, functional);
        debug!(%key, %test_type, per_atom, "convergence query");

        let matching: Vec<&ConvergenceRecord> = self
            .records
            .iter()
            .filter(|record| record.key == key && record.test_type == test_type)
            .collect();
        if matching.is_empty() {
            return Err(DbError::NoConvergenceData { key, test_type });
        }

        let energy_mode = EnergyMode::from_per_atom(per_atom);
        let mut points: Vec<ConvergencePoint> = matching
            .iter()
            .filter_map(|record| {
                decode_parameter(test_type, &record.parameter).map(|axis| ConvergencePoint {
                    parameter: record.parameter.clone(),
                    axis,
                    energy: energy_mode.select(record),
                })
            })
            .collect();

        let dropped = matching.len() - points.len();
        if dropped > 0 {
            debug!(%key, %test_type, dropped, "dropped rows with undecodable tags");
        }
        if points.is_empty() {
            return Err(DbError::NoConvergenceData { key, test_type });
        }

        // Stable: equal axes keep table order.
        points.sort_by(|left, right| left.axis.total_cmp(&right.axis));

        Ok(ConvergenceSeries {
            key,
            test_type,
            energy_mode,
            axis_label: test_type.axis_label(),
            energy_label: energy_mode.label(),
            points,
            dropped,
        })
    }

    pub fn overview(
        &self,
        material: &str,
        structure: &str,
        functional: &str,
        per_atom: bool,
    ) -> ConvergenceOverview {
        ConvergenceOverview {
            kpt: self.query(material, structure, functional, TestType::Kpt, per_atom),
            encut: self.query(material, structure, functional, TestType::Encut, per_atom),
        }
    }
}

fn decode_convergence_table(table: &Table) -> Result<Vec<ConvergenceRecord>, TableError> {
    let material = table.column(&["material"])?;
    let structure = table.column(&["structure"])?;
    let functional = table.column(&["functional"])?;
    let test_type = table.column(&["test_type"])?;
    let parameter = table.column(&["parameter"])?;
    let energy_total = table.column(&["energy_total"])?;
    let energy_per_atom = table.column(&["energy_per_atom"])?;

    let mut records = Vec::with_capacity(table.len());
    let mut unknown_types = 0;
    for row in table.rows() {
        let Some(kind) = TestType::from_token(row.text(&test_type)) else {
            unknown_types += 1;
            continue;
        };
        records.push(ConvergenceRecord {
            key: SystemKey::new(
                row.text(&material),
                row.text(&structure),
                row.text(&functional),
            ),
            test_type: kind,
            parameter: row.text(&parameter).to_string(),
            energy_total: row.float(&energy_total)?,
            energy_per_atom: row.float(&energy_per_atom)?,
        });
    }

    if unknown_types > 0 {
        warn!(
            rows = unknown_types,
            "ignored convergence rows with a test_type other than kpt/encut"
        );
    }
    Ok(records)
}
