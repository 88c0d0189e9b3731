//! Pseudo-binary alloy records: exact-composition lookup and bowing fits.
//!
//! Records are keyed by an unordered pair of end-member labels. Callers give
//! compositions in their own label order and every lookup re-orders the
//! fractions to whichever column order the stored record uses.

mod bowing;
mod lattice;

pub use bowing::{
    BowingError, BowingFit, BowingSample, MIN_BOWING_SAMPLES, bowing_model,
    fit_bowing_parameter,
};
pub use lattice::parse_lattice_matrix;

use crate::catalog::Catalog;
use crate::common::config::DEFAULT_COMPOSITION_TOLERANCE;
use crate::domain::{AlloyKey, BinaryPair, Dataset, DbError, DbResult, Orientation};
use crate::store::{LoadReport, Table, TableError, load_location};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::{debug, warn};

const COMPOSITION_PREFIX: &str = "x_";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlloyRecord {
    /// Pair label as written in the `binary` column.
    pub binary: BinaryPair,
    pub structure: String,
    pub functional: String,
    /// Component labels taken from the `x_<label>` column names.
    pub components: [String; 2],
    /// Fractions in `components` order.
    pub fractions: [f64; 2],
    pub formula: String,
    pub lattice_matrix: String,
    pub volume: f64,
    /// `None` when the cell is blank.
    pub num_atoms: Option<u32>,
    pub total_energy: f64,
    pub bandgap_gamma: f64,
    pub hmix_mev_per_formula: f64,
}

impl AlloyRecord {
    pub fn key(&self) -> AlloyKey {
        AlloyKey::new(
            self.binary.clone(),
            self.structure.clone(),
            self.functional.clone(),
        )
    }

    /// Orientation of the stored fraction columns relative to `pair`.
    ///
    /// Column labels win when they name the pair's components; otherwise the
    /// columns follow the record's own `binary` label order.
    pub fn orientation(&self, pair: &BinaryPair) -> Option<Orientation> {
        if !self.binary.same_system(pair) {
            return None;
        }
        pair.orientation_of([self.components[0].as_str(), self.components[1].as_str()])
            .or_else(|| pair.orientation_of([self.binary.first(), self.binary.second()]))
    }

    /// Fractions re-ordered to `pair`'s label order.
    pub fn fractions_for(&self, pair: &BinaryPair) -> Option<[f64; 2]> {
        self.orientation(pair)
            .map(|orientation| orientation.apply(self.fractions))
    }

    pub fn scalar(&self, property: AlloyProperty) -> Option<f64> {
        match property {
            AlloyProperty::BandGap => Some(self.bandgap_gamma),
            AlloyProperty::MixingEnthalpy => Some(self.hmix_mev_per_formula),
            AlloyProperty::Volume => Some(self.volume),
            AlloyProperty::Lattice => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlloyProperty {
    BandGap,
    MixingEnthalpy,
    Volume,
    Lattice,
}

impl AlloyProperty {
    pub fn parse(tag: &str) -> DbResult<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "GAP" | "BANDGAP" => Ok(Self::BandGap),
            "H_MIX" | "HMIX" => Ok(Self::MixingEnthalpy),
            "VOLUME" | "VOL" => Ok(Self::Volume),
            "LATTICE" | "LAT" => Ok(Self::Lattice),
            _ => Err(DbError::invalid_query(format!(
                "invalid property '{}'; use one of: GAP, LATTICE, H_MIX, VOLUME",
                tag
            ))),
        }
    }

    pub const fn column(self) -> &'static str {
        match self {
            Self::BandGap => "bandgap_Gamma(eV)",
            Self::MixingEnthalpy => "hmix_meV_per_formula",
            Self::Volume => "volume(Ang^3)",
            Self::Lattice => "lattice_matrix",
        }
    }
}

impl Display for AlloyProperty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).column())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AlloyValue {
    Scalar(f64),
    Lattice(Vec<Vec<f64>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BowingReport {
    pub pair: BinaryPair,
    pub outcome: DbResult<BowingFit>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlloyDb {
    records: Vec<AlloyRecord>,
    catalog: Catalog,
    tolerance: f64,
    report: LoadReport,
}

impl Default for AlloyDb {
    fn default() -> Self {
        Self::from_records(Vec::new(), DEFAULT_COMPOSITION_TOLERANCE)
    }
}

impl AlloyDb {
    pub fn load(location: impl AsRef<Path>, tolerance: f64) -> DbResult<Self> {
        let loaded = load_location(location.as_ref(), Dataset::Alloy, decode_alloy_table)?;
        let mut db = Self::from_records(loaded.rows, tolerance);
        db.report = loaded.report;
        Ok(db)
    }

    pub fn from_records(records: Vec<AlloyRecord>, tolerance: f64) -> Self {
        let mut catalog = Catalog::default();
        for record in &records {
            catalog.insert(
                &record.binary.canonical(),
                &record.structure,
                &record.functional,
            );
        }
        Self {
            records,
            catalog,
            tolerance,
            report: LoadReport::default(),
        }
    }

    pub fn records(&self) -> &[AlloyRecord] {
        &self.records
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    /// Canonical (sorted) pair labels.
    pub fn binaries(&self) -> Vec<String> {
        self.catalog.systems()
    }

    pub fn structures(&self, pair: &BinaryPair) -> Vec<String> {
        self.catalog.structures(&pair.canonical())
    }

    pub fn functionals(&self, pair: &BinaryPair, structure: &str) -> Vec<String> {
        self.catalog.functionals(&pair.canonical(), structure)
    }

    /// Stored compositions in `pair` order, rounded to three decimals.
    pub fn compositions(&self, pair: &BinaryPair, structure: &str, functional: &str) -> Vec<[f64; 2]> {
        let key = AlloyKey::new(pair.clone(), structure, functional);
        self.aligned(&key)
            .map(|(_, fractions)| fractions.map(|fraction| (fraction * 1000.0).round() / 1000.0))
            .collect()
    }

    /// The full record at an exact composition.
    pub fn record(
        &self,
        pair: &BinaryPair,
        structure: &str,
        functional: &str,
        composition: [f64; 2],
    ) -> DbResult<AlloyRecord> {
        if composition.iter().any(|fraction| !fraction.is_finite()) {
            return Err(DbError::invalid_query(format!(
                "composition [{}, {}] must be numeric",
                composition[0], composition[1]
            )));
        }

        let key = AlloyKey::new(pair.clone(), structure, functional);
        debug!(%key, x_first = composition[0], x_second = composition[1], "alloy lookup");

        let mut candidates = self.aligned(&key).peekable();
        if candidates.peek().is_none() {
            return Err(DbError::NoData {
                dataset: Dataset::Alloy,
                key: key.to_string(),
            });
        }

        candidates
            .find(|(_, fractions)| {
                within_tolerance(fractions[0], composition[0], self.tolerance)
                    && within_tolerance(fractions[1], composition[1], self.tolerance)
            })
            .map(|(record, _)| record.clone())
            .ok_or_else(|| DbError::NoMatch {
                key: key.clone(),
                composition,
            })
    }

    pub fn lookup(
        &self,
        pair: &BinaryPair,
        structure: &str,
        functional: &str,
        composition: [f64; 2],
        property: AlloyProperty,
    ) -> DbResult<AlloyValue> {
        let record = self.record(pair, structure, functional, composition)?;
        if let Some(value) = record.scalar(property) {
            return Ok(AlloyValue::Scalar(value));
        }

        parse_lattice_matrix(&record.lattice_matrix)
            .map(AlloyValue::Lattice)
            .ok_or_else(|| DbError::LatticeParse {
                key: AlloyKey::new(pair.clone(), structure, functional),
                raw: record.lattice_matrix.clone(),
            })
    }

    /// Scalar samples sorted by the fraction of `pair`'s second component.
    /// Records with a missing (non-finite) value are left out.
    pub fn series(
        &self,
        pair: &BinaryPair,
        structure: &str,
        functional: &str,
        property: AlloyProperty,
    ) -> DbResult<Vec<BowingSample>> {
        if property == AlloyProperty::Lattice {
            return Err(DbError::invalid_query(
                "lattice matrices do not form a scalar composition series",
            ));
        }

        let key = AlloyKey::new(pair.clone(), structure, functional);
        let mut samples: Vec<BowingSample> = self
            .aligned(&key)
            .filter_map(|(record, fractions)| {
                record
                    .scalar(property)
                    .filter(|value| value.is_finite())
                    .map(|value| BowingSample {
                        x: fractions[1],
                        value,
                    })
            })
            .collect();
        if samples.is_empty() {
            return Err(DbError::NoData {
                dataset: Dataset::Alloy,
                key: key.to_string(),
            });
        }

        samples.sort_by(|left, right| left.x.total_cmp(&right.x));
        Ok(samples)
    }

    pub fn fit_bowing(
        &self,
        pair: &BinaryPair,
        structure: &str,
        functional: &str,
        property: AlloyProperty,
    ) -> DbResult<BowingFit> {
        let samples = self.series(pair, structure, functional, property)?;
        let key = AlloyKey::new(pair.clone(), structure, functional);

        fit_bowing_parameter(&samples).map_err(|error| match error {
            BowingError::InsufficientSamples { found, required } => DbError::InsufficientSamples {
                key,
                found,
                required,
            },
            BowingError::Fit(source) => DbError::FitConvergence { key, source },
        })
    }

    /// Fits every binary present for `structure`/`functional`; one report per
    /// system, failures included.
    pub fn fit_bowing_all(
        &self,
        structure: &str,
        functional: &str,
        property: AlloyProperty,
    ) -> Vec<BowingReport> {
        let mut reports = Vec::new();
        for label in self.catalog.systems() {
            if !self.catalog.contains(&label, structure, functional) {
                continue;
            }
            let pair = match BinaryPair::parse(&label) {
                Ok(pair) => pair,
                Err(error) => {
                    warn!(binary = %label, %error, "skipping unparsable binary label");
                    continue;
                }
            };

            let outcome = self.fit_bowing(&pair, structure, functional, property);
            if let Err(error) = &outcome {
                warn!(%error, "bowing fit not available");
            }
            reports.push(BowingReport { pair, outcome });
        }
        reports
    }

    fn aligned<'a>(
        &'a self,
        key: &'a AlloyKey,
    ) -> impl Iterator<Item = (&'a AlloyRecord, [f64; 2])> + 'a {
        self.records
            .iter()
            .filter(move |record| {
                record.structure == key.structure && record.functional == key.functional
            })
            .filter_map(move |record| {
                record
                    .fractions_for(&key.pair)
                    .map(|fractions| (record, fractions))
            })
    }
}

/// |stored − target| ≤ tolerance, with a few ulps of slack so a target
/// written exactly one tolerance away still matches.
fn within_tolerance(stored: f64, target: f64, tolerance: f64) -> bool {
    let slack = 4.0 * f64::EPSILON * stored.abs().max(target.abs());
    (stored - target).abs() <= tolerance + slack
}

fn decode_alloy_table(table: &Table) -> Result<Vec<AlloyRecord>, TableError> {
    let binary = table.column(&["binary"])?;
    let structure = table.column(&["structure"])?;
    let functional = table.column(&["functional"])?;
    let formula = table.column(&["formula"])?;
    let lattice = table.column(&["lattice_matrix"])?;
    let volume = table.column(&["volume(Ang^3)", "volume"])?;
    let num_atoms = table.column(&["num_atoms"])?;
    let total_energy = table.column(&["total_energy(eV)", "total_energy"])?;
    let bandgap = table.column(&["bandgap_Gamma(eV)", "bandgap_Gamma"])?;
    let hmix = table.column(&["hmix_meV_per_formula"])?;

    let composition = table.columns_with_prefix(COMPOSITION_PREFIX);
    let [first, second] = composition.as_slice() else {
        return Err(TableError::CompositionColumns {
            found: composition.len(),
        });
    };
    let components = [first, second].map(|column| {
        column
            .name
            .strip_prefix(COMPOSITION_PREFIX)
            .unwrap_or(column.name.as_str())
            .to_string()
    });

    table
        .rows()
        .iter()
        .map(|row| {
            Ok(AlloyRecord {
                binary: BinaryPair::parse(row.text(&binary))
                    .map_err(|_| row.invalid_label(&binary))?,
                structure: row.text(&structure).to_string(),
                functional: row.text(&functional).to_string(),
                components: components.clone(),
                fractions: [row.float(first)?, row.float(second)?],
                formula: row.text(&formula).to_string(),
                lattice_matrix: row.text(&lattice).to_string(),
                volume: row.float(&volume)?,
                num_atoms: row.optional_unsigned(&num_atoms)?,
                total_energy: row.float(&total_energy)?,
                bandgap_gamma: row.float(&bandgap)?,
                hmix_mev_per_formula: row.float(&hmix)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{AlloyDb, AlloyProperty, AlloyRecord, AlloyValue, within_tolerance};
    use crate::domain::{BinaryPair, DbError};

    fn record(binary: &str, components: [&str; 2], fractions: [f64; 2], gap: f64) -> AlloyRecord {
        AlloyRecord {
            binary: BinaryPair::parse(binary).expect("pair should parse"),
            structure: "zb".to_string(),
            functional: "PBE".to_string(),
            components: components.map(str::to_string),
            fractions,
            formula: format!("x={}", fractions[1]),
            lattice_matrix: "[[6.0, 0, 0], [0, 6.0, 0], [0, 0, 6.0]]".to_string(),
            volume: 200.0 + fractions[1],
            num_atoms: Some(8),
            total_energy: -30.0,
            bandgap_gamma: gap,
            hmix_mev_per_formula: 10.0 * fractions[0] * fractions[1],
        }
    }

    fn pair(label: &str) -> BinaryPair {
        BinaryPair::parse(label).expect("pair should parse")
    }

    fn gaas_inas() -> AlloyDb {
        AlloyDb::from_records(
            vec![
                record("GaAs InAs", ["GaAs", "InAs"], [1.0, 0.0], 1.42),
                record("GaAs InAs", ["GaAs", "InAs"], [0.75, 0.25], 1.05),
                record("GaAs InAs", ["GaAs", "InAs"], [0.25, 0.75], 0.55),
                record("GaAs InAs", ["GaAs", "InAs"], [0.0, 1.0], 0.35),
                record("GaAs InAs", ["GaAs", "InAs"], [0.5, 0.5], 0.78),
            ],
            1.0e-6,
        )
    }

    #[test]
    fn lookup_is_order_invariant() {
        let db = gaas_inas();
        let forward = db
            .record(&pair("GaAs InAs"), "zb", "PBE", [0.25, 0.75])
            .expect("forward lookup should match");
        let backward = db
            .record(&pair("InAs GaAs"), "zb", "PBE", [0.75, 0.25])
            .expect("backward lookup should match");

        assert_eq!(forward, backward);
        assert_eq!(forward.bandgap_gamma, 0.55);
        assert_eq!(
            db.lookup(&pair("InAs GaAs"), "zb", "PBE", [0.75, 0.25], AlloyProperty::BandGap),
            Ok(AlloyValue::Scalar(0.55))
        );
    }

    #[test]
    fn tolerance_is_inclusive_and_exact_match_only() {
        let tolerance = 2.0_f64.powi(-20);
        let db = AlloyDb::from_records(
            vec![record("GaAs InAs", ["GaAs", "InAs"], [0.25, 0.75], 0.55)],
            tolerance,
        );
        let gaas_inas = pair("GaAs InAs");

        assert!(
            db.record(&gaas_inas, "zb", "PBE", [0.25 + tolerance, 0.75 - tolerance])
                .is_ok()
        );
        assert!(matches!(
            db.record(&gaas_inas, "zb", "PBE", [0.25 + 2.0 * tolerance, 0.75]),
            Err(DbError::NoMatch { .. })
        ));
        assert!(within_tolerance(0.25, 0.25 + 1.0e-6, 1.0e-6));
        assert!(!within_tolerance(0.25, 0.25 + 1.1e-6, 1.0e-6));
    }

    #[test]
    fn missing_system_and_missing_composition_are_distinct() {
        let db = gaas_inas();
        assert!(matches!(
            db.record(&pair("AlAs GaAs"), "zb", "PBE", [0.5, 0.5]),
            Err(DbError::NoData { .. })
        ));
        assert!(matches!(
            db.record(&pair("GaAs InAs"), "zb", "PBE", [0.4, 0.6]),
            Err(DbError::NoMatch { .. })
        ));
        assert!(matches!(
            db.record(&pair("GaAs InAs"), "zb", "PBE", [f64::NAN, 0.6]),
            Err(DbError::InvalidQuery(_))
        ));
    }

    #[test]
    fn column_labels_that_differ_from_binary_follow_binary_order() {
        let db = AlloyDb::from_records(
            vec![record("InAs GaAs", ["In", "Ga"], [0.25, 0.75], 0.9)],
            1.0e-6,
        );
        let matched = db
            .record(&pair("GaAs InAs"), "zb", "PBE", [0.75, 0.25])
            .expect("binary order should align fractions");
        assert_eq!(matched.bandgap_gamma, 0.9);
    }

    #[test]
    fn lattice_property_is_parsed_into_rows() {
        let db = gaas_inas();
        let value = db
            .lookup(&pair("GaAs InAs"), "zb", "PBE", [0.5, 0.5], AlloyProperty::Lattice)
            .expect("lattice should parse");
        assert_eq!(
            value,
            AlloyValue::Lattice(vec![
                vec![6.0, 0.0, 0.0],
                vec![0.0, 6.0, 0.0],
                vec![0.0, 0.0, 6.0],
            ])
        );
    }

    #[test]
    fn series_sorts_by_second_component_in_caller_order() {
        let db = gaas_inas();
        let forward = db
            .series(&pair("GaAs InAs"), "zb", "PBE", AlloyProperty::BandGap)
            .expect("series should exist");
        let xs: Vec<f64> = forward.iter().map(|sample| sample.x).collect();
        assert_eq!(xs, [0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(forward[0].value, 1.42);

        let backward = db
            .series(&pair("InAs GaAs"), "zb", "PBE", AlloyProperty::BandGap)
            .expect("series should exist");
        assert_eq!(backward[0].value, 0.35);
    }

    #[test]
    fn compositions_are_rounded_in_caller_order() {
        let db = AlloyDb::from_records(
            vec![record("GaAs InAs", ["GaAs", "InAs"], [0.66666666, 0.33333334], 1.0)],
            1.0e-6,
        );
        assert_eq!(
            db.compositions(&pair("InAs GaAs"), "zb", "PBE"),
            vec![[0.333, 0.667]]
        );
        assert_eq!(db.binaries(), ["GaAs InAs"]);
        assert_eq!(db.structures(&pair("InAs GaAs")), ["zb"]);
    }

    #[test]
    fn batch_fit_reports_each_system() {
        let mut records = gaas_inas().records().to_vec();
        records.push(record("AlAs GaAs", ["AlAs", "GaAs"], [1.0, 0.0], 2.2));
        records.push(record("AlAs GaAs", ["AlAs", "GaAs"], [0.0, 1.0], 1.42));
        let db = AlloyDb::from_records(records, 1.0e-6);

        let reports = db.fit_bowing_all("zb", "PBE", AlloyProperty::BandGap);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].pair, pair("AlAs GaAs"));
        assert!(matches!(
            reports[0].outcome,
            Err(DbError::InsufficientSamples {
                found: 2,
                required: 3,
                ..
            })
        ));
        let fit = reports[1].outcome.as_ref().expect("GaAs InAs should fit");
        assert!(fit.bowing > 0.0);
    }
}
