//! Energy–volume samples and their stored Vinet fits.

mod vinet;

pub use vinet::{CurvePoint, VinetCoefficients, linspace, vinet_curve, vinet_energy};

use crate::catalog::Catalog;
use crate::domain::{Dataset, DbError, DbResult, SystemKey};
use crate::store::{Column, LoadReport, Table, TableError, TableRow, load_location};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvPoint {
    pub key: SystemKey,
    /// Å³
    pub volume: f64,
    /// eV
    pub energy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VinetFit {
    pub key: SystemKey,
    pub e0: f64,
    pub v0: f64,
    /// GPa
    pub b: f64,
    pub bp: f64,
    /// eV/Å³
    pub bbar: f64,
    pub c: f64,
}

impl VinetFit {
    pub fn coefficients(&self) -> VinetCoefficients {
        VinetCoefficients {
            e0: self.e0,
            v0: self.v0,
            bbar: self.bbar,
            c: self.c,
        }
    }

    pub fn quantity(&self, quantity: EosQuantity) -> f64 {
        match quantity {
            EosQuantity::E => self.e0,
            EosQuantity::V => self.v0,
            EosQuantity::B => self.b,
            EosQuantity::Bp => self.bp,
            EosQuantity::Bbar => self.bbar,
            EosQuantity::C => self.c,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EosQuantity {
    E,
    V,
    B,
    Bp,
    Bbar,
    C,
}

impl EosQuantity {
    pub fn parse(token: &str) -> DbResult<Self> {
        match token.trim().to_ascii_uppercase().as_str() {
            "E" => Ok(Self::E),
            "V" => Ok(Self::V),
            "B" => Ok(Self::B),
            "BP" => Ok(Self::Bp),
            "BBAR" => Ok(Self::Bbar),
            "C" => Ok(Self::C),
            "E-V" | "EV" | "E_V" => Err(DbError::invalid_query(
                "E-V is a point series, not a fitted quantity; query the points instead",
            )),
            _ => Err(DbError::invalid_query(format!(
                "unknown quantity '{}'; use one of: E, V, B, Bp, Bbar, C",
                token
            ))),
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::E => "eV",
            Self::V => "Ang^3",
            Self::B => "GPa",
            Self::Bp | Self::C => "",
            Self::Bbar => "eV/Ang^3",
        }
    }
}

impl Display for EosQuantity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::E => "E",
            Self::V => "V",
            Self::B => "B",
            Self::Bp => "Bp",
            Self::Bbar => "Bbar",
            Self::C => "C",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EosCurve {
    pub key: SystemKey,
    pub coefficients: VinetCoefficients,
    pub volume_min: f64,
    pub volume_max: f64,
    pub points: Vec<CurvePoint>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EosDb {
    points: Vec<EvPoint>,
    fits: Vec<VinetFit>,
    catalog: Catalog,
    report: LoadReport,
}

impl EosDb {
    /// Loads the point table and the fit summary; rows without a
    /// `functional` column are filed under `default_functional`.
    pub fn load(
        points_location: impl AsRef<Path>,
        fits_location: impl AsRef<Path>,
        default_functional: &str,
    ) -> DbResult<Self> {
        let points = load_location(points_location.as_ref(), Dataset::EvPoints, |table| {
            decode_points_table(table, default_functional)
        })?;
        let fits = load_location(fits_location.as_ref(), Dataset::VinetFit, |table| {
            decode_fits_table(table, default_functional)
        })?;

        let mut db = Self::from_records(points.rows, fits.rows);
        db.report = points.report;
        db.report.merge(fits.report);
        Ok(db)
    }

    pub fn from_records(points: Vec<EvPoint>, fits: Vec<VinetFit>) -> Self {
        let catalog = Catalog::from_entries(
            points
                .iter()
                .map(|point| &point.key)
                .chain(fits.iter().map(|fit| &fit.key))
                .map(|key| {
                    (
                        key.material.as_str(),
                        key.structure.as_str(),
                        key.functional.as_str(),
                    )
                }),
        );
        Self {
            points,
            fits,
            catalog,
            report: LoadReport::default(),
        }
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

    pub fn points(&self, material: &str, structure: &str, functional: &str) -> DbResult<Vec<EvPoint>> {
        let key = SystemKey::new(material, structure, functional);
        let points: Vec<EvPoint> = self
            .points
            .iter()
            .filter(|point| point.key == key)
            .cloned()
            .collect();
        if points.is_empty() {
            return Err(DbError::NoData {
                dataset: Dataset::EvPoints,
                key: key.to_string(),
            });
        }
        Ok(points)
    }

    pub fn fitted_params(
        &self,
        material: &str,
        structure: &str,
        functional: &str,
    ) -> DbResult<VinetFit> {
        let key = SystemKey::new(material, structure, functional);
        self.fits
            .iter()
            .find(|fit| fit.key == key)
            .cloned()
            .ok_or(DbError::NoFitData { key })
    }

    pub fn quantity(
        &self,
        material: &str,
        structure: &str,
        functional: &str,
        quantity: EosQuantity,
    ) -> DbResult<f64> {
        Ok(self
            .fitted_params(material, structure, functional)?
            .quantity(quantity))
    }

    /// Fitted curve sampled over the volume range of the stored points.
    pub fn curve(
        &self,
        material: &str,
        structure: &str,
        functional: &str,
        samples: usize,
    ) -> DbResult<EosCurve> {
        if samples == 0 {
            return Err(DbError::invalid_query(
                "curve sample count must be at least 1",
            ));
        }

        let fit = self.fitted_params(material, structure, functional)?;
        let points = self.points(material, structure, functional)?;
        let (volume_min, volume_max) = points.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY),
            |(low, high), point| (low.min(point.volume), high.max(point.volume)),
        );
        debug!(key = %fit.key, volume_min, volume_max, samples, "reconstructing Vinet curve");

        let coefficients = fit.coefficients();
        Ok(EosCurve {
            points: vinet_curve(&coefficients, volume_min, volume_max, samples),
            key: fit.key,
            coefficients,
            volume_min,
            volume_max,
        })
    }
}

fn row_key(
    row: &TableRow,
    material: &Column,
    structure: &Column,
    functional: Option<&Column>,
    default_functional: &str,
) -> SystemKey {
    SystemKey::new(
        row.text(material),
        row.text(structure),
        functional.map_or(default_functional, |column| row.text(column)),
    )
}

fn decode_points_table(table: &Table, default_functional: &str) -> Result<Vec<EvPoint>, TableError> {
    let material = table.column(&["material"])?;
    let structure = table.column(&["structure"])?;
    let functional = table.optional_column(&["functional"]);
    let volume = table.column(&["Volume", "Volume(Ang^3)", "Volume (Ang^3)"])?;
    let energy = table.column(&["Energy", "Energy(eV)", "Energy (eV)"])?;

    table
        .rows()
        .iter()
        .map(|row| {
            Ok(EvPoint {
                key: row_key(row, &material, &structure, functional.as_ref(), default_functional),
                volume: row.float(&volume)?,
                energy: row.float(&energy)?,
            })
        })
        .collect()
}

fn decode_fits_table(table: &Table, default_functional: &str) -> Result<Vec<VinetFit>, TableError> {
    let material = table.column(&["material"])?;
    let structure = table.column(&["structure"])?;
    let functional = table.optional_column(&["functional"]);
    let e0 = table.column(&["E (eV)", "E"])?;
    let v0 = table.column(&["V (Ang^3)", "V (Ang3)", "V"])?;
    let b = table.column(&["B (GPa)", "B"])?;
    let bp = table.column(&["Bp"])?;
    let bbar = table.column(&["Bbar (eV/Ang^3)", "Bbar (eV/Ang3)", "Bbar"])?;
    let c = table.column(&["C"])?;

    table
        .rows()
        .iter()
        .map(|row| {
            Ok(VinetFit {
                key: row_key(row, &material, &structure, functional.as_ref(), default_functional),
                e0: row.float(&e0)?,
                v0: row.float(&v0)?,
                b: row.float(&b)?,
                bp: row.float(&bp)?,
                bbar: row.float(&bbar)?,
                c: row.float(&c)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{EosDb, EosQuantity, EvPoint, VinetFit};
    use crate::domain::{DbError, SystemKey};

    fn gan_key() -> SystemKey {
        SystemKey::new("GaN", "zb", "PBE")
    }

    fn sample_db() -> EosDb {
        let points = [44.0, 45.5, 47.0, 48.5]
            .into_iter()
            .map(|volume| EvPoint {
                key: gan_key(),
                volume,
                energy: -24.3,
            })
            .chain(std::iter::once(EvPoint {
                key: SystemKey::new("AlN", "wz", "PBE"),
                volume: 41.0,
                energy: -29.8,
            }))
            .collect();
        let fits = vec![VinetFit {
            key: gan_key(),
            e0: -24.35,
            v0: 46.2,
            b: 172.0,
            bp: 4.5,
            bbar: 0.0071,
            c: 5.25,
        }];
        EosDb::from_records(points, fits)
    }

    #[test]
    fn catalog_unions_points_and_fits() {
        let db = sample_db();
        assert_eq!(db.materials(), ["AlN", "GaN"]);
        assert_eq!(db.structures("GaN"), ["zb"]);
        assert_eq!(db.functionals("AlN", "wz"), ["PBE"]);
    }

    #[test]
    fn curve_spans_point_volume_range_and_hits_e0() {
        let db = sample_db();
        let curve = db.curve("GaN", "zb", "PBE", 5).expect("curve should build");

        assert_eq!(curve.volume_min, 44.0);
        assert_eq!(curve.volume_max, 48.5);
        assert_eq!(curve.points.len(), 5);
        assert_eq!(curve.points[0].volume, 44.0);
        assert_eq!(curve.points[4].volume, 48.5);

        let at_v0 = super::vinet_energy(&curve.coefficients, 46.2);
        assert!((at_v0 + 24.35).abs() <= 1.0e-9);
    }

    #[test]
    fn missing_fit_and_missing_points_are_distinguished() {
        let db = sample_db();
        assert_eq!(
            db.curve("AlN", "wz", "PBE", 10),
            Err(DbError::NoFitData {
                key: SystemKey::new("AlN", "wz", "PBE")
            })
        );
        assert!(matches!(
            db.points("InN", "wz", "PBE"),
            Err(DbError::NoData { .. })
        ));
        assert!(matches!(
            db.curve("GaN", "zb", "PBE", 0),
            Err(DbError::InvalidQuery(_))
        ));
    }

    #[test]
    fn scalar_quantities_come_from_the_fit_row() {
        let db = sample_db();
        let bulk = db
            .quantity("GaN", "zb", "PBE", EosQuantity::parse("b").expect("B should parse"))
            .expect("fit should exist");
        assert_eq!(bulk, 172.0);
        assert_eq!(
            db.quantity("GaN", "zb", "PBE", EosQuantity::Bp),
            Ok(4.5)
        );
        assert!(EosQuantity::parse("E-V").is_err());
        assert!(EosQuantity::parse("pressure").is_err());
    }
}
