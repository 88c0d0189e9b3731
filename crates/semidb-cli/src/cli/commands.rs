use super::render;
use super::{CliCommand, CliError, GlobalArgs};
use semidb_core::alloy::{AlloyDb, AlloyProperty, AlloyValue, BowingFit};
use semidb_core::common::{DatabaseConfig, load_database_config};
use semidb_core::convergence::ConvergenceDb;
use semidb_core::domain::{BinaryPair, DbError, TestType};
use semidb_core::eos::{EosDb, EosQuantity};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(clap::Args)]
pub(crate) struct ConvergenceArgs {
    material: String,
    structure: String,

    /// Exchange-correlation functional (defaults to the configured one)
    #[arg(long)]
    functional: Option<String>,

    /// Restrict to one test type: kpt or encut
    #[arg(long = "test", value_name = "kpt|encut")]
    test_type: Option<String>,

    /// Report total energies instead of per-atom energies
    #[arg(long)]
    total: bool,
}

#[derive(clap::Args)]
pub(crate) struct SystemArgs {
    material: String,
    structure: String,

    /// Exchange-correlation functional (defaults to the configured one)
    #[arg(long)]
    functional: Option<String>,
}

#[derive(clap::Subcommand)]
pub(crate) enum EosCommand {
    /// List materials with E-V points or fits
    Materials,
    /// Stored energy-volume points
    Points(SystemArgs),
    /// Stored Vinet fit parameters
    Fit(SystemArgs),
    /// One fitted quantity: E, V, B, Bp, Bbar or C
    Quantity {
        #[command(flatten)]
        system: SystemArgs,
        quantity: String,
    },
    /// Vinet curve over the stored volume range
    Curve {
        #[command(flatten)]
        system: SystemArgs,

        /// Number of curve samples (defaults to the configured count)
        #[arg(long)]
        samples: Option<usize>,
    },
}

#[derive(clap::Subcommand)]
pub(crate) enum AlloyCommand {
    /// List binary pairs
    Binaries,
    /// Record or property at an exact composition
    Get {
        /// Pair label, e.g. "GaAs InAs"
        binary: String,
        structure: String,

        /// Fractions in the pair's label order
        #[arg(long, value_name = "A,B")]
        comp: String,

        /// GAP, H_MIX, VOLUME or LATTICE; the whole record when omitted
        #[arg(long)]
        property: Option<String>,

        #[arg(long)]
        functional: Option<String>,
    },
    /// Bowing fit for one pair
    Fit {
        binary: String,
        structure: String,

        #[arg(long)]
        property: String,

        #[arg(long)]
        functional: Option<String>,
    },
    /// Bowing fits for every pair of a structure
    FitAll {
        structure: String,

        #[arg(long)]
        property: String,

        #[arg(long)]
        functional: Option<String>,
    },
}

struct CliContext {
    config: DatabaseConfig,
    json: bool,
}

impl CliContext {
    fn from_global(global: &GlobalArgs) -> Result<Self, CliError> {
        let base = global
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        let config = match &global.config {
            Some(path) => load_database_config(path)?,
            None => DatabaseConfig::default(),
        }
        .resolve_against(&base);
        debug!(?config, "resolved database config");

        Ok(Self {
            config,
            json: global.json,
        })
    }

    fn functional(&self, requested: Option<String>) -> String {
        requested.unwrap_or_else(|| self.config.default_functional.clone())
    }

    fn convergence(&self) -> Result<ConvergenceDb, CliError> {
        Ok(ConvergenceDb::load(&self.config.convergence_path)?)
    }

    fn eos(&self) -> Result<EosDb, CliError> {
        Ok(EosDb::load(
            &self.config.ev_points_path,
            &self.config.vinet_fit_path,
            &self.config.default_functional,
        )?)
    }

    fn alloy(&self) -> Result<AlloyDb, CliError> {
        Ok(AlloyDb::load(
            &self.config.alloy_path,
            self.config.composition_tolerance,
        )?)
    }
}

pub(super) fn dispatch(global: GlobalArgs, command: CliCommand) -> Result<i32, CliError> {
    let context = CliContext::from_global(&global)?;
    match command {
        CliCommand::Materials => {
            let db = context.convergence()?;
            render::list(context.json, &db.materials())?;
        }
        CliCommand::Structures { material } => {
            let db = context.convergence()?;
            render::list(context.json, &db.structures(&material))?;
        }
        CliCommand::Functionals {
            material,
            structure,
        } => {
            let db = context.convergence()?;
            let functionals = db.catalog().functionals_or(
                &material,
                &structure,
                &context.config.default_functional,
            );
            render::list(context.json, &functionals)?;
        }
        CliCommand::Convergence(args) => run_convergence_command(&context, args)?,
        CliCommand::Eos(command) => run_eos_command(&context, command)?,
        CliCommand::Alloy(command) => run_alloy_command(&context, command)?,
    }
    Ok(0)
}

fn run_convergence_command(context: &CliContext, args: ConvergenceArgs) -> Result<(), CliError> {
    let test_type = args.test_type.as_deref().map(TestType::parse).transpose()?;
    let functional = context.functional(args.functional);
    let per_atom = !args.total;
    let db = context.convergence()?;

    if let Some(test_type) = test_type {
        let series = db.query(
            &args.material,
            &args.structure,
            &functional,
            test_type,
            per_atom,
        )?;
        if context.json {
            return render::json(&series);
        }
        render::series(&series);
        return Ok(());
    }

    let overview = db.overview(&args.material, &args.structure, &functional, per_atom);
    let (kpt, encut) = match (overview.kpt, overview.encut) {
        (Err(error), Err(_)) => return Err(error.into()),
        (kpt, encut) => (kpt, encut),
    };
    for error in [&kpt, &encut].into_iter().filter_map(|series| series.as_ref().err()) {
        warn!(%error, "convergence axis unavailable");
    }

    if context.json {
        return render::json(&json!({
            "kpt": kpt.as_ref().ok(),
            "encut": encut.as_ref().ok(),
        }));
    }
    for series in [kpt, encut].into_iter().flatten() {
        render::series(&series);
    }
    Ok(())
}

fn run_eos_command(context: &CliContext, command: EosCommand) -> Result<(), CliError> {
    let db = context.eos()?;
    match command {
        EosCommand::Materials => render::list(context.json, &db.materials()),
        EosCommand::Points(system) => {
            let functional = context.functional(system.functional);
            let points = db.points(&system.material, &system.structure, &functional)?;
            if context.json {
                return render::json(&points);
            }
            render::ev_points(&points);
            Ok(())
        }
        EosCommand::Fit(system) => {
            let functional = context.functional(system.functional);
            let fit = db.fitted_params(&system.material, &system.structure, &functional)?;
            if context.json {
                return render::json(&fit);
            }
            render::vinet_fit(&fit);
            Ok(())
        }
        EosCommand::Quantity { system, quantity } => {
            let quantity = EosQuantity::parse(&quantity)?;
            let functional = context.functional(system.functional);
            let value = db.quantity(&system.material, &system.structure, &functional, quantity)?;
            if context.json {
                return render::json(&json!({
                    "quantity": quantity.to_string(),
                    "value": value,
                    "unit": quantity.unit(),
                }));
            }
            println!("{quantity} = {value} {}", quantity.unit());
            Ok(())
        }
        EosCommand::Curve { system, samples } => {
            let functional = context.functional(system.functional);
            let samples = samples.unwrap_or(context.config.curve_samples);
            let curve = db.curve(&system.material, &system.structure, &functional, samples)?;
            if context.json {
                return render::json(&curve);
            }
            render::eos_curve(&curve);
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct BowingRow<'a> {
    binary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fit: Option<&'a BowingFit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn run_alloy_command(context: &CliContext, command: AlloyCommand) -> Result<(), CliError> {
    let db = context.alloy()?;
    match command {
        AlloyCommand::Binaries => render::list(context.json, &db.binaries()),
        AlloyCommand::Get {
            binary,
            structure,
            comp,
            property,
            functional,
        } => {
            let pair = BinaryPair::parse(&binary)?;
            let composition = parse_composition(&comp)?;
            let property = property.as_deref().map(AlloyProperty::parse).transpose()?;
            let functional = context.functional(functional);

            match property {
                None => {
                    let record = db.record(&pair, &structure, &functional, composition)?;
                    if context.json {
                        return render::json(&record);
                    }
                    render::alloy_record(&record);
                }
                Some(property) => {
                    let value = db.lookup(&pair, &structure, &functional, composition, property)?;
                    if context.json {
                        return render::json(&value);
                    }
                    match value {
                        AlloyValue::Scalar(value) => println!("{property} = {value}"),
                        AlloyValue::Lattice(rows) => render::lattice(&rows),
                    }
                }
            }
            Ok(())
        }
        AlloyCommand::Fit {
            binary,
            structure,
            property,
            functional,
        } => {
            let pair = BinaryPair::parse(&binary)?;
            let property = AlloyProperty::parse(&property)?;
            let functional = context.functional(functional);
            let fit = db.fit_bowing(&pair, &structure, &functional, property)?;
            if context.json {
                return render::json(&fit);
            }
            render::bowing_fit(&pair, property, &fit);
            Ok(())
        }
        AlloyCommand::FitAll {
            structure,
            property,
            functional,
        } => {
            let property = AlloyProperty::parse(&property)?;
            let functional = context.functional(functional);
            let reports = db.fit_bowing_all(&structure, &functional, property);

            if context.json {
                let rows: Vec<BowingRow<'_>> = reports
                    .iter()
                    .map(|report| BowingRow {
                        binary: report.pair.to_string(),
                        fit: report.outcome.as_ref().ok(),
                        error: report.outcome.as_ref().err().map(ToString::to_string),
                    })
                    .collect();
                return render::json(&rows);
            }
            render::bowing_reports(property, &reports);
            Ok(())
        }
    }
}

/// Parses `A,B` fractions.
fn parse_composition(raw: &str) -> Result<[f64; 2], DbError> {
    let invalid = || {
        DbError::invalid_query(format!(
            "composition '{raw}' must be two comma-separated numbers, e.g. 0.25,0.75"
        ))
    };
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [first, second] = fields.as_slice() else {
        return Err(invalid());
    };
    let first = first.parse::<f64>().map_err(|_| invalid())?;
    let second = second.parse::<f64>().map_err(|_| invalid())?;
    if !(first.is_finite() && second.is_finite()) {
        return Err(invalid());
    }
    Ok([first, second])
}
