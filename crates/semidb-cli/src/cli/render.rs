use super::CliError;
use anyhow::Context;
use semidb_core::alloy::{AlloyProperty, AlloyRecord, BowingFit, BowingReport};
use semidb_core::convergence::ConvergenceSeries;
use semidb_core::domain::BinaryPair;
use semidb_core::eos::{EosCurve, EvPoint, VinetFit};
use serde::Serialize;

pub(super) fn json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered =
        serde_json::to_string_pretty(value).context("failed to serialize JSON output")?;
    println!("{rendered}");
    Ok(())
}

pub(super) fn list(as_json: bool, items: &[String]) -> Result<(), CliError> {
    if as_json {
        return json(items);
    }
    for item in items {
        println!("{item}");
    }
    Ok(())
}

pub(super) fn series(series: &ConvergenceSeries) {
    println!("# {} {}", series.key, series.test_type);
    println!(
        "{:<16} {:>14} {:>18}",
        "parameter", series.axis_label, series.energy_label
    );
    for point in &series.points {
        println!(
            "{:<16} {:>14} {:>18.6}",
            point.parameter, point.axis, point.energy
        );
    }
    if series.dropped > 0 {
        println!("# {} row(s) with undecodable parameter tags omitted", series.dropped);
    }
}

pub(super) fn ev_points(points: &[EvPoint]) {
    println!("{:>14} {:>14}", "V (Ang^3)", "E (eV)");
    for point in points {
        println!("{:>14.6} {:>14.6}", point.volume, point.energy);
    }
}

pub(super) fn vinet_fit(fit: &VinetFit) {
    println!("# Vinet fit for {}", fit.key);
    println!("E0   = {} eV", fit.e0);
    println!("V0   = {} Ang^3", fit.v0);
    println!("B    = {} GPa", fit.b);
    println!("Bp   = {}", fit.bp);
    println!("Bbar = {} eV/Ang^3", fit.bbar);
    println!("C    = {}", fit.c);
}

pub(super) fn eos_curve(curve: &EosCurve) {
    println!(
        "# Vinet curve for {} over [{}, {}] Ang^3",
        curve.key, curve.volume_min, curve.volume_max
    );
    println!("{:>14} {:>14}", "V (Ang^3)", "E (eV)");
    for point in &curve.points {
        println!("{:>14.6} {:>14.6}", point.volume, point.energy);
    }
}

pub(super) fn alloy_record(record: &AlloyRecord) {
    println!("formula              {}", record.formula);
    println!("binary               {}", record.binary);
    println!("structure            {}", record.structure);
    println!("functional           {}", record.functional);
    for (component, fraction) in record.components.iter().zip(record.fractions) {
        println!("x_{component:<18} {fraction}");
    }
    println!("volume(Ang^3)        {}", record.volume);
    match record.num_atoms {
        Some(count) => println!("num_atoms            {count}"),
        None => println!("num_atoms            -"),
    }
    println!("total_energy(eV)     {}", record.total_energy);
    println!("bandgap_Gamma(eV)    {}", record.bandgap_gamma);
    println!("hmix_meV_per_formula {}", record.hmix_mev_per_formula);
    println!("lattice_matrix       {}", record.lattice_matrix);
}

pub(super) fn lattice(rows: &[Vec<f64>]) {
    for row in rows {
        let cells: Vec<String> = row.iter().map(|value| format!("{value:>12.6}")).collect();
        println!("{}", cells.join(" "));
    }
}

pub(super) fn bowing_fit(pair: &BinaryPair, property: AlloyProperty, fit: &BowingFit) {
    println!("# {property} bowing for {pair} (x = fraction of {})", pair.second());
    println!("b        = {}", fit.bowing);
    println!("E(x=0)   = {}", fit.start_value);
    println!("E(x=1)   = {}", fit.end_value);
    println!("RSS      = {:e}", fit.residual_sum_of_squares);
    println!("samples  = {}", fit.samples.len());
    println!("{:>8} {:>14} {:>14}", "x", "value", "model");
    for sample in &fit.samples {
        println!(
            "{:>8.4} {:>14.6} {:>14.6}",
            sample.x,
            sample.value,
            fit.evaluate(sample.x)
        );
    }
}

pub(super) fn bowing_reports(property: AlloyProperty, reports: &[BowingReport]) {
    println!("# {property} bowing parameters");
    for report in reports {
        match &report.outcome {
            Ok(fit) => println!(
                "{:<24} b = {:>10.6}  ({} samples)",
                report.pair.to_string(),
                fit.bowing,
                fit.samples.len()
            ),
            Err(error) => println!("{:<24} skipped: {error}", report.pair.to_string()),
        }
    }
}
