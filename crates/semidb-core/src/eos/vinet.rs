//! Closed-form Vinet energy curve from stored fit coefficients.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VinetCoefficients {
    /// Equilibrium energy (eV).
    pub e0: f64,
    /// Equilibrium volume (Å³).
    pub v0: f64,
    /// Energy scale (eV/Å³).
    pub bbar: f64,
    /// Dimensionless curvature constant.
    pub c: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub volume: f64,
    pub energy: f64,
}

/// E(V) = E0 + C²·B̄·V0·(1 − (1 + y)·e^(−y)), y = C·((V/V0)^(1/3) − 1).
pub fn vinet_energy(coefficients: &VinetCoefficients, volume: f64) -> f64 {
    let VinetCoefficients { e0, v0, bbar, c } = *coefficients;
    let x = (volume / v0).cbrt();
    let y = c * (x - 1.0);
    e0 + c * c * bbar * v0 * (1.0 - (1.0 + y) * (-y).exp())
}

/// `count` evenly spaced values over `[start, stop]`, endpoints included.
pub fn linspace(start: f64, stop: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (count - 1) as f64;
            (0..count)
                .map(|index| {
                    if index == count - 1 {
                        stop
                    } else {
                        start + step * index as f64
                    }
                })
                .collect()
        }
    }
}

pub fn vinet_curve(
    coefficients: &VinetCoefficients,
    volume_min: f64,
    volume_max: f64,
    samples: usize,
) -> Vec<CurvePoint> {
    linspace(volume_min, volume_max, samples)
        .into_iter()
        .map(|volume| CurvePoint {
            volume,
            energy: vinet_energy(coefficients, volume),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{VinetCoefficients, linspace, vinet_curve, vinet_energy};

    const GAN: VinetCoefficients = VinetCoefficients {
        e0: -24.35,
        v0: 46.2,
        bbar: 0.0071,
        c: 5.7,
    };

    #[test]
    fn curve_passes_through_equilibrium_point() {
        for coefficients in [
            GAN,
            VinetCoefficients {
                e0: 3.0,
                v0: 12.5,
                bbar: 1.3,
                c: 0.4,
            },
            VinetCoefficients {
                e0: -1.0e3,
                v0: 1.0e3,
                bbar: 1.0e-4,
                c: 12.0,
            },
        ] {
            let energy = vinet_energy(&coefficients, coefficients.v0);
            assert!(
                (energy - coefficients.e0).abs() <= 1.0e-9,
                "E(V0) was {energy}, expected {}",
                coefficients.e0
            );
        }
    }

    #[test]
    fn equilibrium_is_the_minimum_of_the_sampled_curve() {
        let curve = vinet_curve(&GAN, 40.0, 52.0, 121);
        let minimum = curve
            .iter()
            .min_by(|left, right| left.energy.total_cmp(&right.energy))
            .expect("curve should not be empty");

        assert!((minimum.volume - GAN.v0).abs() <= 0.1);
        assert!(curve.iter().all(|point| point.energy >= GAN.e0 - 1.0e-12));
    }

    #[test]
    fn reconstruction_is_repeatable() {
        assert_eq!(vinet_curve(&GAN, 40.0, 52.0, 17), vinet_curve(&GAN, 40.0, 52.0, 17));
    }

    #[test]
    fn linspace_includes_both_endpoints() {
        assert_eq!(linspace(1.0, 2.0, 5), [1.0, 1.25, 1.5, 1.75, 2.0]);
        assert_eq!(linspace(1.0, 2.0, 1), [1.0]);
        assert!(linspace(1.0, 2.0, 0).is_empty());
    }
}
