//! Decoding of convergence `parameter` tags into axis values.
//!
//! Two tag shapes are understood: k-point grids `k<a>x<b>x<c>` (axis is the
//! grid product) and cutoff tags whose first digit run is the cutoff in eV.
//! Decoding is total: a tag that does not fit yields `None`.

use crate::domain::TestType;
use regex::Regex;
use std::sync::LazyLock;

static KPOINT_GRID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"k(\d+)x(\d+)x(\d+)").expect("k-point pattern should compile"));

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit pattern should compile"));

pub fn decode_parameter(test_type: TestType, tag: &str) -> Option<f64> {
    match test_type {
        TestType::Kpt => decode_kpoint_tag(tag),
        TestType::Encut => decode_cutoff_tag(tag),
    }
}

/// Total number of k-points in a `k<a>x<b>x<c>` grid tag.
pub fn decode_kpoint_tag(tag: &str) -> Option<f64> {
    let captures = KPOINT_GRID.captures(tag)?;
    let mut product: u64 = 1;
    for index in 1..=3 {
        let dimension: u64 = captures.get(index)?.as_str().parse().ok()?;
        if dimension == 0 {
            return None;
        }
        product = product.checked_mul(dimension)?;
    }
    Some(product as f64)
}

/// Plane-wave cutoff in eV from the first digit run of the tag.
pub fn decode_cutoff_tag(tag: &str) -> Option<f64> {
    let digits = DIGIT_RUN.find(tag)?;
    digits.as_str().parse::<f64>().ok()
}
