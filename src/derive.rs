//! Derived columns added to each block group after the join.
//!
//! Every derivation yields `None` when an input is missing, when a
//! denominator is zero, or when a logarithm argument is not positive.

use crate::types::BlockGroup;
use crate::variables;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    Over65Rate,
    MinorityRate,
    PopDensity,
    CollegePlusRate,
    EmploymentRate,
    FamilyRate,
    ChildrenRate,
    Under25KRate,
    LogPop,
    LogPopDensity,
    LogLand,
}

const OVER_65: &[&str] = &[
    "B01001e20", "B01001e21", "B01001e22", "B01001e23", "B01001e24", "B01001e25",
    "B01001e44", "B01001e45", "B01001e46", "B01001e47", "B01001e48", "B01001e49",
];
const SEX_TOTAL: &[&str] = &["B01001e2", "B01001e26"];
const COLLEGE_PLUS: &[&str] = &["B15003e21", "B15003e22", "B15003e23", "B15003e24", "B15003e25"];
const UNDER_25K: &[&str] = &["B19001e2", "B19001e3", "B19001e4", "B19001e5"];

impl Derivation {
    pub const ALL: [Derivation; 11] = [
        Derivation::Over65Rate,
        Derivation::MinorityRate,
        Derivation::PopDensity,
        Derivation::CollegePlusRate,
        Derivation::EmploymentRate,
        Derivation::FamilyRate,
        Derivation::ChildrenRate,
        Derivation::Under25KRate,
        Derivation::LogPop,
        Derivation::LogPopDensity,
        Derivation::LogLand,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Derivation::Over65Rate => "Over65Rate",
            Derivation::MinorityRate => "MinorityRate",
            Derivation::PopDensity => "PopDensity",
            Derivation::CollegePlusRate => "CollegePlusRate",
            Derivation::EmploymentRate => "EmploymentRate",
            Derivation::FamilyRate => "FamilyRate",
            Derivation::ChildrenRate => "ChildrenRate",
            Derivation::Under25KRate => "Under25KRate",
            Derivation::LogPop => "logPop",
            Derivation::LogPopDensity => "logPopDensity",
            Derivation::LogLand => "logLand",
        }
    }

    /// Proportions bounded by [0, 1] for consistent non-negative inputs.
    pub fn is_rate(self) -> bool {
        matches!(
            self,
            Derivation::Over65Rate
                | Derivation::MinorityRate
                | Derivation::CollegePlusRate
                | Derivation::EmploymentRate
                | Derivation::FamilyRate
                | Derivation::ChildrenRate
                | Derivation::Under25KRate
        )
    }

    pub fn compute(self, bg: &BlockGroup) -> Option<f64> {
        let value = match self {
            Derivation::Over65Rate => ratio(sum(bg, OVER_65)?, sum(bg, SEX_TOTAL)?),
            Derivation::MinorityRate => {
                ratio(acs(bg, "B02001e2")?, acs(bg, "B02001e1")?).map(|white| 1.0 - white)
            }
            Derivation::PopDensity => pop_density(bg),
            Derivation::CollegePlusRate => {
                ratio(sum(bg, COLLEGE_PLUS)?, acs(bg, "B15003e1")?)
            }
            Derivation::EmploymentRate => ratio(acs(bg, "B23025e2")?, acs(bg, "B23025e1")?),
            Derivation::FamilyRate => ratio(acs(bg, "B11001e2")?, acs(bg, "B11001e1")?),
            Derivation::ChildrenRate => ratio(acs(bg, "B09018e1")?, acs(bg, "B09019e1")?),
            Derivation::Under25KRate => ratio(sum(bg, UNDER_25K)?, acs(bg, "B19001e1")?),
            Derivation::LogPop => ln(acs(bg, "B01001e1")?),
            Derivation::LogPopDensity => ln(pop_density(bg)?),
            Derivation::LogLand => ln(bg.aland()?),
        };
        value.filter(|v| v.is_finite())
    }
}

pub fn derive_all(bg: &BlockGroup) -> Vec<Option<f64>> {
    Derivation::ALL.iter().map(|d| d.compute(bg)).collect()
}

fn pop_density(bg: &BlockGroup) -> Option<f64> {
    ratio(acs(bg, "B01001e1")?, bg.aland()?)
}

fn acs(bg: &BlockGroup, code: &str) -> Option<f64> {
    variables::position(code).and_then(|pos| bg.acs_value(pos))
}

// Any missing term makes the whole sum missing.
fn sum(bg: &BlockGroup, codes: &[&str]) -> Option<f64> {
    codes.iter().map(|code| acs(bg, code)).sum()
}

pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        None
    } else {
        Some(numerator / denominator)
    }
}

pub fn ln(value: f64) -> Option<f64> {
    (value > 0.0).then(|| value.ln())
}
