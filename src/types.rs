use crate::error::PipelineError;
use geo::MultiPolygon;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const GEOID_LEN: usize = 12;

/// Block group identifier: state (2) + county (3) + tract (6) + block group (1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Geoid(String);

impl Geoid {
    /// Normalises a raw identifier.
    ///
    /// Long forms such as `15000US721537506022` keep their trailing 12
    /// characters; short all-digit forms are zero-padded on the left.
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.is_ascii() {
            return Err(PipelineError::InvalidGeoid(raw.to_string()));
        }

        let tail = if trimmed.len() > GEOID_LEN {
            &trimmed[trimmed.len() - GEOID_LEN..]
        } else {
            trimmed
        };

        if !tail.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PipelineError::InvalidGeoid(raw.to_string()));
        }

        Ok(Geoid(format!("{:0>width$}", tail, width = GEOID_LEN)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn state_fips(&self) -> &str {
        &self.0[..2]
    }
}

impl FromStr for Geoid {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Geoid::parse(s)
    }
}

impl fmt::Display for Geoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// ACS estimates keyed by GEOID, values aligned with `variables::VARIABLES`.
#[derive(Debug, Default)]
pub struct AcsTable {
    pub rows: BTreeMap<Geoid, Vec<Option<f64>>>,
}

#[derive(Debug, Clone)]
pub struct TigerRecord {
    pub aland: Option<f64>,
    pub awater: Option<f64>,
    pub intptlat: Option<f64>,
    pub intptlon: Option<f64>,
    // None for null or non-polygon shapes; the attributes are still published
    pub geometry: Option<MultiPolygon<f64>>,
}

#[derive(Debug, Default)]
pub struct TigerTable {
    pub rows: BTreeMap<Geoid, TigerRecord>,
}

/// One output row after the outer join.
#[derive(Debug, Clone)]
pub struct BlockGroup {
    pub geoid: Geoid,
    // None when the GEOID had no ACS record
    pub acs: Option<Vec<Option<f64>>>,
    pub tiger: Option<TigerRecord>,
    pub derived: Vec<Option<f64>>,
}

impl BlockGroup {
    pub fn acs_value(&self, position: usize) -> Option<f64> {
        self.acs.as_ref().and_then(|values| values.get(position).copied().flatten())
    }

    pub fn aland(&self) -> Option<f64> {
        self.tiger.as_ref().and_then(|t| t.aland)
    }
}
