use crate::config::{AppConfig, GeometryFormat};
use crate::derive::Derivation;
use crate::output::GeometryColumns;
use crate::types::GEOID_LEN;
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

/// Structural problems found in one year's written outputs.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationReport {
    pub rows: usize,
    pub malformed_geoids: Vec<String>,
    pub duplicate_geoids: Vec<String>,
    pub missing_from_geometry: Vec<String>,
    pub missing_from_demographics: Vec<String>,
    /// `(expected, actual)` when an expected row count was given and differs.
    pub row_count_mismatch: Option<(usize, usize)>,
    /// `(GEOID, column, value)` for rates outside [0, 1].
    pub out_of_range: Vec<(String, String, f64)>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.malformed_geoids.is_empty()
            && self.duplicate_geoids.is_empty()
            && self.missing_from_geometry.is_empty()
            && self.missing_from_demographics.is_empty()
            && self.row_count_mismatch.is_none()
            && self.out_of_range.is_empty()
    }

    pub fn log(&self) {
        if self.is_clean() {
            info!(rows = self.rows, "Outputs passed validation");
            return;
        }
        warn!(
            rows = self.rows,
            malformed = self.malformed_geoids.len(),
            duplicates = self.duplicate_geoids.len(),
            missing_from_geometry = self.missing_from_geometry.len(),
            missing_from_demographics = self.missing_from_demographics.len(),
            out_of_range = self.out_of_range.len(),
            row_count_mismatch = ?self.row_count_mismatch,
            "Outputs failed validation"
        );
    }
}

pub fn is_valid_geoid(geoid: &str) -> bool {
    geoid.len() == GEOID_LEN && geoid.bytes().all(|b| b.is_ascii_digit())
}

/// Checks the files written for `config.year` against each other.
pub fn validate_outputs(
    config: &AppConfig,
    expected_rows: Option<usize>,
) -> Result<ValidationReport> {
    let demographics = config.demographics_path();
    let geometry = config.geometry_path();
    info!(
        demographics = %demographics.display(),
        geometry = %geometry.display(),
        "Validating outputs"
    );

    let (mut report, demographic_ids) = check_demographics(open_maybe_gzip(&demographics)?)
        .with_context(|| format!("Failed to validate {:?}", demographics))?;
    let geometry_ids = match config.output.geometry_format {
        GeometryFormat::Pickle => read_pickle_geoids(&geometry)?,
        GeometryFormat::Geojson => read_geojson_geoids(&geometry)?,
    };

    report.missing_from_geometry = demographic_ids
        .difference(&geometry_ids)
        .cloned()
        .collect();
    report.missing_from_demographics = geometry_ids
        .difference(&demographic_ids)
        .cloned()
        .collect();

    if let Some(expected) = expected_rows {
        if expected != report.rows {
            report.row_count_mismatch = Some((expected, report.rows));
        }
    }

    report.log();
    Ok(report)
}

fn open_maybe_gzip(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let gzipped = path.extension().and_then(|e| e.to_str()) == Some("gz");
    Ok(if gzipped {
        Box::new(GzDecoder::new(BufReader::new(file)))
    } else {
        Box::new(BufReader::new(file))
    })
}

/// GEOID format, uniqueness and rate bounds of a demographics CSV, read in one pass.
/// Also returns the distinct GEOIDs for comparison with the geometry file.
pub fn check_demographics<R: Read>(reader: R) -> Result<(ValidationReport, BTreeSet<String>)> {
    let mut rdr = ReaderBuilder::new().from_reader(reader);
    let headers = rdr.headers()?.clone();
    let geoid_idx = headers
        .iter()
        .position(|h| h == "GEOID")
        .ok_or_else(|| anyhow!("GEOID column missing"))?;
    let rate_columns: Vec<(usize, &'static str)> = Derivation::ALL
        .iter()
        .filter(|d| d.is_rate())
        .filter_map(|d| {
            headers
                .iter()
                .position(|h| h == d.column())
                .map(|idx| (idx, d.column()))
        })
        .collect();

    let mut report = ValidationReport::default();
    let mut seen = BTreeSet::new();
    for result in rdr.records() {
        let record = result?;
        report.rows += 1;

        let geoid = record.get(geoid_idx).unwrap_or("").to_string();
        if !is_valid_geoid(&geoid) {
            report.malformed_geoids.push(geoid.clone());
        }
        if !seen.insert(geoid.clone()) {
            report.duplicate_geoids.push(geoid.clone());
        }

        for &(idx, column) in &rate_columns {
            let raw = record.get(idx).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            let value: f64 = raw
                .parse()
                .with_context(|| format!("Invalid {} '{}' for {}", column, raw, geoid))?;
            if !(0.0..=1.0).contains(&value) {
                report.out_of_range.push((geoid.clone(), column.to_string(), value));
            }
        }
    }

    Ok((report, seen))
}

fn read_pickle_geoids(path: &Path) -> Result<BTreeSet<String>> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let columns: GeometryColumns =
        serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())
            .with_context(|| format!("Failed to unpickle geometry: {:?}", path))?;
    if columns.geoid.len() != columns.geometry.len() {
        return Err(anyhow!(
            "Geometry columns disagree in length: {} GEOIDs, {} geometries",
            columns.geoid.len(),
            columns.geometry.len()
        ));
    }
    Ok(columns.geoid.into_iter().collect())
}

fn read_geojson_geoids(path: &Path) -> Result<BTreeSet<String>> {
    use geojson::GeoJson;

    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;
    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Geometry output must be a FeatureCollection")),
    };

    Ok(collection
        .features
        .iter()
        .filter_map(|f| {
            f.property("GEOID")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .collect())
}
