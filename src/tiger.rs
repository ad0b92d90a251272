use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::types::{Geoid, TigerRecord, TigerTable};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use geo::MultiPolygon;
use rayon::prelude::*;
use shapefile::dbase::FieldValue;
use shapefile::Reader;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    pub fips: u8,
    pub name: String,
}

/// States, DC and Puerto Rico: every jurisdiction TIGER/Line publishes block groups for
/// that the ACS 5-Year tables also cover.
const STATES: &[(u8, &str)] = &[
    (1, "Alabama"),
    (2, "Alaska"),
    (4, "Arizona"),
    (5, "Arkansas"),
    (6, "California"),
    (8, "Colorado"),
    (9, "Connecticut"),
    (10, "Delaware"),
    (11, "District of Columbia"),
    (12, "Florida"),
    (13, "Georgia"),
    (15, "Hawaii"),
    (16, "Idaho"),
    (17, "Illinois"),
    (18, "Indiana"),
    (19, "Iowa"),
    (20, "Kansas"),
    (21, "Kentucky"),
    (22, "Louisiana"),
    (23, "Maine"),
    (24, "Maryland"),
    (25, "Massachusetts"),
    (26, "Michigan"),
    (27, "Minnesota"),
    (28, "Mississippi"),
    (29, "Missouri"),
    (30, "Montana"),
    (31, "Nebraska"),
    (32, "Nevada"),
    (33, "New Hampshire"),
    (34, "New Jersey"),
    (35, "New Mexico"),
    (36, "New York"),
    (37, "North Carolina"),
    (38, "North Dakota"),
    (39, "Ohio"),
    (40, "Oklahoma"),
    (41, "Oregon"),
    (42, "Pennsylvania"),
    (44, "Rhode Island"),
    (45, "South Carolina"),
    (46, "South Dakota"),
    (47, "Tennessee"),
    (48, "Texas"),
    (49, "Utah"),
    (50, "Vermont"),
    (51, "Virginia"),
    (53, "Washington"),
    (54, "West Virginia"),
    (55, "Wisconsin"),
    (56, "Wyoming"),
    (72, "Puerto Rico"),
];

pub fn default_states() -> Vec<State> {
    STATES
        .iter()
        .map(|(fips, name)| State {
            fips: *fips,
            name: name.to_string(),
        })
        .collect()
}

/// Reads a state reference list. Rows with a blank `CensusName` are skipped.
pub fn load_states(path: &Path) -> Result<Vec<State>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open states file: {:?}", path))?;
    let mut rdr = ReaderBuilder::new().from_reader(file);
    let headers = rdr.headers()?.clone();

    let find = |column: &str| {
        headers
            .iter()
            .position(|h| h.trim() == column)
            .ok_or_else(|| PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
    };
    let fips_idx = find("StateFIPS")?;
    let name_idx = find("CensusName")?;

    let mut states = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        let raw_fips = record.get(fips_idx).unwrap_or("").trim();
        let fips: u8 = raw_fips
            .parse()
            .with_context(|| format!("Invalid StateFIPS '{}' in {:?}", raw_fips, path))?;
        states.push(State {
            fips,
            name: name.to_string(),
        });
    }

    Ok(states)
}

/// Reads every state's block groups and appends them into one table.
pub fn load_block_groups(config: &AppConfig) -> Result<TigerTable> {
    let states = match &config.input.states_csv {
        Some(path) => load_states(path)?,
        None => default_states(),
    };
    info!(
        dir = %config.input.tiger_dir.display(),
        states = states.len(),
        "Pulling TIGER/Line geographics"
    );

    let prefix = config.tiger_prefix();
    let per_state: Vec<Vec<(Geoid, TigerRecord)>> = states
        .par_iter()
        .map(|state| {
            let path = state_file(&config.input.tiger_dir, &prefix, state)?;
            load_state_file(&path)
        })
        .collect::<Result<_>>()?;

    let mut table = TigerTable::default();
    for records in per_state {
        for (geoid, record) in records {
            match table.rows.entry(geoid) {
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
                Entry::Occupied(slot) => {
                    return Err(PipelineError::DuplicateGeoid {
                        geoid: slot.key().to_string(),
                        source_name: "TIGER/Line".to_string(),
                    }
                    .into());
                }
            }
        }
    }

    info!(block_groups = table.rows.len(), "Loaded TIGER/Line block groups");
    Ok(table)
}

/// Locates `<prefix><SS>_bg.shp`, falling back to a GeoJSON file of the same stem.
fn state_file(dir: &Path, prefix: &str, state: &State) -> Result<PathBuf> {
    let stem = format!("{}{:02}_bg", prefix, state.fips);
    for ext in ["shp", "geojson", "json"] {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(PipelineError::MissingState {
        fips: state.fips,
        name: state.name.clone(),
        dir: dir.to_path_buf(),
    }
    .into())
}

pub fn load_state_file(path: &Path) -> Result<Vec<(Geoid, TigerRecord)>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let records = match extension.as_str() {
        "shp" => load_shapefile(path)?,
        "json" | "geojson" => load_geojson(path)?,
        other => return Err(PipelineError::UnsupportedFormat(other.to_string()).into()),
    };

    debug!(path = %path.display(), block_groups = records.len(), "Read state block groups");
    Ok(records)
}

fn load_shapefile(path: &Path) -> Result<Vec<(Geoid, TigerRecord)>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut out = Vec::new();

    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) = result?;

        let geoid = match record.get("GEOID") {
            Some(value) => match field_text(value) {
                Some(raw) => Geoid::parse(&raw)?,
                None => {
                    return Err(PipelineError::NullGeoid {
                        path: path.to_path_buf(),
                        record: index,
                    }
                    .into())
                }
            },
            None => {
                return Err(PipelineError::MissingColumn {
                    path: path.to_path_buf(),
                    column: "GEOID".to_string(),
                }
                .into())
            }
        };

        let geometry: Option<MultiPolygon<f64>> = match shape {
            shapefile::Shape::Polygon(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            ),
            shapefile::Shape::PolygonM(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            ),
            shapefile::Shape::PolygonZ(polygon) => Some(
                polygon
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            ),
            other => {
                warn!(
                    %geoid,
                    shape = ?other.shapetype(),
                    "Keeping block group without a polygon"
                );
                None
            }
        };

        out.push((
            geoid,
            TigerRecord {
                aland: record.get("ALAND").and_then(field_number),
                awater: record.get("AWATER").and_then(field_number),
                intptlat: record.get("INTPTLAT").and_then(field_number),
                intptlon: record.get("INTPTLON").and_then(field_number),
                geometry,
            },
        ));
    }

    Ok(out)
}

fn load_geojson(path: &Path) -> Result<Vec<(Geoid, TigerRecord)>> {
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let reader = BufReader::new(file);

    // Loads the whole file into memory; per-state files keep this bounded.
    let geojson = GeoJson::from_reader(reader)
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection: {:?}", path)),
    };

    let mut out = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let props = feature.properties.as_ref();
        let prop = |key: &str| props.and_then(|p| p.get(key));

        let geoid = match prop("GEOID") {
            Some(value) => match json_text(value) {
                Some(raw) => Geoid::parse(&raw)?,
                None => {
                    return Err(PipelineError::NullGeoid {
                        path: path.to_path_buf(),
                        record: index,
                    }
                    .into())
                }
            },
            None => {
                return Err(PipelineError::MissingColumn {
                    path: path.to_path_buf(),
                    column: "GEOID".to_string(),
                }
                .into())
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let value: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match value {
                    geo::Geometry::MultiPolygon(mp) => Some(mp),
                    geo::Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p])),
                    _ => {
                        warn!(%geoid, "Keeping block group with non-polygon geometry as null");
                        None
                    }
                }
            }
            None => {
                warn!(%geoid, "Keeping block group without geometry");
                None
            }
        };

        out.push((
            geoid,
            TigerRecord {
                aland: prop("ALAND").and_then(json_number),
                awater: prop("AWATER").and_then(json_number),
                intptlat: prop("INTPTLAT").and_then(json_number),
                intptlon: prop("INTPTLON").and_then(json_number),
                geometry,
            },
        ));
    }

    Ok(out)
}

fn field_text(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format!("{:.0}", n)),
        FieldValue::Integer(i) => Some(i.to_string()),
        _ => None,
    }
}

fn field_number(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Numeric(n) => *n,
        FieldValue::Float(f) => f.map(f64::from),
        FieldValue::Double(d) => Some(*d),
        FieldValue::Integer(i) => Some(f64::from(*i)),
        FieldValue::Character(Some(s)) => parse_signed(s),
        _ => None,
    }
}

fn json_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn json_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => parse_signed(s),
        _ => None,
    }
}

/// TIGER stores interior points as text such as `+40.1234567`.
fn parse_signed(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let unsigned = trimmed.strip_prefix('+').unwrap_or(trimmed);
    unsigned.parse().ok()
}
