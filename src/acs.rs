use crate::config::AppConfig;
use crate::error::PipelineError;
use crate::types::{AcsTable, Geoid};
use crate::variables::{self, VARIABLES};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const GEOID_COLUMN: &str = "GEOID";

struct LayerData {
    layer: &'static str,
    positions: Vec<usize>,
    rows: HashMap<Geoid, Vec<Option<f64>>>,
}

/// Reads the ACS base geography and left-joins every catalog layer onto it.
pub fn load_demographics(config: &AppConfig) -> Result<AcsTable> {
    let base_path = layer_path(&config.input.acs_dir, &config.acs_base_layer());
    info!(path = %base_path.display(), "Pulling ACS demographics");

    let geoids = read_base_geoids(&base_path)?;
    let mut table = AcsTable::default();
    for geoid in geoids {
        table.rows.insert(geoid, vec![None; VARIABLES.len()]);
    }
    info!(block_groups = table.rows.len(), "Loaded ACS base geography");

    let layers: Vec<LayerData> = variables::layers()
        .into_par_iter()
        .map(|layer| read_layer(&config.input.acs_dir, layer))
        .collect::<Result<_>>()?;

    for layer in layers {
        let mut matched = 0usize;
        let mut dropped = 0usize;
        for (geoid, values) in layer.rows {
            match table.rows.get_mut(&geoid) {
                Some(row) => {
                    for (&pos, value) in layer.positions.iter().zip(values) {
                        row[pos] = value;
                    }
                    matched += 1;
                }
                None => dropped += 1,
            }
        }
        debug!(layer = layer.layer, matched, dropped, "Joined ACS layer");
    }

    Ok(table)
}

fn layer_path(dir: &Path, layer: &str) -> PathBuf {
    dir.join(format!("{}.csv", layer))
}

fn open_layer(path: &Path) -> Result<csv::Reader<File>> {
    if !path.exists() {
        return Err(PipelineError::MissingLayer(path.to_path_buf()).into());
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open ACS layer: {:?}", path))?;
    Ok(ReaderBuilder::new().flexible(false).from_reader(file))
}

fn column_index(headers: &StringRecord, path: &Path, column: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| {
            PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            }
            .into()
        })
}

fn read_base_geoids(path: &Path) -> Result<Vec<Geoid>> {
    let mut rdr = open_layer(path)?;
    let headers = rdr.headers()?.clone();
    let geoid_idx = column_index(&headers, path, GEOID_COLUMN)?;

    let mut seen = HashSet::new();
    for result in rdr.records() {
        let record = result.with_context(|| format!("Malformed row in {:?}", path))?;
        let geoid = Geoid::parse(record.get(geoid_idx).unwrap_or(""))?;
        if !seen.insert(geoid.clone()) {
            return Err(PipelineError::DuplicateGeoid {
                geoid: geoid.to_string(),
                source_name: path.display().to_string(),
            }
            .into());
        }
    }

    let mut geoids: Vec<Geoid> = seen.into_iter().collect();
    geoids.sort();
    Ok(geoids)
}

fn read_layer(dir: &Path, layer: &'static str) -> Result<LayerData> {
    let path = layer_path(dir, layer);
    debug!(layer, path = %path.display(), "Opening layer");

    let mut rdr = open_layer(&path)?;
    let headers = rdr.headers()?.clone();
    let geoid_idx = column_index(&headers, &path, GEOID_COLUMN)?;

    let layer_vars = variables::layer_positions(layer);
    let mut columns = Vec::with_capacity(layer_vars.len());
    let mut positions = Vec::with_capacity(layer_vars.len());
    let mut wanted = Vec::with_capacity(layer_vars.len());
    for (pos, var) in layer_vars {
        columns.push(column_index(&headers, &path, var.code)?);
        positions.push(pos);
        wanted.push(var);
    }

    let mut rows = HashMap::new();
    for (row_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Malformed row in {:?}", path))?;
        let geoid = Geoid::parse(record.get(geoid_idx).unwrap_or(""))?;

        let mut values = Vec::with_capacity(columns.len());
        for (&idx, var) in columns.iter().zip(&wanted) {
            let raw = record.get(idx).unwrap_or("");
            let value = parse_estimate(raw).ok_or_else(|| PipelineError::InvalidValue {
                path: path.clone(),
                row: row_num as u64 + 1,
                column: var.code.to_string(),
                value: raw.to_string(),
            })?;
            values.push(value);
        }

        if rows.insert(geoid.clone(), values).is_some() {
            return Err(PipelineError::DuplicateGeoid {
                geoid: geoid.to_string(),
                source_name: path.display().to_string(),
            }
            .into());
        }
    }

    Ok(LayerData {
        layer,
        positions,
        rows,
    })
}

/// `Some(None)` for a null cell, `None` when the cell is not a number.
pub fn parse_estimate(raw: &str) -> Option<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("na")
        || trimmed.eq_ignore_ascii_case("nan")
    {
        return Some(None);
    }
    trimmed.parse::<f64>().ok().map(Some)
}
