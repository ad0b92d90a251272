use crate::acs;
use crate::combine::{self, JoinStats};
use crate::config::AppConfig;
use crate::output::{self, OutputPaths};
use crate::tiger;
use anyhow::Result;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub year: u16,
    pub paths: OutputPaths,
    pub join: JoinStats,
    pub tiger_block_groups: usize,
    /// Rows whose geometry file entry holds a boundary.
    pub with_geometry: usize,
}

/// Runs extraction, derivation and persistence for one vintage year.
pub fn run(config: &AppConfig) -> Result<BuildSummary> {
    let started = Instant::now();
    info!(year = config.year, "Starting block group build");

    let stage = Instant::now();
    let demographics = acs::load_demographics(config)?;
    info!(elapsed_ms = stage.elapsed().as_millis() as u64, "ACS extraction done");

    let stage = Instant::now();
    let shapes = tiger::load_block_groups(config)?;
    let tiger_block_groups = shapes.rows.len();
    info!(elapsed_ms = stage.elapsed().as_millis() as u64, "TIGER/Line extraction done");

    let stage = Instant::now();
    let (rows, join) = combine::combine_and_derive(demographics, shapes);
    info!(elapsed_ms = stage.elapsed().as_millis() as u64, "Derivation done");

    let paths = output::write_results(config, &rows)?;
    let with_geometry = rows
        .iter()
        .filter(|bg| bg.tiger.as_ref().is_some_and(|t| t.geometry.is_some()))
        .count();

    info!(
        year = config.year,
        rows = join.rows,
        with_geometry,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Build complete"
    );

    Ok(BuildSummary {
        year: config.year,
        paths,
        join,
        tiger_block_groups,
        with_geometry,
    })
}
