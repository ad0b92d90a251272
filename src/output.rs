//! Split-and-persist: demographics to CSV, boundaries to a separate geometry file.

use crate::config::{AppConfig, GeometryFormat};
use crate::derive::Derivation;
use crate::types::BlockGroup;
use crate::variables::{self, VARIABLES};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use wkt::ToWkt;

pub const TIGER_COLUMNS: [&str; 4] = ["ALAND", "AWATER", "INTPTLAT", "INTPTLON"];

#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub demographics: PathBuf,
    pub geometry: PathBuf,
    pub catalog: PathBuf,
}

/// Column-oriented geometry table; `pandas.DataFrame(pickle.load(f))` reads it back.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GeometryColumns {
    #[serde(rename = "GEOID")]
    pub geoid: Vec<String>,
    pub geometry: Vec<Option<String>>,
}

pub fn demographics_header() -> Vec<&'static str> {
    let mut header = Vec::with_capacity(1 + VARIABLES.len() + 4 + Derivation::ALL.len());
    header.push("GEOID");
    header.extend(VARIABLES.iter().map(|v| v.code));
    header.extend(TIGER_COLUMNS);
    header.extend(Derivation::ALL.iter().map(|d| d.column()));
    header
}

pub fn write_results(config: &AppConfig, rows: &[BlockGroup]) -> Result<OutputPaths> {
    fs::create_dir_all(&config.output.dir)
        .with_context(|| format!("Failed to create output directory: {:?}", config.output.dir))?;

    let paths = OutputPaths {
        demographics: config.demographics_path(),
        geometry: config.geometry_path(),
        catalog: config.catalog_path(),
    };

    write_demographics(&paths.demographics, rows, config.output.compress_csv)?;
    match config.output.geometry_format {
        GeometryFormat::Pickle => write_geometry_pickle(&paths.geometry, rows)?,
        GeometryFormat::Geojson => write_geometry_geojson(&paths.geometry, rows)?,
    }
    variables::write_catalog(&paths.catalog)?;

    Ok(paths)
}

pub fn write_demographics(path: &Path, rows: &[BlockGroup], compress: bool) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create demographics file: {:?}", path))?;

    if compress {
        let encoder = write_rows(GzEncoder::new(file, Compression::default()), rows)?;
        encoder.finish()?;
    } else {
        write_rows(BufWriter::new(file), rows)?.flush()?;
    }

    info!(path = %path.display(), rows = rows.len(), "Wrote demographics");
    Ok(())
}

fn write_rows<W: Write>(inner: W, rows: &[BlockGroup]) -> Result<W> {
    let mut writer = WriterBuilder::new().from_writer(inner);
    writer.write_record(demographics_header())?;

    let mut record: Vec<String> = Vec::new();
    for bg in rows {
        record.clear();
        record.push(bg.geoid.to_string());
        for pos in 0..VARIABLES.len() {
            record.push(format_value(bg.acs_value(pos)));
        }
        let tiger = bg.tiger.as_ref();
        record.push(format_value(tiger.and_then(|t| t.aland)));
        record.push(format_value(tiger.and_then(|t| t.awater)));
        record.push(format_value(tiger.and_then(|t| t.intptlat)));
        record.push(format_value(tiger.and_then(|t| t.intptlon)));
        for value in &bg.derived {
            record.push(format_value(*value));
        }
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e.error()))
}

fn format_value(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn geometry_columns(rows: &[BlockGroup]) -> GeometryColumns {
    let mut columns = GeometryColumns::default();
    for bg in rows {
        columns.geoid.push(bg.geoid.to_string());
        columns.geometry.push(
            bg.tiger
                .as_ref()
                .and_then(|t| t.geometry.as_ref())
                .map(|g| g.wkt_string()),
        );
    }
    columns
}

pub fn write_geometry_pickle(path: &Path, rows: &[BlockGroup]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create geometry file: {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let columns = geometry_columns(rows);
    serde_pickle::to_writer(&mut writer, &columns, serde_pickle::SerOptions::new())
        .with_context(|| format!("Failed to pickle geometry: {:?}", path))?;
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Wrote geometry pickle");
    Ok(())
}

pub fn write_geometry_geojson(path: &Path, rows: &[BlockGroup]) -> Result<()> {
    use geojson::{Feature, FeatureCollection, Geometry, JsonObject};

    let features = rows
        .iter()
        .map(|bg| {
            let mut properties = JsonObject::new();
            properties.insert("GEOID".to_string(), bg.geoid.to_string().into());
            Feature {
                bbox: None,
                geometry: bg
                    .tiger
                    .as_ref()
                    .and_then(|t| t.geometry.as_ref())
                    .map(|g| Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let file = File::create(path)
        .with_context(|| format!("Failed to create geometry file: {:?}", path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, &collection)?;
    writer.flush()?;

    info!(path = %path.display(), rows = rows.len(), "Wrote geometry GeoJSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Geoid, TigerRecord};
    use flate2::read::GzDecoder;
    use geo::{polygon, MultiPolygon};
    use std::io::Read;
    use tempfile::tempdir;

    fn rows() -> Vec<BlockGroup> {
        let mut values = vec![None; VARIABLES.len()];
        values[0] = Some(1200.0);
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];
        vec![
            BlockGroup {
                geoid: Geoid::parse("010010201001").unwrap(),
                acs: Some(values),
                tiger: Some(TigerRecord {
                    aland: Some(5000.0),
                    awater: Some(0.0),
                    intptlat: Some(32.5),
                    intptlon: Some(-86.5),
                    geometry: Some(MultiPolygon::new(vec![square])),
                }),
                derived: vec![Some(0.25); Derivation::ALL.len()],
            },
            BlockGroup {
                geoid: Geoid::parse("010010201002").unwrap(),
                acs: None,
                tiger: None,
                derived: vec![None; Derivation::ALL.len()],
            },
        ]
    }

    #[test]
    fn test_header_layout() {
        let header = demographics_header();
        assert_eq!(header[0], "GEOID");
        assert_eq!(header[1], "B01003e1");
        assert_eq!(header[1 + VARIABLES.len()], "ALAND");
        assert_eq!(header.last(), Some(&"logLand"));
        assert_eq!(header.len(), 1 + VARIABLES.len() + 4 + 11);
    }

    #[test]
    fn test_write_demographics_plain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2019blockgroupdemographics.csv");
        write_demographics(&path, &rows(), false).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let records: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][0], "010010201001");
        assert_eq!(&records[0][1], "1200");
        assert_eq!(&records[0][1 + VARIABLES.len()], "5000");
        assert_eq!(&records[0][2 + VARIABLES.len()], "0");
        assert_eq!(&records[0][3 + VARIABLES.len()], "32.5");
        assert_eq!(&records[1][1], "");
    }

    #[test]
    fn test_write_demographics_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("2019blockgroupdemographics.csv.gz");
        write_demographics(&path, &rows(), true).unwrap();

        let mut text = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.starts_with("GEOID,B01003e1,"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_geometry_columns_use_wkt() {
        let columns = geometry_columns(&rows());
        assert_eq!(columns.geoid, vec!["010010201001", "010010201002"]);
        let wkt = columns.geometry[0].as_deref().unwrap();
        assert!(wkt.starts_with("MULTIPOLYGON"));
        assert_eq!(columns.geometry[1], None);
    }

    #[test]
    fn test_pickle_reads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geometry.pkl");
        write_geometry_pickle(&path, &rows()).unwrap();

        let file = File::open(&path).unwrap();
        let columns: GeometryColumns =
            serde_pickle::from_reader(file, serde_pickle::DeOptions::new()).unwrap();
        assert_eq!(columns.geoid.len(), 2);
        assert_eq!(columns.geometry.len(), 2);
    }

    #[test]
    fn test_geojson_keeps_null_geometry() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("geometry.geojson");
        write_geometry_geojson(&path, &rows()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let fc: geojson::FeatureCollection = text
            .parse::<geojson::GeoJson>()
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(fc.features.len(), 2);
        assert!(fc.features[0].geometry.is_some());
        assert!(fc.features[1].geometry.is_none());
    }

    fn shapeless_row() -> BlockGroup {
        BlockGroup {
            geoid: Geoid::parse("010010201003").unwrap(),
            acs: None,
            tiger: Some(TigerRecord {
                aland: Some(5000.0),
                awater: None,
                intptlat: None,
                intptlon: None,
                geometry: None,
            }),
            derived: vec![None; Derivation::ALL.len()],
        }
    }

    #[test]
    fn test_shapeless_tiger_row_writes_null_geometry() {
        let dir = tempdir().unwrap();
        let rows = vec![shapeless_row()];

        let pkl = dir.path().join("geometry.pkl");
        write_geometry_pickle(&pkl, &rows).unwrap();
        let columns: GeometryColumns =
            serde_pickle::from_reader(File::open(&pkl).unwrap(), serde_pickle::DeOptions::new())
                .unwrap();
        assert_eq!(columns.geoid, vec!["010010201003"]);
        assert_eq!(columns.geometry, vec![None]);

        let json = dir.path().join("geometry.geojson");
        write_geometry_geojson(&json, &rows).unwrap();
        let fc: geojson::FeatureCollection = fs::read_to_string(&json)
            .unwrap()
            .parse::<geojson::GeoJson>()
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(fc.features[0].geometry.is_none());

        // Attributes still reach the demographics file
        let csv_path = dir.path().join("demographics.csv");
        write_demographics(&csv_path, &rows, false).unwrap();
        let mut rdr = csv::Reader::from_path(&csv_path).unwrap();
        let record = rdr.records().next().unwrap().unwrap();
        assert_eq!(&record[1 + VARIABLES.len()], "5000");
    }
}
