use blockgroup_demographics::config::AppConfig;
use blockgroup_demographics::pipeline;
use blockgroup_demographics::validate::validate_outputs;
use blockgroup_demographics::variables::{self, VARIABLES};
use serde_json::json;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const BLOCK_GROUPS: [&str; 3] = ["010010201001", "010010201002", "020130001001"];

/// Bases large enough to keep every rate within [0, 1].
const BASES: [(&str, f64); 4] = [
    ("B01001e2", 100.0),
    ("B01001e26", 100.0),
    ("B15003e1", 100.0),
    ("B19001e1", 100.0),
];

/// Every estimate is 10 apart from the bases and per-GEOID overrides.
fn write_acs(dir: &Path, overrides: &HashMap<&str, Vec<(&str, f64)>>) {
    let mut base = String::from("GEOID,NAME\n");
    for geoid in BLOCK_GROUPS {
        base.push_str(&format!("15000US{},Block Group\n", geoid));
    }
    fs::write(dir.join("ACS_2019_5YR_BG.csv"), base).unwrap();

    for layer in variables::layers() {
        let vars = variables::layer_variables(layer);
        let mut content = String::from("GEOID");
        for v in &vars {
            content.push(',');
            content.push_str(v.code);
        }
        content.push('\n');
        for geoid in BLOCK_GROUPS {
            content.push_str(&format!("15000US{}", geoid));
            for v in &vars {
                let value = overrides
                    .get(geoid)
                    .and_then(|o| o.iter().find(|(code, _)| *code == v.code))
                    .or_else(|| BASES.iter().find(|(code, _)| *code == v.code))
                    .map(|(_, value)| *value)
                    .unwrap_or(10.0);
                content.push_str(&format!(",{}", value));
            }
            content.push('\n');
        }
        fs::write(dir.join(format!("{}.csv", layer)), content).unwrap();
    }
}

fn feature(geoid: &str, x: f64, aland: f64) -> serde_json::Value {
    json!({
        "type": "Feature",
        "geometry": {
            "type": "Polygon",
            "coordinates": [[[x, 0.0], [x + 1.0, 0.0], [x + 1.0, 1.0], [x, 1.0], [x, 0.0]]]
        },
        "properties": {
            "GEOID": geoid,
            "ALAND": aland,
            "AWATER": 0,
            "INTPTLAT": "+00.5",
            "INTPTLON": format!("{:+.1}", x + 0.5)
        }
    })
}

fn write_tiger(dir: &Path, fips: u8, features: Vec<serde_json::Value>) {
    let fc = json!({ "type": "FeatureCollection", "features": features });
    fs::write(
        dir.join(format!("tl_2019_{:02}_bg.geojson", fips)),
        fc.to_string(),
    )
    .unwrap();
}

fn setup(root: &Path, geometry_format: &str, compress: bool) -> AppConfig {
    let acs_dir = root.join("acs");
    let tiger_dir = root.join("tiger");
    fs::create_dir_all(&acs_dir).unwrap();
    fs::create_dir_all(&tiger_dir).unwrap();

    let mut overrides = HashMap::new();
    // Zero race basis makes MinorityRate undefined
    overrides.insert("010010201002", vec![("B02001e1", 0.0), ("B02001e2", 0.0)]);
    overrides.insert("020130001001", vec![("B01001e1", 400.0), ("B02001e2", 5.0)]);
    write_acs(&acs_dir, &overrides);

    write_tiger(
        &tiger_dir,
        1,
        vec![
            feature("010010201001", 0.0, 1000.0),
            feature("010010201002", 2.0, 0.0),
        ],
    );
    write_tiger(&tiger_dir, 2, vec![feature("020130001001", 4.0, 200.0)]);

    let states = root.join("states.csv");
    fs::write(&states, "StateFIPS,CensusName\n1,Alabama\n2,Alaska\n60,\n").unwrap();

    AppConfig::from_toml(&format!(
        r#"
year = 2019

[input]
acs_dir = {:?}
tiger_dir = {:?}
states_csv = {:?}

[output]
dir = {:?}
compress_csv = {}
geometry_format = "{}"
"#,
        acs_dir,
        tiger_dir,
        states,
        root.join("out"),
        compress,
        geometry_format
    ))
    .unwrap()
}

fn read_rows(path: &Path) -> Vec<HashMap<String, String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    let headers = rdr.headers().unwrap().clone();
    rdr.records()
        .map(|r| {
            let record = r.unwrap();
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect()
        })
        .collect()
}

#[test]
fn test_full_pipeline() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), "pickle", false);

    let summary = pipeline::run(&config).unwrap();
    assert_eq!(summary.join.rows, 3);
    assert_eq!(summary.join.matched, 3);
    assert_eq!(summary.tiger_block_groups, 3);
    assert_eq!(summary.with_geometry, 3);
    assert!(summary
        .paths
        .demographics
        .ends_with("2019blockgroupdemographics.csv"));
    assert!(summary
        .paths
        .geometry
        .ends_with("2019blockgroupdemographics-geometry.pkl"));
    assert!(summary.paths.catalog.exists());

    let rows = read_rows(&summary.paths.demographics);
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].len(), 1 + VARIABLES.len() + 4 + 11);

    let first = &rows[0];
    assert_eq!(first["GEOID"], "010010201001");
    assert_eq!(first["ALAND"], "1000");
    assert_eq!(first["INTPTLAT"], "0.5");
    assert_eq!(first["PopDensity"], "0.01");
    assert_eq!(first["MinorityRate"], "0");
    assert_eq!(first["EmploymentRate"], "1");

    // Zero denominators leave the cell empty
    let second = &rows[1];
    assert_eq!(second["MinorityRate"], "");
    assert_eq!(second["PopDensity"], "");
    assert_eq!(second["logLand"], "");

    let third = &rows[2];
    assert_eq!(third["GEOID"], "020130001001");
    assert_eq!(third["PopDensity"], "2");
    assert_eq!(third["MinorityRate"], "0.5");

    let report = validate_outputs(&config, Some(3)).unwrap();
    assert!(report.is_clean(), "{:?}", report);
}

#[test]
fn test_geojson_and_gzip_outputs_validate() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), "geojson", true);

    let summary = pipeline::run(&config).unwrap();
    assert!(summary
        .paths
        .demographics
        .ends_with("2019blockgroupdemographics.csv.gz"));
    assert!(summary
        .paths
        .geometry
        .ends_with("2019blockgroupdemographics-geometry.geojson"));

    let report = validate_outputs(&config, None).unwrap();
    assert!(report.is_clean(), "{:?}", report);
    assert_eq!(report.rows, 3);
}

#[test]
fn test_validation_reports_row_count_mismatch() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), "pickle", false);
    pipeline::run(&config).unwrap();

    let report = validate_outputs(&config, Some(4)).unwrap();
    assert_eq!(report.row_count_mismatch, Some((4, 3)));
    assert!(!report.is_clean());
}

#[test]
fn test_missing_state_file_fails_build() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), "pickle", false);
    fs::remove_file(config.input.tiger_dir.join("tl_2019_02_bg.geojson")).unwrap();

    let err = pipeline::run(&config).unwrap_err();
    assert!(err.to_string().contains("state 02"), "{}", err);
}

#[test]
fn test_block_group_without_geometry_is_published() {
    let dir = tempdir().unwrap();
    let config = setup(dir.path(), "pickle", false);
    let mut shapeless = feature("020130001001", 4.0, 200.0);
    shapeless["geometry"] = serde_json::Value::Null;
    write_tiger(&config.input.tiger_dir, 2, vec![shapeless]);

    let summary = pipeline::run(&config).unwrap();
    assert_eq!(summary.tiger_block_groups, 3);
    assert_eq!(summary.join.rows, 3);
    assert_eq!(summary.with_geometry, 2);

    let rows = read_rows(&summary.paths.demographics);
    assert_eq!(rows[2]["GEOID"], "020130001001");
    assert_eq!(rows[2]["ALAND"], "200");

    let report = validate_outputs(&config, Some(3)).unwrap();
    assert!(report.is_clean(), "{:?}", report);
}
