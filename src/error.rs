use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid GEOID '{0}': expected up to 12 digits after any summary level prefix")]
    InvalidGeoid(String),

    #[error("null GEOID in {path:?}, record {record}")]
    NullGeoid { path: PathBuf, record: usize },

    #[error("column '{column}' not found in {path:?}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("ACS layer file not found: {0:?}")]
    MissingLayer(PathBuf),

    #[error("no TIGER/Line block group file for state {fips:02} ({name}) under {dir:?}")]
    MissingState { fips: u8, name: String, dir: PathBuf },

    #[error("duplicate GEOID {geoid} in {source_name}")]
    DuplicateGeoid { geoid: String, source_name: String },

    #[error("unparsable value '{value}' in {path:?}, row {row}, column '{column}'")]
    InvalidValue {
        path: PathBuf,
        row: u64,
        column: String,
        value: String,
    },

    #[error("unsupported geometry format: {0}")]
    UnsupportedFormat(String),
}
