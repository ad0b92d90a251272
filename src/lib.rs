//! Block group demographics: ACS 5-Year estimates joined to TIGER/Line shapes.
//!
//! The pipeline reads both Census Bureau publications for one vintage year,
//! joins them on the 12-digit block group GEOID, adds derived rate columns and
//! writes a demographics CSV plus a separate geometry file.

pub mod acs;
pub mod combine;
pub mod config;
pub mod derive;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod tiger;
pub mod types;
pub mod validate;
pub mod variables;
