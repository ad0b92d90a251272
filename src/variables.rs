//! Catalog of the ACS 5-Year variables carried into the publication.
//!
//! Codes follow the geodatabase naming (`B01001e2` is estimate 2 of table
//! B01001). Each code lives in one layer; layers are read as separate files.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct AcsVariable {
    pub code: &'static str,
    pub layer: &'static str,
    pub description: &'static str,
}

impl AcsVariable {
    const fn new(code: &'static str, layer: &'static str, description: &'static str) -> Self {
        Self {
            code,
            layer,
            description,
        }
    }
}

pub const VARIABLES: &[AcsVariable] = &[
    AcsVariable::new("B01003e1", "X01_AGE_AND_SEX", "Population total"),
    AcsVariable::new("B01001e1", "X01_AGE_AND_SEX", "Population total (within Age Sex)"),
    AcsVariable::new("B01001e2", "X01_AGE_AND_SEX", "Male"),
    AcsVariable::new("B01001e3", "X01_AGE_AND_SEX", "Male Under 5 years"),
    AcsVariable::new("B01001e4", "X01_AGE_AND_SEX", "Male 5 to 9 years"),
    AcsVariable::new("B01001e5", "X01_AGE_AND_SEX", "Male 10 to 14 years"),
    AcsVariable::new("B01001e6", "X01_AGE_AND_SEX", "Male 15 to 17 years"),
    AcsVariable::new("B01001e7", "X01_AGE_AND_SEX", "Male 18 and 19 years"),
    AcsVariable::new("B01001e8", "X01_AGE_AND_SEX", "Male 20 years"),
    AcsVariable::new("B01001e9", "X01_AGE_AND_SEX", "Male 21 years"),
    AcsVariable::new("B01001e10", "X01_AGE_AND_SEX", "Male 22 to 24 years"),
    AcsVariable::new("B01001e11", "X01_AGE_AND_SEX", "Male 25 to 29 years"),
    AcsVariable::new("B01001e12", "X01_AGE_AND_SEX", "Male 30 to 34 years"),
    AcsVariable::new("B01001e13", "X01_AGE_AND_SEX", "Male 35 to 39 years"),
    AcsVariable::new("B01001e14", "X01_AGE_AND_SEX", "Male 40 to 44 years"),
    AcsVariable::new("B01001e15", "X01_AGE_AND_SEX", "Male 45 to 49 years"),
    AcsVariable::new("B01001e16", "X01_AGE_AND_SEX", "Male 50 to 54 years"),
    AcsVariable::new("B01001e17", "X01_AGE_AND_SEX", "Male 55 to 59 years"),
    AcsVariable::new("B01001e18", "X01_AGE_AND_SEX", "Male 60 and 61 years"),
    AcsVariable::new("B01001e19", "X01_AGE_AND_SEX", "Male 62 to 64 years"),
    AcsVariable::new("B01001e20", "X01_AGE_AND_SEX", "Male 65 and 66 years"),
    AcsVariable::new("B01001e21", "X01_AGE_AND_SEX", "Male 67 to 69 years"),
    AcsVariable::new("B01001e22", "X01_AGE_AND_SEX", "Male 70 to 74 years"),
    AcsVariable::new("B01001e23", "X01_AGE_AND_SEX", "Male 75 to 79 years"),
    AcsVariable::new("B01001e24", "X01_AGE_AND_SEX", "Male 80 to 84 years"),
    AcsVariable::new("B01001e25", "X01_AGE_AND_SEX", "Male 85 years and over"),
    AcsVariable::new("B01001e26", "X01_AGE_AND_SEX", "Female"),
    AcsVariable::new("B01001e27", "X01_AGE_AND_SEX", "Female Under 5 years"),
    AcsVariable::new("B01001e28", "X01_AGE_AND_SEX", "Female 5 to 9 years"),
    AcsVariable::new("B01001e29", "X01_AGE_AND_SEX", "Female 10 to 14 years"),
    AcsVariable::new("B01001e30", "X01_AGE_AND_SEX", "Female 15 to 17 years"),
    AcsVariable::new("B01001e31", "X01_AGE_AND_SEX", "Female 18 and 19 years"),
    AcsVariable::new("B01001e32", "X01_AGE_AND_SEX", "Female 20 years"),
    AcsVariable::new("B01001e33", "X01_AGE_AND_SEX", "Female 21 years"),
    AcsVariable::new("B01001e34", "X01_AGE_AND_SEX", "Female 22 to 24 years"),
    AcsVariable::new("B01001e35", "X01_AGE_AND_SEX", "Female 25 to 29 years"),
    AcsVariable::new("B01001e36", "X01_AGE_AND_SEX", "Female 30 to 34 years"),
    AcsVariable::new("B01001e37", "X01_AGE_AND_SEX", "Female 35 to 39 years"),
    AcsVariable::new("B01001e38", "X01_AGE_AND_SEX", "Female 40 to 44 years"),
    AcsVariable::new("B01001e39", "X01_AGE_AND_SEX", "Female 45 to 49 years"),
    AcsVariable::new("B01001e40", "X01_AGE_AND_SEX", "Female 50 to 54 years"),
    AcsVariable::new("B01001e41", "X01_AGE_AND_SEX", "Female 55 to 59 years"),
    AcsVariable::new("B01001e42", "X01_AGE_AND_SEX", "Female 60 and 61 years"),
    AcsVariable::new("B01001e43", "X01_AGE_AND_SEX", "Female 62 to 64 years"),
    AcsVariable::new("B01001e44", "X01_AGE_AND_SEX", "Female 65 and 66 years"),
    AcsVariable::new("B01001e45", "X01_AGE_AND_SEX", "Female 67 to 69 years"),
    AcsVariable::new("B01001e46", "X01_AGE_AND_SEX", "Female 70 to 74 years"),
    AcsVariable::new("B01001e47", "X01_AGE_AND_SEX", "Female 75 to 79 years"),
    AcsVariable::new("B01001e48", "X01_AGE_AND_SEX", "Female 80 to 84 years"),
    AcsVariable::new("B01001e49", "X01_AGE_AND_SEX", "Female 85 years and over"),
    AcsVariable::new("B19013e1", "X19_INCOME", "Median Household Income"),
    AcsVariable::new("B19001e1", "X19_INCOME", "Income basis"),
    AcsVariable::new("B19001e2", "X19_INCOME", "Less than $10,000"),
    AcsVariable::new("B19001e3", "X19_INCOME", "$10,000 to $14,999"),
    AcsVariable::new("B19001e4", "X19_INCOME", "$15,000 to $19,999"),
    AcsVariable::new("B19001e5", "X19_INCOME", "$20,000 to $24,999"),
    AcsVariable::new("B19001e6", "X19_INCOME", "$25,000 to $29,999"),
    AcsVariable::new("B19001e7", "X19_INCOME", "$30,000 to $34,999"),
    AcsVariable::new("B19001e8", "X19_INCOME", "$35,000 to $39,999"),
    AcsVariable::new("B19001e9", "X19_INCOME", "$40,000 to $44,999"),
    AcsVariable::new("B19001e10", "X19_INCOME", "$45,000 to $49,999"),
    AcsVariable::new("B19001e11", "X19_INCOME", "$50,000 to $59,999"),
    AcsVariable::new("B19001e12", "X19_INCOME", "$60,000 to $74,999"),
    AcsVariable::new("B19001e13", "X19_INCOME", "$75,000 to $99,999"),
    AcsVariable::new("B19001e14", "X19_INCOME", "$100,000 to $124,999"),
    AcsVariable::new("B19001e15", "X19_INCOME", "$125,000 to $149,999"),
    AcsVariable::new("B19001e16", "X19_INCOME", "$150,000 to $199,999"),
    AcsVariable::new("B19001e17", "X19_INCOME", "$200,000 or more"),
    AcsVariable::new("B15003e1", "X15_EDUCATIONAL_ATTAINMENT", "Education attainment basis"),
    AcsVariable::new("B15003e2", "X15_EDUCATIONAL_ATTAINMENT", "No schooling completed"),
    AcsVariable::new("B15003e3", "X15_EDUCATIONAL_ATTAINMENT", "Nursery school"),
    AcsVariable::new("B15003e4", "X15_EDUCATIONAL_ATTAINMENT", "Kindergarten"),
    AcsVariable::new("B15003e5", "X15_EDUCATIONAL_ATTAINMENT", "1st grade"),
    AcsVariable::new("B15003e6", "X15_EDUCATIONAL_ATTAINMENT", "2nd grade"),
    AcsVariable::new("B15003e7", "X15_EDUCATIONAL_ATTAINMENT", "3rd grade"),
    AcsVariable::new("B15003e8", "X15_EDUCATIONAL_ATTAINMENT", "4th grade"),
    AcsVariable::new("B15003e9", "X15_EDUCATIONAL_ATTAINMENT", "5th grade"),
    AcsVariable::new("B15003e10", "X15_EDUCATIONAL_ATTAINMENT", "6th grade"),
    AcsVariable::new("B15003e11", "X15_EDUCATIONAL_ATTAINMENT", "7th grade"),
    AcsVariable::new("B15003e12", "X15_EDUCATIONAL_ATTAINMENT", "8th grade"),
    AcsVariable::new("B15003e13", "X15_EDUCATIONAL_ATTAINMENT", "9th grade"),
    AcsVariable::new("B15003e14", "X15_EDUCATIONAL_ATTAINMENT", "10th grade"),
    AcsVariable::new("B15003e15", "X15_EDUCATIONAL_ATTAINMENT", "11th grade"),
    AcsVariable::new("B15003e16", "X15_EDUCATIONAL_ATTAINMENT", "12th grade no diploma"),
    AcsVariable::new("B15003e17", "X15_EDUCATIONAL_ATTAINMENT", "Regular high school diploma"),
    AcsVariable::new("B15003e18", "X15_EDUCATIONAL_ATTAINMENT", "GED or alternative credential"),
    AcsVariable::new("B15003e19", "X15_EDUCATIONAL_ATTAINMENT", "Some college less than 1 year"),
    AcsVariable::new(
        "B15003e20",
        "X15_EDUCATIONAL_ATTAINMENT",
        "Some college 1 or more years no degree",
    ),
    AcsVariable::new("B15003e21", "X15_EDUCATIONAL_ATTAINMENT", "Associates degree"),
    AcsVariable::new("B15003e22", "X15_EDUCATIONAL_ATTAINMENT", "Bachelors degree"),
    AcsVariable::new("B15003e23", "X15_EDUCATIONAL_ATTAINMENT", "Masters degree"),
    AcsVariable::new("B15003e24", "X15_EDUCATIONAL_ATTAINMENT", "Professional school degree"),
    AcsVariable::new("B15003e25", "X15_EDUCATIONAL_ATTAINMENT", "Doctorate degree"),
    AcsVariable::new("B02001e1", "X02_RACE", "Race basis"),
    AcsVariable::new("B02001e2", "X02_RACE", "White alone"),
    AcsVariable::new("B02001e3", "X02_RACE", "Black or African American alone"),
    AcsVariable::new("B02001e4", "X02_RACE", "American Indian and Alaska Native alone"),
    AcsVariable::new("B02001e5", "X02_RACE", "Asian alone"),
    AcsVariable::new("B02001e6", "X02_RACE", "Native Hawaiian and Other Pacific Islander alone"),
    AcsVariable::new("B02001e7", "X02_RACE", "Some other race alone"),
    AcsVariable::new("B02001e8", "X02_RACE", "Two or more races"),
    AcsVariable::new("B03003e1", "X03_HISPANIC_OR_LATINO_ORIGIN", "Hispanic basis"),
    AcsVariable::new("B03003e2", "X03_HISPANIC_OR_LATINO_ORIGIN", "Not Hispanic basis"),
    AcsVariable::new("B03003e3", "X03_HISPANIC_OR_LATINO_ORIGIN", "Hispanic or Latino basis"),
    AcsVariable::new("B11001e1", "X11_HOUSEHOLD_FAMILY_SUBFAMILIES", "Household Type basis"),
    AcsVariable::new("B11001e2", "X11_HOUSEHOLD_FAMILY_SUBFAMILIES", "Family Households"),
    AcsVariable::new("B11001e7", "X11_HOUSEHOLD_FAMILY_SUBFAMILIES", "Nonfamily Households"),
    AcsVariable::new("B23025e1", "X23_EMPLOYMENT_STATUS", "Employment Status basis"),
    AcsVariable::new("B23025e2", "X23_EMPLOYMENT_STATUS", "Employment in the labor force"),
    AcsVariable::new("B23025e7", "X23_EMPLOYMENT_STATUS", "Employment not in the labor force"),
    AcsVariable::new(
        "B09019e1",
        "X09_CHILDREN_HOUSEHOLD_RELATIONSHIP",
        "Household basis for presence of children",
    ),
    AcsVariable::new("B09018e1", "X09_CHILDREN_HOUSEHOLD_RELATIONSHIP", "Presence of children"),
];

/// Distinct layer names, in the order they first appear in the catalog.
pub fn layers() -> Vec<&'static str> {
    let mut seen = Vec::new();
    for var in VARIABLES {
        if !seen.contains(&var.layer) {
            seen.push(var.layer);
        }
    }
    seen
}

pub fn layer_variables(layer: &str) -> Vec<&'static AcsVariable> {
    VARIABLES.iter().filter(|v| v.layer == layer).collect()
}

/// A layer's variables paired with their column position in catalog order.
pub fn layer_positions(layer: &str) -> Vec<(usize, &'static AcsVariable)> {
    VARIABLES
        .iter()
        .enumerate()
        .filter(|(_, v)| v.layer == layer)
        .collect()
}

/// Column position of a variable code in catalog order.
pub fn position(code: &str) -> Option<usize> {
    static INDEX: OnceLock<HashMap<&'static str, usize>> = OnceLock::new();
    INDEX
        .get_or_init(|| {
            VARIABLES
                .iter()
                .enumerate()
                .map(|(i, v)| (v.code, i))
                .collect()
        })
        .get(code)
        .copied()
}

/// Writes the `acsvars.csv` mapping of variable code to description.
pub fn write_catalog(path: &Path) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to create variable catalog: {:?}", path))?;

    writer.write_record(["variable", "layer", "description"])?;
    for var in VARIABLES {
        writer.write_record([var.code, var.layer, var.description])?;
    }
    writer.flush()?;

    info!(path = %path.display(), variables = VARIABLES.len(), "Wrote variable catalog");
    Ok(())
}
