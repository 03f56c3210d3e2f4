use std::io::Read;

use serde::Serialize;

use super::error::TypeError;

/*
Ingredient catalog import format

name                  measurement_unit
абрикосовое варенье,г
агар-агар,г
вода,стакан
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientRecord {
    pub name: String,
    pub measurement_unit: String,
}

impl TryFrom<&csv::StringRecord> for IngredientRecord {
    type Error = TypeError;

    fn try_from(record: &csv::StringRecord) -> Result<Self, Self::Error> {
        if record.len() != 2 {
            return Err(TypeError::new("Invalid syntax; Expected name and unit"));
        }
        let name = record.get(0).unwrap_or("").trim();
        let measurement_unit = record.get(1).unwrap_or("").trim();

        if name.is_empty() {
            return Err(TypeError::new("Invalid syntax; Empty name"));
        }
        if measurement_unit.is_empty() {
            return Err(TypeError::new("Invalid syntax; Empty unit"));
        }

        Ok(Self {
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        })
    }
}

/// Reads headerless `name,measurement_unit` rows. Blank lines are skipped.
pub fn parse_ingredients<R: Read>(reader: R) -> Result<Vec<IngredientRecord>, TypeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = vec![];
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| TypeError::new(&format!("Line {}: {e}", i + 1)))?;
        let record = IngredientRecord::try_from(&row)
            .map_err(|e| TypeError::new(&format!("Line {}: {e}", i + 1)))?;
        records.push(record);
    }

    Ok(records)
}
