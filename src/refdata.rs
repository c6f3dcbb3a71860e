use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use crate::errors::Result;
use crate::models::{DepartmentRow, StateRow};

/// Read the state reference file: keep (id, nombre), drop rows without an
/// id, keep the first occurrence of each id.
pub fn read_states(path: &Path) -> Result<Vec<StateRow>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for result in reader.deserialize::<StateRow>() {
        let row = result?;
        let Some(id) = row.state_id else { continue };
        if !seen.insert(id) {
            continue;
        }
        rows.push(row);
    }

    // the source carries unwieldy official names for these two
    for row in &mut rows {
        match row.state_id {
            Some(94) => row.state_name = Some("Tierra del Fuego".to_string()),
            Some(2) => row.state_name = Some("CABA".to_string()),
            _ => {}
        }
    }

    Ok(rows)
}

/// Read the department reference file: keep (id, nombre, provincia_id),
/// drop rows without an id, keep the first occurrence of each id.
pub fn read_departments(path: &Path) -> Result<Vec<DepartmentRow>> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);

    let mut seen = HashSet::new();
    let mut rows = Vec::new();
    for result in reader.deserialize::<DepartmentRow>() {
        let row = result?;
        let Some(id) = row.department_id else { continue };
        if !seen.insert(id) {
            continue;
        }
        rows.push(row);
    }

    Ok(rows)
}
