use serde::Deserialize;

/// One row of provincias.csv. Columns beyond the two consumed here are
/// ignored; an empty id deserializes to None and the row is dropped.
#[derive(Debug, Clone, Deserialize)]
pub struct StateRow {
    #[serde(rename = "id")]
    pub state_id: Option<i64>,
    #[serde(rename = "nombre")]
    pub state_name: Option<String>,
}

/// One row of departamentos.csv.
#[derive(Debug, Clone, Deserialize)]
pub struct DepartmentRow {
    #[serde(rename = "id")]
    pub department_id: Option<i64>,
    #[serde(rename = "nombre")]
    pub department_name: Option<String>,
    #[serde(rename = "provincia_id")]
    pub state_id: Option<i64>,
}

/// A cleaned case record bound for the covid19_case table. The case id and
/// age are guaranteed present by the cleaning rules; date fields stay as
/// the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRow {
    pub covid_case_csv_id: i64,
    pub gender_id: Option<String>,
    pub age: i64,
    pub symptoms_start_date: Option<String>,
    pub registration_date: String,
    pub death_date: Option<String>,
    pub respiratory_assistance: Option<String>,
    pub registration_state_id: Option<i64>,
    pub clasification: Option<String>,
    pub residence_state_id: Option<i64>,
    pub diagnosis_date: Option<String>,
    pub residence_department_id: Option<i64>,
    pub last_update: Option<String>,
}
