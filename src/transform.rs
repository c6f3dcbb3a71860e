use std::collections::HashSet;

use csv::StringRecord;

use crate::errors::{EtlError, Result};
use crate::models::CaseRow;

/// Source column and the sink column it loads into, in sink column order.
pub const CASE_COLUMNS: [(&str, &str); 13] = [
    ("id_evento_caso", "covid_case_csv_id"),
    ("sexo", "gender_id"),
    ("edad", "age"),
    ("fecha_inicio_sintomas", "symptoms_start_date"),
    ("fecha_apertura", "registration_date"),
    ("fecha_fallecimiento", "death_date"),
    ("asistencia_respiratoria_mecanica", "respiratory_assistance"),
    ("carga_provincia_id", "registration_state_id"),
    ("clasificacion_resumen", "clasification"),
    ("residencia_provincia_id", "residence_state_id"),
    ("fecha_diagnostico", "diagnosis_date"),
    ("residencia_departamento_id", "residence_department_id"),
    ("ultima_actualizacion", "last_update"),
];

const COL_CSV_ID: usize = 0;
const COL_GENDER: usize = 1;
const COL_AGE: usize = 2;
const COL_SYMPTOMS_DATE: usize = 3;
const COL_REGISTRATION_DATE: usize = 4;
const COL_DEATH_DATE: usize = 5;
const COL_RESPIRATORY: usize = 6;
const COL_REGISTRATION_STATE: usize = 7;
const COL_CLASIFICATION: usize = 8;
const COL_RESIDENCE_STATE: usize = 9;
const COL_DIAGNOSIS_DATE: usize = 10;
const COL_RESIDENCE_DEPARTMENT: usize = 11;
const COL_LAST_UPDATE: usize = 12;

/// Positions of the consumed columns in the source header. Built once,
/// before the first chunk, so a column missing from the file fails the run
/// up front instead of silently loading empty values.
#[derive(Debug, Clone)]
pub struct Projection {
    indices: [usize; CASE_COLUMNS.len()],
}

impl Projection {
    pub fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut indices = [0usize; CASE_COLUMNS.len()];
        for (slot, (source, _)) in CASE_COLUMNS.iter().enumerate() {
            indices[slot] = headers
                .iter()
                .position(|h| h == *source)
                .ok_or_else(|| EtlError::MissingColumn((*source).to_string()))?;
        }
        Ok(Self { indices })
    }

    /// Field for a column slot; empty fields count as missing.
    fn get<'r>(&self, record: &'r StringRecord, slot: usize) -> Option<&'r str> {
        record
            .get(self.indices[slot])
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }
}

/// Clean one chunk of raw records. Rules apply per record, in order:
/// drop records with no case id, keep only the target reporting year,
/// keep the first occurrence of each case id, drop registration state 0,
/// drop records with no age, coerce age to an integer.
///
/// A present but unparseable integer aborts the whole run rather than
/// dropping the record.
pub fn clean_chunk(
    projection: &Projection,
    records: &[StringRecord],
    target_year: &str,
) -> Result<Vec<CaseRow>> {
    let mut seen = HashSet::new();
    let mut rows = Vec::new();

    for record in records {
        let Some(csv_id_raw) = projection.get(record, COL_CSV_ID) else {
            continue;
        };
        let covid_case_csv_id = parse_int(COL_CSV_ID, csv_id_raw, record)?;

        let Some(registration_date) = projection.get(record, COL_REGISTRATION_DATE) else {
            continue;
        };
        if !registration_date
            .get(..4)
            .is_some_and(|prefix| prefix == target_year)
        {
            continue;
        }

        // first occurrence in file order wins
        if !seen.insert(covid_case_csv_id) {
            continue;
        }

        let registration_state_id = parse_opt_int(
            COL_REGISTRATION_STATE,
            projection.get(record, COL_REGISTRATION_STATE),
            record,
        )?;
        // state 0 has no row in the state table
        if registration_state_id == Some(0) {
            continue;
        }

        let Some(age_raw) = projection.get(record, COL_AGE) else {
            continue;
        };
        let age = parse_int(COL_AGE, age_raw, record)?;

        rows.push(CaseRow {
            covid_case_csv_id,
            gender_id: projection.get(record, COL_GENDER).map(str::to_string),
            age,
            symptoms_start_date: projection.get(record, COL_SYMPTOMS_DATE).map(str::to_string),
            registration_date: registration_date.to_string(),
            death_date: projection.get(record, COL_DEATH_DATE).map(str::to_string),
            respiratory_assistance: projection.get(record, COL_RESPIRATORY).map(str::to_string),
            registration_state_id,
            clasification: projection.get(record, COL_CLASIFICATION).map(str::to_string),
            residence_state_id: parse_opt_int(
                COL_RESIDENCE_STATE,
                projection.get(record, COL_RESIDENCE_STATE),
                record,
            )?,
            diagnosis_date: projection.get(record, COL_DIAGNOSIS_DATE).map(str::to_string),
            residence_department_id: parse_opt_int(
                COL_RESIDENCE_DEPARTMENT,
                projection.get(record, COL_RESIDENCE_DEPARTMENT),
                record,
            )?,
            last_update: projection.get(record, COL_LAST_UPDATE).map(str::to_string),
        });
    }

    Ok(rows)
}

/// Integer coercion. Integral decimals ("45.0") are accepted because the
/// upstream export routes gap-bearing columns through floats.
fn parse_int(slot: usize, value: &str, record: &StringRecord) -> Result<i64> {
    if let Ok(v) = value.parse::<i64>() {
        return Ok(v);
    }
    if let Ok(f) = value.parse::<f64>() {
        if f.is_finite() && f.fract() == 0.0 {
            return Ok(f as i64);
        }
    }
    Err(EtlError::TypeConversion {
        column: CASE_COLUMNS[slot].1,
        value: value.to_string(),
        line: record.position().map(|p| p.line()).unwrap_or(0),
    })
}

fn parse_opt_int(slot: usize, value: Option<&str>, record: &StringRecord) -> Result<Option<i64>> {
    value.map(|v| parse_int(slot, v, record)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Header covering all 13 source columns, with an extra column mixed in
    /// to exercise the projection.
    fn header() -> StringRecord {
        let mut names: Vec<&str> = vec!["ignored_extra"];
        names.extend(CASE_COLUMNS.iter().map(|(source, _)| *source));
        StringRecord::from(names)
    }

    /// A record in header order: id, age, registration date, state id, plus
    /// fillers for the columns the rules do not touch.
    fn case(id: &str, age: &str, reg_date: &str, reg_state: &str) -> StringRecord {
        StringRecord::from(vec![
            "x", id, "F", age, "2022-01-01", reg_date, "", "NO", reg_state, "Confirmado", "6",
            "2022-01-05", "28", "2022-03-01",
        ])
    }

    fn clean(records: &[StringRecord]) -> Result<Vec<CaseRow>> {
        let projection = Projection::from_headers(&header()).unwrap();
        clean_chunk(&projection, records, "2022")
    }

    #[test]
    fn missing_column_is_rejected_up_front() {
        let headers = StringRecord::from(
            CASE_COLUMNS
                .iter()
                .map(|(source, _)| *source)
                .filter(|source| *source != "edad")
                .collect::<Vec<_>>(),
        );
        match Projection::from_headers(&headers) {
            Err(EtlError::MissingColumn(column)) => assert_eq!(column, "edad"),
            other => panic!("expected missing column error, got {other:?}"),
        }
    }

    #[test]
    fn rules_apply_in_order() {
        let records = vec![
            case("1", "45", "2022-01-01", "5"),
            // duplicate id, dropped by first-wins dedup
            case("1", "50", "2022-02-01", "3"),
            // no age
            case("2", "", "2022-01-01", "1"),
            // wrong year
            case("3", "30", "2021-12-31", "2"),
            // state 0 drops the record before its age is ever read
            case("4", "abc", "2022-01-01", "0"),
        ];

        let rows = clean(&records).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].covid_case_csv_id, 1);
        assert_eq!(rows[0].age, 45);
        assert_eq!(rows[0].registration_state_id, Some(5));
    }

    #[test]
    fn unparseable_age_aborts_the_chunk() {
        let records = vec![
            case("1", "45", "2022-01-01", "5"),
            case("4", "abc", "2022-01-01", "7"),
        ];
        match clean(&records) {
            Err(EtlError::TypeConversion { column, value, .. }) => {
                assert_eq!(column, "age");
                assert_eq!(value, "abc");
            }
            other => panic!("expected conversion error, got {other:?}"),
        }
    }

    #[test]
    fn integral_decimal_age_is_accepted() {
        let rows = clean(&[case("1", "45.0", "2022-01-01", "5")]).unwrap();
        assert_eq!(rows[0].age, 45);

        let result = clean(&[case("2", "45.7", "2022-01-01", "5")]);
        assert!(matches!(result, Err(EtlError::TypeConversion { .. })));
    }

    #[test]
    fn short_registration_date_is_dropped() {
        let rows = clean(&[
            case("1", "45", "202", "5"),
            case("2", "30", "", "5"),
            case("3", "30", "2022", "5"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].covid_case_csv_id, 3);
    }

    #[test]
    fn missing_case_id_is_dropped() {
        let rows = clean(&[
            case("", "45", "2022-01-01", "5"),
            case("9", "45", "2022-01-01", "5"),
        ])
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].covid_case_csv_id, 9);
    }

    #[test]
    fn cleaning_is_idempotent_on_cleaned_output() {
        let records = vec![
            case("1", "45", "2022-01-01", "5"),
            case("1", "50", "2022-02-01", "3"),
            case("2", "31", "2022-06-09", "8"),
            case("3", "30", "2021-12-31", "2"),
        ];
        let rows = clean(&records).unwrap();

        // feed the cleaned rows back through as raw records
        let reinput: Vec<StringRecord> = rows
            .iter()
            .map(|row| {
                case(
                    &row.covid_case_csv_id.to_string(),
                    &row.age.to_string(),
                    &row.registration_date,
                    &row.registration_state_id.unwrap().to_string(),
                )
            })
            .collect();
        let rows_again = clean(&reinput).unwrap();

        assert_eq!(rows.len(), rows_again.len());
        for (a, b) in rows.iter().zip(&rows_again) {
            assert_eq!(a.covid_case_csv_id, b.covid_case_csv_id);
            assert_eq!(a.age, b.age);
            assert_eq!(a.registration_date, b.registration_date);
        }
    }

    #[test]
    fn duplicates_across_chunks_are_kept() {
        // chunk-local dedup only; the post-load DELETE owns the rest
        let first = clean(&[case("7", "20", "2022-01-01", "5")]).unwrap();
        let second = clean(&[case("7", "21", "2022-02-02", "5")]).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].covid_case_csv_id, second[0].covid_case_csv_id);
    }

    #[test]
    fn chunked_file_reads_end_to_end() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let mut names: Vec<&str> = vec!["ignored_extra"];
        names.extend(CASE_COLUMNS.iter().map(|(source, _)| *source));
        writeln!(file, "{}", names.join(",")).unwrap();
        for (id, age, date, state) in [
            ("1", "45", "2022-01-01", "5"),
            ("2", "", "2022-01-01", "1"),
            ("3", "30", "2021-12-31", "2"),
            ("4", "62", "2022-04-04", "9"),
            ("1", "50", "2022-02-01", "3"),
        ] {
            writeln!(
                file,
                "x,{id},F,{age},2022-01-01,{date},,NO,{state},Confirmado,6,2022-01-05,28,2022-03-01"
            )
            .unwrap();
        }
        file.flush().unwrap();

        let mut chunker = crate::csvchunker::CsvChunkReader::open(file.path(), 2).unwrap();
        let projection = Projection::from_headers(chunker.headers()).unwrap();

        let mut kept = Vec::new();
        while let Some(chunk) = chunker.next_chunk().unwrap() {
            assert!(chunk.len() <= 2);
            kept.extend(clean_chunk(&projection, &chunk, "2022").unwrap());
        }

        // ids 1 and 4 pass; the duplicate id 1 lands in a later chunk, so
        // chunk-local dedup keeps it too
        let ids: Vec<i64> = kept.iter().map(|r| r.covid_case_csv_id).collect();
        assert_eq!(ids, vec![1, 4, 1]);
    }
}
