use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::errors::Result;
use crate::models::{CaseRow, DepartmentRow, StateRow};

/// Rows per INSERT statement. 13 binds each keeps a full batch well under
/// the Postgres bind-parameter cap of 65535.
const INSERT_BATCH_ROWS: usize = 1_000;

/// Removes residual cross-chunk duplicates, keeping the lowest surrogate
/// key per duplicated external id. Idempotent.
const DELETE_DUPLICATE_CASES: &str = "\
DELETE FROM covid19_case a USING (
  SELECT MIN(covid_case_id) AS covid_case_id, covid_case_csv_id
    FROM covid19_case
    GROUP BY covid_case_csv_id HAVING COUNT(*) > 1
  ) b
  WHERE a.covid_case_csv_id = b.covid_case_csv_id
  AND a.covid_case_id <> b.covid_case_id";

/// The job is strictly sequential, so one connection is all it ever uses.
pub async fn connect(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn truncate_tables(pool: &PgPool) -> Result<()> {
    for table in ["state", "department", "covid19_case"] {
        sqlx::query(&format!("TRUNCATE TABLE {table} CASCADE"))
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn insert_states(pool: &PgPool, rows: &[StateRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut builder =
        QueryBuilder::<Postgres>::new("INSERT INTO state (state_id, state_name) ");
    builder.push_values(rows, |mut b, row| {
        b.push_bind(row.state_id).push_bind(row.state_name.as_deref());
    });
    builder.build().execute(pool).await?;
    Ok(())
}

pub async fn insert_departments(pool: &PgPool, rows: &[DepartmentRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let mut builder = QueryBuilder::<Postgres>::new(
        "INSERT INTO department (department_id, department_name, state_id) ",
    );
    builder.push_values(rows, |mut b, row| {
        b.push_bind(row.department_id)
            .push_bind(row.department_name.as_deref())
            .push_bind(row.state_id);
    });
    builder.build().execute(pool).await?;
    Ok(())
}

/// Append one cleaned chunk, atomically: all sub-batches run inside a
/// single transaction.
pub async fn append_cases(pool: &PgPool, rows: &[CaseRow]) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for batch in rows.chunks(INSERT_BATCH_ROWS) {
        let mut builder = QueryBuilder::<Postgres>::new(
            "INSERT INTO covid19_case (covid_case_csv_id, gender_id, age, \
             symptoms_start_date, registration_date, death_date, \
             respiratory_assistance, registration_state_id, clasification, \
             residence_state_id, diagnosis_date, residence_department_id, \
             last_update) ",
        );
        builder.push_values(batch, |mut b, row| {
            b.push_bind(row.covid_case_csv_id)
                .push_bind(row.gender_id.as_deref())
                .push_bind(row.age)
                .push_bind(row.symptoms_start_date.as_deref())
                .push_bind(row.registration_date.as_str())
                .push_bind(row.death_date.as_deref())
                .push_bind(row.respiratory_assistance.as_deref())
                .push_bind(row.registration_state_id)
                .push_bind(row.clasification.as_deref())
                .push_bind(row.residence_state_id)
                .push_bind(row.diagnosis_date.as_deref())
                .push_bind(row.residence_department_id)
                .push_bind(row.last_update.as_deref());
        });
        builder.build().execute(&mut *tx).await?;
    }
    tx.commit().await?;

    Ok(())
}

pub async fn delete_duplicate_cases(pool: &PgPool) -> Result<()> {
    sqlx::query(DELETE_DUPLICATE_CASES).execute(pool).await?;
    Ok(())
}
