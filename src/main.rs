mod archive;
mod aws;
mod config;
mod csvchunker;
mod db;
mod errors;
mod models;
mod refdata;
mod transform;

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Result};
use tracing::{debug, info};

use crate::config::{
    Config, CASES_ARCHIVE_OBJECT, CASES_FILE, CHUNK_ROWS, DATA_DIR, DEPARTMENTS_OBJECT,
    STATES_OBJECT, TARGET_YEAR,
};
use crate::csvchunker::CsvChunkReader;
use crate::transform::Projection;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let start_time = Instant::now();

    info!("loading configuration from the parameter store");
    let sdk_config = aws::load_sdk_config().await;
    let ssm = aws::make_ssm_client(&sdk_config);
    let s3 = aws::make_s3_client(&sdk_config);
    let config = Config::load(&ssm).await?;

    std::fs::create_dir_all(DATA_DIR)?;

    info!("downloading source datasets");
    for key in [STATES_OBJECT, DEPARTMENTS_OBJECT, CASES_ARCHIVE_OBJECT] {
        let local = Path::new(DATA_DIR).join(key);
        if !aws::download_object(&s3, &config.s3_bucket, key, &local).await? {
            bail!("required object {key} missing from bucket {}", config.s3_bucket);
        }
    }

    info!("extracting {CASES_ARCHIVE_OBJECT}");
    archive::extract_zip(
        &Path::new(DATA_DIR).join(CASES_ARCHIVE_OBJECT),
        Path::new(DATA_DIR),
    )?;

    info!("connecting to the database");
    let pool = db::connect(&config.database_url()).await?;

    info!("truncating target tables");
    db::truncate_tables(&pool).await?;

    info!("loading the state table");
    let states = refdata::read_states(&Path::new(DATA_DIR).join(STATES_OBJECT))?;
    db::insert_states(&pool, &states).await?;
    info!("loaded {} states", states.len());

    info!("loading the department table");
    let departments = refdata::read_departments(&Path::new(DATA_DIR).join(DEPARTMENTS_OBJECT))?;
    db::insert_departments(&pool, &departments).await?;
    info!("loaded {} departments", departments.len());

    info!("transforming and loading case records");
    let mut chunker = CsvChunkReader::open(&Path::new(DATA_DIR).join(CASES_FILE), CHUNK_ROWS)?;
    let projection = Projection::from_headers(chunker.headers())?;

    let mut total_kept = 0usize;
    while let Some(chunk) = chunker.next_chunk()? {
        let rows = transform::clean_chunk(&projection, &chunk, TARGET_YEAR)?;
        db::append_cases(&pool, &rows).await?;
        total_kept += rows.len();
        debug!("chunk: {} read, {} kept", chunk.len(), rows.len());
    }
    info!("loaded {total_kept} case records");

    info!("deleting duplicate case records");
    db::delete_duplicate_cases(&pool).await?;

    info!("completed in {:?}", start_time.elapsed());
    Ok(())
}
