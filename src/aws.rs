use std::path::Path;

use anyhow::Result;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::errors::EtlError;

pub async fn load_sdk_config() -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(crate::config::AWS_REGION))
        .load()
        .await
}

pub fn make_s3_client(config: &SdkConfig) -> aws_sdk_s3::Client {
    aws_sdk_s3::Client::new(config)
}

pub fn make_ssm_client(config: &SdkConfig) -> aws_sdk_ssm::Client {
    aws_sdk_ssm::Client::new(config)
}

/// Fetch a decrypted parameter from SSM.
pub async fn get_parameter(client: &aws_sdk_ssm::Client, name: &str) -> Result<String> {
    let resp = client
        .get_parameter()
        .name(name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|err| {
            let service_err = err.into_service_error();
            if service_err.is_parameter_not_found() {
                anyhow::Error::from(EtlError::ConfigNotFound(name.to_string()))
            } else {
                anyhow::Error::from(service_err)
            }
        })?;

    let value = resp
        .parameter()
        .and_then(|p| p.value())
        .ok_or_else(|| EtlError::ConfigNotFound(name.to_string()))?;

    Ok(value.to_string())
}

/// Download one object to a local file, streaming the body chunk by chunk.
/// Returns Ok(false) when the object does not exist; the caller decides
/// whether that is fatal. No retries.
pub async fn download_object(
    client: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    local_path: &Path,
) -> Result<bool> {
    let resp = match client.get_object().bucket(bucket).key(key).send().await {
        Ok(resp) => resp,
        Err(err) => {
            let service_err = err.into_service_error();
            if service_err.is_no_such_key() {
                warn!("object {key} not found in bucket {bucket}");
                return Ok(false);
            }
            return Err(service_err.into());
        }
    };

    let mut file = tokio::fs::File::create(local_path).await?;
    let mut body = resp.body;
    while let Some(bytes) = body.try_next().await? {
        file.write_all(&bytes).await?;
    }
    file.flush().await?;

    info!("downloaded {key}");
    Ok(true)
}
