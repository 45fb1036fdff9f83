use std::{path::Path, time::Duration};

use anyhow::bail;
use aws_config::{BehaviorVersion, Region, SdkConfig, meta::region::RegionProviderChain};
use serde::{Deserialize, Serialize};

use crate::util::RON;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    pub connect_timeout_secs:   u64,
    pub operation_timeout_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs:   30,
            operation_timeout_secs: 30,
        }
    }
}

impl TimeoutConfig {
    pub fn to_sdk(&self) -> aws_config::timeout::TimeoutConfig {
        let operation = Duration::from_secs(self.operation_timeout_secs);
        aws_config::timeout::TimeoutConfig::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .operation_timeout(operation)
            .operation_attempt_timeout(operation)
            .read_timeout(operation)
            .build()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AwsConfig {
    pub account_id:     Option<String>,
    pub endpoint_url:   Option<String>,
    pub timeout_config: Option<TimeoutConfig>,
    pub sts_region:     String,
    pub region:         String,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            account_id:     Default::default(),
            endpoint_url:   Default::default(),
            timeout_config: Default::default(),
            sts_region:     String::from("us-east-1"),
            region:         String::from("us-east-1"),
        }
    }
}

impl AwsConfig {
    pub fn try_load(prefix: &Path) -> anyhow::Result<AwsConfig> {
        let config_path = prefix.join("aws/config.ron");
        if config_path.is_file() {
            tracing::info!("Loading AWS config file at {:?}", config_path);
            let config: AwsConfig = RON.from_str(&std::fs::read_to_string(config_path)?)?;
            Ok(config)
        } else {
            tracing::info!("AWS config file at {:?} not present, using defaults.", config_path);
            Ok(AwsConfig::default())
        }
    }
}

/// Builds an SDK config for `region`, applying the configured timeouts and endpoint override.
pub async fn load_sdk_config(region: &str, endpoint_url: Option<&str>, timeout_config: Option<&TimeoutConfig>) -> SdkConfig {
    let region = RegionProviderChain::first_try(Region::new(region.to_owned()));

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .timeout_config(timeout_config.cloned().unwrap_or_default().to_sdk());

    if let Some(endpoint_url) = endpoint_url {
        loader = loader.endpoint_url(endpoint_url);
    }

    loader.load().await
}

pub async fn verify_sts_account_id(
    sts_region: String,
    account_id: Option<String>,
    endpoint_url: Option<&str>,
    timeout_config: Option<&TimeoutConfig>,
) -> anyhow::Result<String> {
    let sts_config = load_sdk_config(&sts_region, endpoint_url, timeout_config).await;

    let sts_client = aws_sdk_sts::Client::new(&sts_config);
    let caller_identity = sts_client.get_caller_identity().send().await;

    match caller_identity {
        Ok(caller_identity) => {
            let Some(caller_account_id) = caller_identity.account else {
                bail!("Failed to get current account ID!");
            };

            check_account_id(&caller_account_id, account_id.as_deref())?;
            Ok(caller_account_id)
        }
        Err(e) => {
            tracing::error!("Failed to call sts:GetCallerIdentity: {}", e);
            Err(e.into())
        }
    }
}

fn check_account_id(caller_account_id: &str, account_id: Option<&str>) -> anyhow::Result<()> {
    if let Some(account_id) = account_id
        && caller_account_id != account_id {
            bail!(
                "AWS: Account ID mismatch. Configured to use account ID {account_id}, \nbut credentials provided are for account ID {caller_account_id}."
            )
        }
    Ok(())
}

pub trait AwsServiceConfig: Sized {
    async fn try_load(prefix: &Path) -> anyhow::Result<Self>;
    async fn verify_sts(&self) -> anyhow::Result<String>;
}
