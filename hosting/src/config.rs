use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use sitehost_aws_core::{
    config::{AwsConfig, AwsServiceConfig, TimeoutConfig, verify_sts_account_id},
    util::RON,
};

use crate::bucket::BucketRetryPolicy;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms:     u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = BucketRetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            delay_ms:     policy.delay.as_millis() as u64,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> BucketRetryPolicy {
        BucketRetryPolicy {
            max_attempts: self.max_attempts,
            delay:        Duration::from_millis(self.delay_ms),
        }
    }
}

/// One deployed site. The bucket is configured when `bucket` is set; the security headers function is
/// associated when both `institution` and `domain_name` are set.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct SiteTarget {
    pub bucket:        Option<String>,
    pub bucket_region: Option<String>,
    pub institution:   Option<String>,
    pub domain_name:   Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct HostingConfig {
    pub account_id:     Option<String>,
    pub endpoint_url:   Option<String>,
    pub timeout_config: Option<TimeoutConfig>,
    pub sts_region:     String,
    pub region:         String,
    pub bucket_retry:   RetrySettings,
    pub sites:          Vec<SiteTarget>,
}

impl From<AwsConfig> for HostingConfig {
    fn from(value: AwsConfig) -> Self {
        Self {
            account_id:     value.account_id,
            endpoint_url:   value.endpoint_url,
            timeout_config: value.timeout_config,
            sts_region:     value.sts_region,
            region:         value.region,
            bucket_retry:   RetrySettings::default(),
            sites:          Vec::new(),
        }
    }
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self::from(AwsConfig::default())
    }
}

impl AwsServiceConfig for HostingConfig {
    async fn try_load(prefix: &Path) -> anyhow::Result<Self> {
        let config_path = prefix.join("aws/hosting/config.ron");
        if config_path.is_file() {
            tracing::info!("Loading hosting config file at {:?}", config_path);
            let config: HostingConfig = RON.from_str(&std::fs::read_to_string(config_path)?)?;
            Ok(config)
        } else {
            Ok(HostingConfig::from(AwsConfig::try_load(prefix)?))
        }
    }

    async fn verify_sts(&self) -> anyhow::Result<String> {
        verify_sts_account_id(
            self.sts_region.clone(),
            self.account_id.clone(),
            self.endpoint_url.as_deref(),
            self.timeout_config.as_ref(),
        )
        .await
    }
}
