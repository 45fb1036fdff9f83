use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::bail;
use sitehost_aws_core::{
    config::{AwsServiceConfig, load_sdk_config},
    sleep::TokioSleeper,
};
use tokio::sync::Mutex;

use crate::{
    bucket::configure_bucket_for_hosting,
    config::{HostingConfig, SiteTarget},
    edge_lambda::configure_security_headers_injector_lambda,
};

/// Lambda@Edge functions and CloudFront's control plane both live here.
pub const EDGE_REGION: &str = "us-east-1";

#[derive(Default)]
pub struct HostingDeployer {
    prefix: PathBuf,
    s3_client_cache: Mutex<HashMap<String, Arc<aws_sdk_s3::Client>>>,
    cloudfront_client: Mutex<Option<Arc<aws_sdk_cloudfront::Client>>>,
    lambda_client: Mutex<Option<Arc<aws_sdk_lambda::Client>>>,
    config: Mutex<HostingConfig>,
}

impl HostingDeployer {
    pub fn new(prefix: &Path) -> Self {
        HostingDeployer {
            prefix: prefix.into(),
            ..Default::default()
        }
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        let config = HostingConfig::try_load(&self.prefix).await?;

        let account_id = config.verify_sts().await?;
        tracing::info!("Deploying to AWS account {}", account_id);

        *self.s3_client_cache.lock().await = HashMap::new();
        *self.cloudfront_client.lock().await = None;
        *self.lambda_client.lock().await = None;
        *self.config.lock().await = config;
        Ok(())
    }

    async fn get_or_init_s3_client(&self, region_s: &str) -> anyhow::Result<Arc<aws_sdk_s3::Client>> {
        let config = self.config.lock().await.clone();
        let mut cache = self.s3_client_cache.lock().await;

        if !cache.contains_key(region_s) {
            let sdk_config = load_sdk_config(region_s, config.endpoint_url.as_deref(), config.timeout_config.as_ref()).await;
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(config.endpoint_url.is_some())
                .build();
            cache.insert(region_s.to_string(), Arc::new(aws_sdk_s3::Client::from_conf(s3_config)));
        };

        let Some(client) = cache.get(region_s) else {
            bail!("Failed to get S3 client for region {}", region_s);
        };

        Ok(client.clone())
    }

    async fn get_or_init_cloudfront_client(&self) -> Arc<aws_sdk_cloudfront::Client> {
        let config = self.config.lock().await.clone();
        let mut cached = self.cloudfront_client.lock().await;

        if let Some(client) = cached.as_ref() {
            return client.clone();
        }

        let sdk_config = load_sdk_config(EDGE_REGION, config.endpoint_url.as_deref(), config.timeout_config.as_ref()).await;
        let client = Arc::new(aws_sdk_cloudfront::Client::new(&sdk_config));
        *cached = Some(client.clone());
        client
    }

    async fn get_or_init_lambda_client(&self) -> Arc<aws_sdk_lambda::Client> {
        let config = self.config.lock().await.clone();
        let mut cached = self.lambda_client.lock().await;

        if let Some(client) = cached.as_ref() {
            return client.clone();
        }

        let sdk_config = load_sdk_config(EDGE_REGION, config.endpoint_url.as_deref(), config.timeout_config.as_ref()).await;
        let client = Arc::new(aws_sdk_lambda::Client::new(&sdk_config));
        *cached = Some(client.clone());
        client
    }

    pub async fn deploy_site(&self, site: &SiteTarget) -> anyhow::Result<()> {
        let config = self.config.lock().await.clone();

        let edge_target = match (&site.institution, &site.domain_name) {
            (Some(institution), Some(domain_name)) => Some((institution, domain_name)),
            (None, None) => None,
            _ => bail!("Site entries must set both institution and domain_name, or neither: {:?}", site),
        };

        if let Some(bucket) = &site.bucket {
            let region = site.bucket_region.as_deref().unwrap_or(&config.region);
            let client = self.get_or_init_s3_client(region).await?;
            configure_bucket_for_hosting(client.as_ref(), &TokioSleeper, &config.bucket_retry.to_policy(), bucket).await?;
        }

        if let Some((institution, domain_name)) = edge_target {
            let lambda = self.get_or_init_lambda_client().await;
            let cloudfront = self.get_or_init_cloudfront_client().await;
            configure_security_headers_injector_lambda(lambda.as_ref(), cloudfront.as_ref(), institution, domain_name).await?;
        }

        Ok(())
    }

    /// Deploys every configured site in order, stopping at the first failure.
    pub async fn deploy_all(&self) -> anyhow::Result<()> {
        let sites = self.config.lock().await.sites.clone();
        if sites.is_empty() {
            tracing::warn!("No sites configured in {:?}", self.prefix.join("aws/hosting/config.ron"));
        }

        for site in &sites {
            self.deploy_site(site).await?;
        }
        Ok(())
    }
}
