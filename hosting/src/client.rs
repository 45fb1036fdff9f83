use std::future::Future;

use async_trait::async_trait;
use aws_sdk_cloudfront::types::DistributionConfig;

use crate::{
    bucket::{BucketPolicyDocument, CorsRuleSet, WebsiteHostingConfig},
    error::ApiError,
};

mod cloudfront;
mod lambda;
mod s3;

/// Version string Lambda reports for the mutable, unpublished copy of a function.
pub const UNPUBLISHED_VERSION: &str = "$LATEST";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionVersion {
    pub function_arn: String,
    pub version:      String,
}

impl FunctionVersion {
    pub fn is_published(&self) -> bool {
        self.version != UNPUBLISHED_VERSION
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionSummary {
    pub id:      String,
    pub aliases: Vec<String>,
}

impl DistributionSummary {
    pub fn has_alias(&self, domain_name: &str) -> bool {
        self.aliases.iter().any(|alias| alias == domain_name)
    }
}

/// A distribution config together with the ETag it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDistributionConfig {
    pub config: DistributionConfig,
    pub e_tag:  String,
}

/// Follows a marker-paginated listing to the end. `fetch_page` receives the marker of the page to read
/// (`None` for the first) and returns that page's items with the next marker.
pub(crate) async fn collect_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>, ApiError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<(Vec<T>, Option<String>), ApiError>>,
{
    let mut results = Vec::new();

    let mut next_marker: Option<String> = None;
    loop {
        let (items, marker) = fetch_page(next_marker).await?;
        results.extend(items);

        next_marker = marker;
        if next_marker.is_none() {
            break;
        }
    }

    Ok(results)
}

/// Static-website settings on an S3 bucket. Implemented by `aws_sdk_s3::Client`.
#[async_trait]
pub trait BucketHostingApi: Send + Sync {
    async fn put_bucket_policy(&self, bucket: &str, policy: &BucketPolicyDocument) -> Result<(), ApiError>;
    async fn put_bucket_cors(&self, bucket: &str, cors: &CorsRuleSet) -> Result<(), ApiError>;
    async fn put_bucket_website(&self, bucket: &str, website: &WebsiteHostingConfig) -> Result<(), ApiError>;
}

#[async_trait]
pub trait FunctionVersionApi: Send + Sync {
    /// Every version of the function, in the order the service reports them.
    async fn list_versions_by_function(&self, function_name: &str) -> Result<Vec<FunctionVersion>, ApiError>;
}

#[async_trait]
pub trait DistributionApi: Send + Sync {
    async fn list_distributions(&self) -> Result<Vec<DistributionSummary>, ApiError>;
    async fn get_distribution_config(&self, distribution_id: &str) -> Result<VersionedDistributionConfig, ApiError>;
    /// Applies `config` only if the distribution's current ETag still equals `if_match`.
    async fn update_distribution(
        &self,
        config: DistributionConfig,
        distribution_id: &str,
        if_match: &str,
    ) -> Result<(), ApiError>;
}
