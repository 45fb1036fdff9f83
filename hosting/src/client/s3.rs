use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::{
    error::{ProvideErrorMetadata, SdkError},
    types::{CorsConfiguration, CorsRule as SdkCorsRule, ErrorDocument, IndexDocument, WebsiteConfiguration},
};

use crate::{
    bucket::{BucketPolicyDocument, CorsRule, CorsRuleSet, WebsiteHostingConfig},
    error::ApiError,
};

use super::BucketHostingApi;

const NO_SUCH_BUCKET: &str = "NoSuchBucket";

fn map_bucket_error<E, R>(bucket: &str, err: SdkError<E, R>, context: &'static str) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    if err.as_service_error().and_then(|e| e.code()) == Some(NO_SUCH_BUCKET) {
        return ApiError::NoSuchBucket {
            bucket: bucket.to_string(),
        };
    }
    ApiError::Other(anyhow::Error::new(err).context(context))
}

fn cors_rule_to_sdk(rule: &CorsRule) -> anyhow::Result<SdkCorsRule> {
    SdkCorsRule::builder()
        .set_allowed_methods(Some(rule.allowed_methods.clone()))
        .set_allowed_origins(Some(rule.allowed_origins.clone()))
        .set_allowed_headers(Some(rule.allowed_headers.clone()))
        .max_age_seconds(rule.max_age_seconds)
        .build()
        .context("Failed to build CORS rule")
}

fn cors_to_sdk(cors: &CorsRuleSet) -> anyhow::Result<CorsConfiguration> {
    let rules = cors.rules.iter().map(cors_rule_to_sdk).collect::<anyhow::Result<Vec<_>>>()?;

    CorsConfiguration::builder()
        .set_cors_rules(Some(rules))
        .build()
        .context("Failed to build CORS configuration")
}

fn website_to_sdk(website: &WebsiteHostingConfig) -> anyhow::Result<WebsiteConfiguration> {
    let index_document = IndexDocument::builder()
        .suffix(&website.index_document_suffix)
        .build()
        .context("Failed to build index document")?;
    let error_document = ErrorDocument::builder()
        .key(&website.error_document_key)
        .build()
        .context("Failed to build error document")?;

    Ok(WebsiteConfiguration::builder()
        .index_document(index_document)
        .error_document(error_document)
        .build())
}

#[async_trait]
impl BucketHostingApi for aws_sdk_s3::Client {
    async fn put_bucket_policy(&self, bucket: &str, policy: &BucketPolicyDocument) -> Result<(), ApiError> {
        let policy_json = policy.to_json()?;

        self.put_bucket_policy()
            .bucket(bucket)
            .policy(policy_json)
            .send()
            .await
            .map_err(|e| map_bucket_error(bucket, e, "Failed to set bucket policy"))?;
        Ok(())
    }

    async fn put_bucket_cors(&self, bucket: &str, cors: &CorsRuleSet) -> Result<(), ApiError> {
        let cors_configuration = cors_to_sdk(cors)?;

        self.put_bucket_cors()
            .bucket(bucket)
            .cors_configuration(cors_configuration)
            .send()
            .await
            .map_err(|e| map_bucket_error(bucket, e, "Failed to set bucket CORS configuration"))?;
        Ok(())
    }

    async fn put_bucket_website(&self, bucket: &str, website: &WebsiteHostingConfig) -> Result<(), ApiError> {
        let website_configuration = website_to_sdk(website)?;

        self.put_bucket_website()
            .bucket(bucket)
            .website_configuration(website_configuration)
            .send()
            .await
            .map_err(|e| map_bucket_error(bucket, e, "Failed to set bucket website configuration"))?;
        Ok(())
    }
}
