use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use sitehost_aws_core::sleep::Sleeper;

use crate::{
    client::BucketHostingApi,
    error::{ApiError, HostingError},
};

pub const POLICY_VERSION: &str = "2012-10-17";
pub const INDEX_DOCUMENT: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Principal {
    #[serde(rename = "AWS")]
    pub aws: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub sid:       String,
    pub effect:    String,
    pub principal: Principal,
    pub action:    Vec<String>,
    pub resource:  Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct BucketPolicyDocument {
    pub version:   String,
    pub statement: Vec<PolicyStatement>,
}

impl BucketPolicyDocument {
    /// Grants `s3:GetObject` on every object in `bucket` to anyone.
    pub fn public_read(bucket: &str) -> Self {
        Self {
            version:   String::from(POLICY_VERSION),
            statement: vec![PolicyStatement {
                sid:       String::from("PublicReadGetObject"),
                effect:    String::from("Allow"),
                principal: Principal { aws: String::from("*") },
                action:    vec![String::from("s3:GetObject")],
                resource:  vec![format!("arn:aws:s3:::{bucket}/*")],
            }],
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string(self).context("Failed to serialize bucket policy as JSON")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorsRule {
    pub allowed_methods: Vec<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub max_age_seconds: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CorsRuleSet {
    pub rules: Vec<CorsRule>,
}

impl CorsRuleSet {
    /// Mutating methods only from AWS-hosted origins, reads from anywhere.
    pub fn static_site() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        Self {
            rules: vec![
                CorsRule {
                    allowed_methods: strings(&["PUT", "POST", "DELETE", "HEAD"]),
                    allowed_origins: strings(&["https://*.amazonaws.com"]),
                    allowed_headers: strings(&["*"]),
                    max_age_seconds: 0,
                },
                CorsRule {
                    allowed_methods: strings(&["GET"]),
                    allowed_origins: strings(&["*"]),
                    allowed_headers: strings(&["*"]),
                    max_age_seconds: 0,
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebsiteHostingConfig {
    pub index_document_suffix: String,
    pub error_document_key:    String,
}

impl WebsiteHostingConfig {
    /// Serves `index.html` for both directory requests and errors, so client-side routes resolve.
    pub fn index_fallback() -> Self {
        Self {
            index_document_suffix: String::from(INDEX_DOCUMENT),
            error_document_key:    String::from(INDEX_DOCUMENT),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub delay:        Duration,
}

impl Default for BucketRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            delay:        Duration::from_millis(2000),
        }
    }
}

async fn apply_hosting_config(
    api: &impl BucketHostingApi,
    bucket: &str,
    policy: &BucketPolicyDocument,
    cors: &CorsRuleSet,
    website: &WebsiteHostingConfig,
) -> Result<(), ApiError> {
    api.put_bucket_policy(bucket, policy).await?;
    api.put_bucket_cors(bucket, cors).await?;
    api.put_bucket_website(bucket, website).await?;
    Ok(())
}

/// Makes `bucket` a public static website.
///
/// A freshly created bucket can briefly report `NoSuchBucket`; while that happens the whole sequence is
/// restarted after `retry.delay`, up to `retry.max_attempts` attempts. Any other failure is returned as-is
/// and the remaining steps are skipped.
pub async fn configure_bucket_for_hosting(
    api: &impl BucketHostingApi,
    sleeper: &impl Sleeper,
    retry: &BucketRetryPolicy,
    bucket: &str,
) -> Result<(), HostingError> {
    let policy = BucketPolicyDocument::public_read(bucket);
    let cors = CorsRuleSet::static_site();
    let website = WebsiteHostingConfig::index_fallback();

    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match apply_hosting_config(api, bucket, &policy, &cors, &website).await {
            Ok(()) => {
                tracing::info!("Configured S3 bucket {} for static website hosting", bucket);
                return Ok(());
            }
            Err(ApiError::NoSuchBucket { .. }) if attempt < max_attempts => {
                tracing::warn!(
                    "S3 bucket {} not visible yet (attempt {}/{}), retrying in {:?}",
                    bucket,
                    attempt,
                    max_attempts,
                    retry.delay
                );
                sleeper.sleep(retry.delay).await;
                attempt += 1;
            }
            Err(ApiError::NoSuchBucket { .. }) => {
                return Err(HostingError::RetriesExhausted {
                    bucket:   bucket.to_string(),
                    attempts: attempt,
                });
            }
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Policy(String, BucketPolicyDocument),
        Cors(String, CorsRuleSet),
        Website(String, WebsiteHostingConfig),
    }

    /// Records every call; each call consumes the next scripted outcome, succeeding once the script runs out.
    #[derive(Default)]
    struct FakeBucketApi {
        calls:    Mutex<Vec<Call>>,
        outcomes: Mutex<VecDeque<Result<(), ApiError>>>,
    }

    impl FakeBucketApi {
        fn scripted(outcomes: Vec<Result<(), ApiError>>) -> Self {
            Self {
                calls:    Mutex::default(),
                outcomes: Mutex::new(outcomes.into()),
            }
        }

        fn record(&self, call: Call) -> Result<(), ApiError> {
            self.calls.lock().unwrap().push(call);
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BucketHostingApi for FakeBucketApi {
        async fn put_bucket_policy(&self, bucket: &str, policy: &BucketPolicyDocument) -> Result<(), ApiError> {
            self.record(Call::Policy(bucket.to_string(), policy.clone()))
        }

        async fn put_bucket_cors(&self, bucket: &str, cors: &CorsRuleSet) -> Result<(), ApiError> {
            self.record(Call::Cors(bucket.to_string(), cors.clone()))
        }

        async fn put_bucket_website(&self, bucket: &str, website: &WebsiteHostingConfig) -> Result<(), ApiError> {
            self.record(Call::Website(bucket.to_string(), website.clone()))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn no_such_bucket(bucket: &str) -> Result<(), ApiError> {
        Err(ApiError::NoSuchBucket {
            bucket: bucket.to_string(),
        })
    }

    fn full_sequence(bucket: &str) -> Vec<Call> {
        vec![
            Call::Policy(bucket.to_string(), BucketPolicyDocument::public_read(bucket)),
            Call::Cors(bucket.to_string(), CorsRuleSet::static_site()),
            Call::Website(bucket.to_string(), WebsiteHostingConfig::index_fallback()),
        ]
    }

    #[test]
    fn policy_document_serializes_with_aws_keys() {
        let policy = BucketPolicyDocument::public_read("my-site");
        let value: serde_json::Value = serde_json::from_str(&policy.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Sid": "PublicReadGetObject",
                    "Effect": "Allow",
                    "Principal": { "AWS": "*" },
                    "Action": ["s3:GetObject"],
                    "Resource": ["arn:aws:s3:::my-site/*"],
                }],
            })
        );
    }

    #[test]
    fn static_site_cors_restricts_mutations_only() {
        let cors = CorsRuleSet::static_site();

        assert_eq!(cors.rules.len(), 2);
        assert_eq!(cors.rules[0].allowed_methods, ["PUT", "POST", "DELETE", "HEAD"]);
        assert_eq!(cors.rules[0].allowed_origins, ["https://*.amazonaws.com"]);
        assert_eq!(cors.rules[1].allowed_methods, ["GET"]);
        assert_eq!(cors.rules[1].allowed_origins, ["*"]);
        assert!(cors.rules.iter().all(|r| r.allowed_headers == ["*"] && r.max_age_seconds == 0));
    }

    #[tokio::test]
    async fn applies_policy_cors_and_website_in_order() {
        let api = FakeBucketApi::default();
        let sleeper = RecordingSleeper::default();

        configure_bucket_for_hosting(&api, &sleeper, &BucketRetryPolicy::default(), "my-site")
            .await
            .unwrap();

        assert_eq!(api.calls(), full_sequence("my-site"));
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_bucket_restarts_whole_sequence_after_delay() {
        let api = FakeBucketApi::scripted(vec![Ok(()), no_such_bucket("my-site")]);
        let sleeper = RecordingSleeper::default();

        configure_bucket_for_hosting(&api, &sleeper, &BucketRetryPolicy::default(), "my-site")
            .await
            .unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[..2], full_sequence("my-site")[..2]);
        assert_eq!(calls[2..], full_sequence("my-site")[..]);
        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_millis(2000)]);
    }

    #[tokio::test]
    async fn other_errors_abort_without_retry() {
        let api = FakeBucketApi::scripted(vec![Ok(()), Err(ApiError::Other(anyhow::anyhow!("AccessDenied")))]);
        let sleeper = RecordingSleeper::default();

        let err = configure_bucket_for_hosting(&api, &sleeper, &BucketRetryPolicy::default(), "my-site")
            .await
            .unwrap_err();

        assert!(matches!(err, HostingError::Api(ApiError::Other(_))));
        assert_eq!(err.to_string(), "AccessDenied");
        assert_eq!(api.calls(), full_sequence("my-site")[..2]);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let api = FakeBucketApi::scripted(vec![
            no_such_bucket("late-bucket"),
            no_such_bucket("late-bucket"),
            no_such_bucket("late-bucket"),
        ]);
        let sleeper = RecordingSleeper::default();
        let retry = BucketRetryPolicy {
            max_attempts: 3,
            delay:        Duration::from_millis(10),
        };

        let err = configure_bucket_for_hosting(&api, &sleeper, &retry, "late-bucket")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            HostingError::RetriesExhausted { ref bucket, attempts: 3 } if bucket == "late-bucket"
        ));
        assert_eq!(api.calls().len(), 3);
        assert!(api.calls().iter().all(|c| matches!(c, Call::Policy(..))));
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn zero_max_attempts_still_tries_once() {
        let api = FakeBucketApi::scripted(vec![no_such_bucket("b")]);
        let sleeper = RecordingSleeper::default();
        let retry = BucketRetryPolicy {
            max_attempts: 0,
            delay:        Duration::from_millis(10),
        };

        let err = configure_bucket_for_hosting(&api, &sleeper, &retry, "b").await.unwrap_err();

        assert!(matches!(err, HostingError::RetriesExhausted { attempts: 1, .. }));
        assert_eq!(api.calls().len(), 1);
    }
}
