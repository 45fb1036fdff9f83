use thiserror::Error;

/// Failure reported by one of the capability traits in [`crate::client`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("S3 bucket {bucket} does not exist")]
    NoSuchBucket { bucket: String },

    #[error("CloudFront distribution {distribution_id} changed since its config was read (ETag mismatch)")]
    PreconditionFailed { distribution_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum HostingError {
    #[error("S3 bucket {bucket} still did not exist after {attempts} attempts")]
    RetriesExhausted { bucket: String, attempts: u32 },

    #[error("No CloudFront distribution has the alias {domain_name}")]
    DistributionNotFound { domain_name: String },

    #[error("Lambda function {function_name} has no published versions")]
    NoPublishedVersion { function_name: String },

    #[error("CloudFront distribution {distribution_id} has no default cache behavior")]
    MissingDefaultCacheBehavior { distribution_id: String },

    #[error("Failed to build Lambda function association")]
    BuildAssociation(#[from] aws_sdk_cloudfront::error::BuildError),

    #[error(transparent)]
    Api(#[from] ApiError),
}
