use aws_sdk_cloudfront::types::{DistributionConfig, EventType, LambdaFunctionAssociation, LambdaFunctionAssociations};

use crate::{
    client::{DistributionApi, DistributionSummary, FunctionVersion, FunctionVersionApi},
    error::HostingError,
};

pub fn security_headers_function_name(institution: &str) -> String {
    format!("{institution}-security-headers-injector-prod-injectSecurityHeaders")
}

/// The last published entry of `versions`. Lambda lists versions oldest first.
pub fn latest_published_version(versions: Vec<FunctionVersion>) -> Option<FunctionVersion> {
    versions.into_iter().rev().find(FunctionVersion::is_published)
}

pub fn find_distribution_by_alias<'a>(
    distributions: &'a [DistributionSummary],
    domain_name: &str,
) -> Option<&'a DistributionSummary> {
    distributions.iter().find(|dist| dist.has_alias(domain_name))
}

/// Returns `config` with the default cache behavior's Lambda associations replaced by a single
/// `origin-response` association to `function_arn`. Any previous associations are dropped.
pub fn with_origin_response_association(
    mut config: DistributionConfig,
    distribution_id: &str,
    function_arn: &str,
) -> Result<DistributionConfig, HostingError> {
    let Some(default_cache_behavior) = config.default_cache_behavior.as_mut() else {
        return Err(HostingError::MissingDefaultCacheBehavior {
            distribution_id: distribution_id.to_string(),
        });
    };

    let association = LambdaFunctionAssociation::builder()
        .event_type(EventType::OriginResponse)
        .lambda_function_arn(function_arn)
        .include_body(false)
        .build()?;

    default_cache_behavior.lambda_function_associations = Some(
        LambdaFunctionAssociations::builder()
            .quantity(1)
            .items(association)
            .build()?,
    );

    Ok(config)
}

pub async fn configure_security_headers_injector_lambda(
    functions: &impl FunctionVersionApi,
    cdn: &impl DistributionApi,
    institution: &str,
    domain_name: &str,
) -> Result<(), HostingError> {
    let function_name = security_headers_function_name(institution);

    let versions = functions.list_versions_by_function(&function_name).await?;
    let Some(latest) = latest_published_version(versions) else {
        return Err(HostingError::NoPublishedVersion { function_name });
    };
    tracing::info!("Using {} version {} ({})", function_name, latest.version, latest.function_arn);

    let distributions = cdn.list_distributions().await?;
    let Some(distribution) = find_distribution_by_alias(&distributions, domain_name) else {
        return Err(HostingError::DistributionNotFound {
            domain_name: domain_name.to_string(),
        });
    };
    let distribution_id = distribution.id.as_str();

    let current = cdn.get_distribution_config(distribution_id).await?;
    let config = with_origin_response_association(current.config, distribution_id, &latest.function_arn)?;

    cdn.update_distribution(config, distribution_id, &current.e_tag).await?;
    tracing::info!(
        "Associated {} with CloudFront distribution {} for {}",
        latest.function_arn,
        distribution_id,
        domain_name
    );

    Ok(())
}
