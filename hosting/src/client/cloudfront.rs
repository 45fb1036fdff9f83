use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_cloudfront::{
    error::{ProvideErrorMetadata, SdkError},
    types::DistributionConfig,
};

use crate::error::ApiError;

use super::{DistributionApi, DistributionSummary, VersionedDistributionConfig, collect_pages};

/// Error codes CloudFront returns when `If-Match` no longer names the current config.
const STALE_ETAG_CODES: [&str; 2] = ["PreconditionFailed", "InvalidIfMatchVersion"];

fn map_update_error<E, R>(distribution_id: &str, err: SdkError<E, R>) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code());
    if code.is_some_and(|code| STALE_ETAG_CODES.contains(&code)) {
        return ApiError::PreconditionFailed {
            distribution_id: distribution_id.to_string(),
        };
    }
    ApiError::Other(anyhow::Error::new(err).context(format!("Failed to update CloudFront distribution {distribution_id}")))
}

#[async_trait]
impl DistributionApi for aws_sdk_cloudfront::Client {
    async fn list_distributions(&self) -> Result<Vec<DistributionSummary>, ApiError> {
        collect_pages(|marker| async move {
            let distributions = self
                .list_distributions()
                .set_marker(marker)
                .send()
                .await
                .context("Failed to list CloudFront distributions")?;
            let Some(distribution_list) = distributions.distribution_list else {
                return Ok((Vec::new(), None));
            };

            let summaries = distribution_list
                .items
                .unwrap_or_default()
                .into_iter()
                .map(|dist| DistributionSummary {
                    aliases: dist.aliases.and_then(|a| a.items).unwrap_or_default(),
                    id:      dist.id,
                })
                .collect();

            Ok((summaries, distribution_list.next_marker))
        })
        .await
    }

    async fn get_distribution_config(&self, distribution_id: &str) -> Result<VersionedDistributionConfig, ApiError> {
        let get_response = self
            .get_distribution_config()
            .id(distribution_id)
            .send()
            .await
            .with_context(|| format!("Failed to get config of CloudFront distribution {distribution_id}"))?;

        let config = get_response.distribution_config().context("No distribution config")?.clone();
        let e_tag = get_response.e_tag().context("No ETag in response")?;
        Ok(VersionedDistributionConfig {
            config,
            e_tag: e_tag.to_string(),
        })
    }

    async fn update_distribution(
        &self,
        config: DistributionConfig,
        distribution_id: &str,
        if_match: &str,
    ) -> Result<(), ApiError> {
        self.update_distribution()
            .id(distribution_id)
            .if_match(if_match)
            .distribution_config(config)
            .send()
            .await
            .map_err(|e| map_update_error(distribution_id, e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_cloudfront::operation::update_distribution::UpdateDistributionError;
    use aws_smithy_runtime_api::http::{Response, StatusCode};
    use aws_smithy_types::{body::SdkBody, error::ErrorMetadata};

    use super::*;

    fn service_error(status: u16, code: &str) -> SdkError<UpdateDistributionError, Response> {
        let err = UpdateDistributionError::generic(ErrorMetadata::builder().code(code).message("test").build());
        let raw = Response::new(StatusCode::try_from(status).unwrap(), SdkBody::empty());
        SdkError::service_error(err, raw)
    }

    #[test]
    fn stale_etag_codes_map_to_precondition_failed() {
        for code in ["PreconditionFailed", "InvalidIfMatchVersion"] {
            let err = map_update_error("E2TARGET", service_error(412, code));
            assert!(
                matches!(err, ApiError::PreconditionFailed { ref distribution_id } if distribution_id == "E2TARGET"),
                "{code} should be a conflict, got {err:?}"
            );
        }
    }

    #[test]
    fn other_codes_keep_context() {
        let err = map_update_error("E2TARGET", service_error(403, "AccessDenied"));

        let ApiError::Other(inner) = err else {
            panic!("AccessDenied must not be treated as a conflict");
        };
        assert_eq!(inner.to_string(), "Failed to update CloudFront distribution E2TARGET");
    }
}
