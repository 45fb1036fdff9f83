use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_lambda::types::FunctionConfiguration;

use crate::error::ApiError;

use super::{FunctionVersion, FunctionVersionApi, collect_pages};

fn function_versions(configurations: Vec<FunctionConfiguration>) -> Vec<FunctionVersion> {
    configurations
        .into_iter()
        .filter_map(|configuration| {
            Some(FunctionVersion {
                function_arn: configuration.function_arn?,
                version:      configuration.version?,
            })
        })
        .collect()
}

#[async_trait]
impl FunctionVersionApi for aws_sdk_lambda::Client {
    async fn list_versions_by_function(&self, function_name: &str) -> Result<Vec<FunctionVersion>, ApiError> {
        collect_pages(|marker| async move {
            let output = self
                .list_versions_by_function()
                .function_name(function_name)
                .set_marker(marker)
                .send()
                .await
                .with_context(|| format!("Failed to list versions of Lambda function {function_name}"))?;

            Ok((function_versions(output.versions.unwrap_or_default()), output.next_marker))
        })
        .await
    }
}
