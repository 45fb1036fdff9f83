use sitehost_aws_hosting::deployer::HostingDeployer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let prefix = std::env::current_dir()?;
    let deployer = HostingDeployer::new(&prefix);
    deployer.init().await?;
    deployer.deploy_all().await?;
    Ok(())
}
