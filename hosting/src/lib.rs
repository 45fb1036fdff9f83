pub mod bucket;
pub mod client;
pub mod config;
pub mod deployer;
pub mod edge_lambda;
pub mod error;

pub use bucket::configure_bucket_for_hosting;
pub use edge_lambda::configure_security_headers_injector_lambda;
pub use error::{ApiError, HostingError};
