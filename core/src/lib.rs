pub mod config;
pub mod sleep;
pub mod util;
