pub mod application;
pub mod cache;
pub mod cli;
pub mod domain;
pub mod http;
pub mod logging;
pub mod market;
pub mod server;
pub mod storage;

pub use domain::*;
pub use storage::Repository;
