pub mod analytics;
pub mod connectivity;
pub mod executor;
pub mod http;
pub mod ip;
