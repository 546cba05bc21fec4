pub mod api_football;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod fixtures;
pub mod http_client;
pub mod odds;
pub mod quota_reset;
pub mod ttl_cache;
