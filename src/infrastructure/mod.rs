// Infrastructure layer - External dependencies and adapters
pub mod az_credentials;
pub mod circuit_breaker;
pub mod config;
pub mod dgraph_client;
pub mod latest_value_store;
pub mod signal_cache;
