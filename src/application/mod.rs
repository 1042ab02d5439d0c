// Application layer - Use cases and repository seams
pub mod enrichment_service;
pub mod metadata_fetcher;
pub mod metadata_repository;
pub mod resolution_service;
pub mod response_builder;
pub mod sync_service;
