// Domain layer - Signal identity and enrichment value types
pub mod enrichment;
pub mod signal;
pub mod timestamp;
