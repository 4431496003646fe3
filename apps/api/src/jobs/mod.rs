pub mod export;
pub mod handlers;
pub mod ingest;
pub mod normalize;
