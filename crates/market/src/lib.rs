pub mod orchestrator;
pub mod series_store;

pub use orchestrator::FetchOrchestrator;
pub use series_store::SeriesStore;
