pub mod appliers;
pub mod audit;
pub mod batch;
pub mod config;
pub mod disposition;
pub mod orchestrator;
pub mod relocate;
pub mod report;
pub mod store;
