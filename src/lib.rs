pub mod capacity;
pub mod cli;
pub mod config;
pub mod data;
pub mod eligibility;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod preference;
pub mod report;
pub mod repository;
pub mod scoring;
pub mod server;
pub mod solver;

pub use solver::solve;
