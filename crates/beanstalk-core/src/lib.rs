pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod jitter;
pub mod notify;
pub mod orchestrator;
pub mod reconciler;
pub mod schedule;
pub mod summary;
pub mod types;

#[cfg(test)]
mod testing;

pub use error::{BeanstalkError, Result};
pub use orchestrator::AccountOrchestrator;
pub use schedule::ScheduleDriver;
