//! Pipeline workers: the subscription supervisor and the price sampler.

pub mod error;
pub mod sampler;
pub mod supervisor;

pub use error::{MonitorError, MonitorResult};
pub use sampler::PriceSampler;
pub use supervisor::{FeedSupervisor, SupervisorMetrics};
