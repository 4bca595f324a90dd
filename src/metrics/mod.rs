//! Metric Sampling Module
//!
//! Reads CPU load and free memory from the operating system and draws the
//! synthetic random reading that make up each published snapshot.

mod sampler;

pub use sampler::MetricSampler;
