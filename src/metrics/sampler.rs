//! Metric Sampler
//!
//! Produces fresh `MetricSnapshot`s on demand.

use rand::distr::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use sysinfo::System;
use telemetry_shared::MetricSnapshot;

/// Samples device metrics
pub struct MetricSampler {
    system: System,
    rng: StdRng,
}

impl MetricSampler {
    /// Create a new sampler seeded from the OS
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Create a sampler with a fixed random seed
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut system = System::new();
        // Prime the CPU counters so the first instant read has a baseline
        system.refresh_cpu_usage();
        Self { system, rng }
    }

    /// Global CPU utilisation percentage
    ///
    /// A zero `interval` reads the usage accumulated since the previous
    /// refresh without blocking. A non-zero interval blocks the calling
    /// thread for that long and reports the average over it.
    pub fn sample_cpu(&mut self, interval: Duration) -> f32 {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return 0.0;
        }

        if !interval.is_zero() {
            self.system.refresh_cpu_usage();
            std::thread::sleep(interval.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL));
        }
        self.system.refresh_cpu_usage();

        let usage = self.system.global_cpu_usage();
        if usage.is_finite() {
            usage.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Free memory in bytes
    pub fn sample_free_memory(&mut self) -> u64 {
        self.system.refresh_memory();
        self.system.free_memory()
    }

    /// Uniform random draw between two bounds, in either order
    ///
    /// Bounds that are not finite, or whose span overflows, fall back to
    /// `[0, 1]`.
    pub fn sample_random(&mut self, lower: f64, upper: f64) -> f64 {
        let (low, high) = if lower > upper {
            (upper, lower)
        } else {
            (lower, upper)
        };

        if low == high && low.is_finite() {
            return low;
        }
        match Uniform::new_inclusive(low, high) {
            Ok(range) => self.rng.sample(range),
            Err(_) => self.rng.random_range(0.0..=1.0),
        }
    }

    /// Take a complete snapshot of the device metrics
    pub fn snapshot(&mut self) -> MetricSnapshot {
        MetricSnapshot {
            cpu_load: self.sample_cpu(Duration::ZERO) as f64,
            free_memory: self.sample_free_memory(),
            random: self.sample_random(0.0, 1.0),
        }
    }
}

impl Default for MetricSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_swaps_reversed_bounds() {
        let mut sampler = MetricSampler::with_seed(7);
        for _ in 0..1000 {
            let value = sampler.sample_random(10.0, -5.0);
            assert!((-5.0..=10.0).contains(&value), "{} out of range", value);
        }
    }

    #[test]
    fn test_random_in_order_bounds() {
        let mut sampler = MetricSampler::with_seed(42);
        for _ in 0..1000 {
            let value = sampler.sample_random(0.0, 1.0);
            assert!((0.0..=1.0).contains(&value));
        }
    }

    #[test]
    fn test_random_degenerate_bounds() {
        let mut sampler = MetricSampler::with_seed(1);
        assert_eq!(sampler.sample_random(3.5, 3.5), 3.5);

        let value = sampler.sample_random(f64::NAN, 2.0);
        assert!((0.0..=1.0).contains(&value));

        let value = sampler.sample_random(f64::INFINITY, 2.0);
        assert!((0.0..=1.0).contains(&value));
        let value = sampler.sample_random(f64::INFINITY, f64::INFINITY);
        assert!((0.0..=1.0).contains(&value));

        // finite bounds whose span overflows
        let value = sampler.sample_random(f64::MAX, -f64::MAX);
        assert!((0.0..=1.0).contains(&value));
        let value = sampler.sample_random(-f64::MAX, f64::MAX);
        assert!((0.0..=1.0).contains(&value));

        let value = sampler.sample_random(f64::MAX / 2.0, -f64::MAX / 2.0);
        assert!(value.is_finite());
    }

    #[test]
    fn test_seeded_samplers_agree() {
        let mut a = MetricSampler::with_seed(99);
        let mut b = MetricSampler::with_seed(99);
        assert_eq!(a.sample_random(0.0, 100.0), b.sample_random(0.0, 100.0));
    }

    #[test]
    fn test_cpu_in_range() {
        let mut sampler = MetricSampler::with_seed(0);
        let cpu = sampler.sample_cpu(Duration::ZERO);
        assert!((0.0..=100.0).contains(&cpu));
    }

    #[test]
    fn test_snapshot_composition() {
        let mut sampler = MetricSampler::with_seed(3);
        let snapshot = sampler.snapshot();

        assert!((0.0..=100.0).contains(&snapshot.cpu_load));
        assert!((0.0..=1.0).contains(&snapshot.random));

        let value = serde_json::to_value(snapshot).expect("serialize");
        let obj = value.as_object().expect("object");
        let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["cpu_load", "free_memory", "random"]);
        assert!(obj["cpu_load"].is_f64());
        assert!(obj["free_memory"].is_u64());
        assert!(obj["random"].is_f64());
    }
}
