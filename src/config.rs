use core::time::Duration;
use thiserror::Error;

/// Largest number of producers whose indices fit in a [`JobId`](crate::job::JobId).
pub const MAX_PRODUCERS: usize = u16::MAX as usize + 1;

/// Error returned when a [`SchedulerConfig`] or a queue capacity is invalid.
///
/// Always raised before any worker thread starts.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The job queue needs room for at least one job.
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    /// Without consumers nothing would ever drain the queue.
    #[error("consumer count must be at least 1")]
    NoConsumers,
    /// Producer indices are part of job identifiers and must fit in `u16`.
    #[error("producer count {0} exceeds the maximum of {max}", max = MAX_PRODUCERS)]
    TooManyProducers(usize),
    /// Jobs must cost at least one tick.
    #[error("maximum job duration must be at least 1")]
    ZeroMaxDuration,
    /// A probability outside `[0, 1]` (or NaN).
    #[error("{name} must be within [0, 1], got {value}")]
    Probability { name: &'static str, value: f64 },
}

/// Run parameters for a [`Coordinator`](crate::coordinator::Coordinator).
///
/// Built by the CLI or directly by embedders; checked by
/// [`SchedulerConfig::validate`] before anything starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Number of concurrent producers.
    pub producers: usize,
    /// Number of consumer worker threads.
    pub consumers: usize,
    /// Jobs generated by every producer.
    pub jobs_per_producer: u32,
    /// Capacity of the shared job queue.
    pub queue_capacity: usize,
    /// Chance that a non-first job of a producer gets dependencies.
    pub dependency_probability: f64,
    /// Upper bound for a producer's per-job duration range, in ticks.
    pub max_duration: u32,
    /// Wall-clock length of one duration unit.
    pub tick: Duration,
    /// Pause a consumer takes after re-queueing a blocked job.
    pub requeue_backoff: Duration,
    /// Chance that a simulated execution fails.
    pub failure_probability: f64,
    /// Seed for reproducible job graphs. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            consumers: 3,
            jobs_per_producer: 5,
            queue_capacity: 10,
            dependency_probability: 0.3,
            max_duration: 3,
            tick: Duration::from_secs(1),
            requeue_backoff: Duration::from_millis(10),
            failure_probability: 0.0,
            seed: None,
        }
    }
}

impl SchedulerConfig {
    /// # Errors
    /// On the first invalid field, in declaration order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.producers > MAX_PRODUCERS {
            return Err(ConfigError::TooManyProducers(self.producers));
        }
        if self.consumers == 0 {
            return Err(ConfigError::NoConsumers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        check_probability("dependency probability", self.dependency_probability)?;
        if self.max_duration == 0 {
            return Err(ConfigError::ZeroMaxDuration);
        }
        check_probability("failure probability", self.failure_probability)?;
        Ok(())
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Probability { name, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(SchedulerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_invalid_fields() {
        let base = SchedulerConfig::default();
        let cases = [
            (
                SchedulerConfig {
                    queue_capacity: 0,
                    ..base.clone()
                },
                ConfigError::ZeroCapacity,
            ),
            (
                SchedulerConfig {
                    consumers: 0,
                    ..base.clone()
                },
                ConfigError::NoConsumers,
            ),
            (
                SchedulerConfig {
                    producers: MAX_PRODUCERS + 1,
                    ..base.clone()
                },
                ConfigError::TooManyProducers(MAX_PRODUCERS + 1),
            ),
            (
                SchedulerConfig {
                    max_duration: 0,
                    ..base.clone()
                },
                ConfigError::ZeroMaxDuration,
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn rejects_out_of_range_probabilities() {
        for value in [-0.1, 1.5, f64::NAN] {
            let config = SchedulerConfig {
                dependency_probability: value,
                ..SchedulerConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Probability {
                    name: "dependency probability",
                    ..
                })
            ));
        }
        let config = SchedulerConfig {
            failure_probability: 2.0,
            ..SchedulerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_producers_and_jobs_are_allowed() {
        let config = SchedulerConfig {
            producers: 0,
            jobs_per_producer: 0,
            ..SchedulerConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }
}
