use std::sync::Arc;

use leaky_bucket::RateLimiter;

use crate::Config;

// default refill interval 100ms
const REFILL_PER_INTERVAL_DIVIDER: usize = 10;

/// Token buckets shared by every worker of a run.
#[derive(Clone, Default)]
pub struct RateLimits {
    objects_per_sec: Option<Arc<RateLimiter>>,
    bandwidth: Option<Arc<RateLimiter>>,
    bandwidth_max: usize,
}

impl RateLimits {
    pub fn from_config(config: &Config) -> Self {
        let objects_per_sec = config.rate_limit_objects.map(|rate_limit_value| {
            let refill = if rate_limit_value <= REFILL_PER_INTERVAL_DIVIDER as u32 {
                1
            } else {
                rate_limit_value as usize / REFILL_PER_INTERVAL_DIVIDER
            };

            Arc::new(
                RateLimiter::builder()
                    .max(rate_limit_value as usize)
                    .initial(rate_limit_value as usize)
                    .refill(refill)
                    .fair(true)
                    .build(),
            )
        });

        let bandwidth_max = config.rate_limit_bandwidth.unwrap_or_default() as usize;
        let bandwidth = config.rate_limit_bandwidth.map(|rate_limit_bandwidth| {
            let refill = (rate_limit_bandwidth as usize / REFILL_PER_INTERVAL_DIVIDER).max(1);

            Arc::new(
                RateLimiter::builder()
                    .max(rate_limit_bandwidth as usize)
                    .initial(rate_limit_bandwidth as usize)
                    .refill(refill)
                    .fair(true)
                    .build(),
            )
        });

        Self {
            objects_per_sec,
            bandwidth,
            bandwidth_max,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.objects_per_sec.is_some() || self.bandwidth.is_some()
    }

    /// Waits for one request token and `bytes` bandwidth tokens.
    pub async fn acquire(&self, bytes: u64) {
        if let Some(objects_per_sec) = &self.objects_per_sec {
            objects_per_sec.acquire_one().await;
        }

        if let Some(bandwidth) = &self.bandwidth {
            // a single acquire can not exceed the bucket size
            let mut remaining = bytes as usize;
            while 0 < remaining {
                let permits = remaining.min(self.bandwidth_max);
                bandwidth.acquire(permits).await;
                remaining -= permits;
            }
        }
    }
}
