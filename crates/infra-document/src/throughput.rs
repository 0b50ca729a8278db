// Request-unit throughput budget (token bucket)

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Request-unit cost of each container operation
pub struct RequestCharge;

impl RequestCharge {
    pub const POINT_READ: u32 = 1;
    pub const WRITE: u32 = 5;
    pub const DELETE: u32 = 5;
    pub const QUERY_BASE: u32 = 2;
    /// One extra unit per this many documents returned
    pub const QUERY_DOCS_PER_UNIT: u32 = 10;

    pub fn query(documents: usize) -> u32 {
        let extra = documents as u64 / u64::from(Self::QUERY_DOCS_PER_UNIT);
        Self::QUERY_BASE.saturating_add(extra.min(u64::from(u32::MAX)) as u32)
    }
}

/// Provisioned throughput for one container.
///
/// Holds at most one second of request units and refills continuously at
/// the provisioned rate. A charge larger than the whole bucket is clamped
/// to the bucket size so big queries can still run on small containers.
#[derive(Debug)]
pub struct ThroughputBudget {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl ThroughputBudget {
    /// `ru_per_sec` of zero is treated as one
    pub fn new(ru_per_sec: u32) -> Self {
        let rate = f64::from(ru_per_sec.max(1));
        Self {
            capacity: rate,
            refill_per_sec: rate,
            state: Mutex::new(BucketState {
                tokens: rate,
                last_refill: Instant::now(),
            }),
        }
    }

    pub fn ru_per_sec(&self) -> u32 {
        self.refill_per_sec as u32
    }

    /// Consume `cost` units, or return how long to wait before they exist
    pub fn try_charge(&self, cost: u32) -> Result<(), Duration> {
        let cost = f64::from(cost).min(self.capacity);
        let Ok(mut state) = self.state.lock() else {
            // A poisoned bucket never throttles
            return Ok(());
        };

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= cost {
            state.tokens -= cost;
            Ok(())
        } else {
            let deficit = cost - state.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_per_sec))
        }
    }

    /// Units currently available
    pub fn remaining(&self) -> f64 {
        self.state.lock().map(|s| s.tokens).unwrap_or(0.0)
    }
}
