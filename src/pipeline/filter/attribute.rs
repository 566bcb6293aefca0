use chrono::{DateTime, Utc};

use crate::pipeline::filter::FilterPredicate;
use crate::types::{AccessTier, ObjectDescriptor};

pub struct LargerSizeFilter {
    size: u64,
}

impl LargerSizeFilter {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

impl FilterPredicate for LargerSizeFilter {
    fn name(&self) -> &str {
        "LargerSizeFilter"
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        self.size <= object.size()
    }
}

pub struct SmallerSizeFilter {
    size: u64,
}

impl SmallerSizeFilter {
    pub fn new(size: u64) -> Self {
        Self { size }
    }
}

impl FilterPredicate for SmallerSizeFilter {
    fn name(&self) -> &str {
        "SmallerSizeFilter"
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        object.size() < self.size
    }
}

pub struct MtimeBeforeFilter {
    before_time: DateTime<Utc>,
}

impl MtimeBeforeFilter {
    pub fn new(before_time: DateTime<Utc>) -> Self {
        Self { before_time }
    }
}

impl FilterPredicate for MtimeBeforeFilter {
    fn name(&self) -> &str {
        "MtimeBeforeFilter"
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        *object.last_modified() < self.before_time
    }
}

pub struct MtimeAfterFilter {
    after_time: DateTime<Utc>,
}

impl MtimeAfterFilter {
    pub fn new(after_time: DateTime<Utc>) -> Self {
        Self { after_time }
    }
}

impl FilterPredicate for MtimeAfterFilter {
    fn name(&self) -> &str {
        "MtimeAfterFilter"
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        self.after_time <= *object.last_modified()
    }
}

/// Objects without a recorded tier never match.
pub struct TierFilter {
    tier: AccessTier,
}

impl TierFilter {
    pub fn new(tier: AccessTier) -> Self {
        Self { tier }
    }
}

impl FilterPredicate for TierFilter {
    fn name(&self) -> &str {
        "TierFilter"
    }

    fn matches(&self, object: &ObjectDescriptor) -> bool {
        object.tier() == Some(self.tier)
    }
}
