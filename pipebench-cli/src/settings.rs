//! Settings Distribution
//!
//! Publishes one settings record per filter unit onto the bounded settings
//! queue before the pipeline starts consuming events. Publishing blocks
//! while the queue is at capacity; the external filter stage drains it as
//! it starts up.

use pipebench_ipc::{FilterSettings, QueueError, SettingsQueue};
use tracing::debug;

/// Publish `filter_count` records with filter ids `0..filter_count`, in id
/// order. A zero count publishes nothing and returns immediately.
pub fn distribute_settings(queue: &SettingsQueue, filter_count: u32) -> Result<(), QueueError> {
    for filter_id in 0..filter_count {
        let record = FilterSettings::for_unit(filter_id as i32);
        queue.send(&record.encode())?;
    }
    debug!(filter_count, queue = queue.name(), "settings published");
    Ok(())
}
