//! Point-in-time counters reported by the hub control loop.

use serde::Serialize;
use utoipa::ToSchema;

/// Snapshot of the hub registry and its delivery counters.
///
/// Produced by the control loop itself, so `clients` is always consistent
/// with the membership at the moment the snapshot was taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct HubStats {
    /// Sessions currently registered and eligible for broadcasts.
    pub clients: usize,
    /// Broadcast payloads processed since startup.
    pub broadcasts: u64,
    /// Sessions evicted because their outbound queue was full.
    pub shed: u64,
}
