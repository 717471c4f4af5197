pub mod chat;
pub mod files;
pub mod knowledge;

/// Parallelism limit shared by every batch operation (uploads, embeds,
/// batch deletes and downloads). Keeps the backend from being hit with an
/// unbounded fan-out while still overlapping requests.
pub const DEFAULT_BATCH_LIMIT: usize = 4;
