pub mod active_slot;
pub mod archive_entries;
pub mod stream_sessions;
