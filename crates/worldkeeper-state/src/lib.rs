mod database;
mod digest;
mod fs_utils;
mod layout;
mod provenance;
mod settings;

pub use database::{apply_database_strategy, snapshot_database, DatabaseChange, SnapshotRecord};
pub use digest::{sha256_file, sha256_hex};
pub use fs_utils::{copy_then_replace, remove_file_if_exists, write_then_replace};
pub use layout::StateLayout;
pub use provenance::{current_unix_millis, read_wipe_timestamp, record_wipe_timestamp};
pub use settings::{
    rewrite_spawn_lines, rewrite_spawn_locations, stage_spawn_rewrite, SpawnRewrite,
    StagedSpawnRewrite, DEFAULT_HOME_KEY, START_LOCATION_KEY,
};
