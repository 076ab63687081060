//! redb table definitions for the Corral state store.

use redb::TableDefinition;

/// Persisted controller snapshots (JSON), keyed by [`CURRENT`].
pub const SNAPSHOTS: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Key of the live snapshot row.
pub const CURRENT: &str = "current";
