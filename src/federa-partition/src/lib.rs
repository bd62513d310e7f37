//! Partitioning for Federa tables.
//!
//! A partitioned table splits its rows into partition groups by the value
//! of one column:
//!
//! - **HASH**: XXH64 (seed 0) of the value's canonical text, modulo the
//!   number of groups
//! - **LIST**: the group whose qualifier list contains the value, else the
//!   mandatory UNBOUND group
//! - **RANGE**: the group whose inclusive `[lower, upper]` range contains
//!   the value, else UNBOUND
//!
//! Stores hold placements of (column, partition group) pairs. The
//! [`PartitionRouter`] routes values to groups, picks placements for the
//! groups a query touches, and refuses placement drops that would leave a
//! group without any store.

mod hash;
mod list;
mod manager;
mod range;
mod router;

pub use hash::{HASH_SEED, HashPartitionManager, partition_hash};
pub use list::ListPartitionManager;
pub use manager::{PartitionManager, PartitionRequest, partition_manager_for};
pub use range::RangePartitionManager;
pub use router::{PartitionRouter, UNBOUND_GROUP_NAME};
