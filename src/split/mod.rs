//! Split membership: resolving existing split files and computing new ones.

pub mod partition;
pub mod resolve;

pub use partition::{
    partition, write_partition, CategorySplits, Partition, PartitionEntry, PartitionReport,
};
pub use resolve::{read_split_file, resolve_split, Membership, ResolvedSplit};
