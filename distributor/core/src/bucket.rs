// Copyright (c) 2024 The Botho Foundation

//! Beneficiary buckets and schema versions.

use serde::{Deserialize, Serialize};

use crate::error::DistributorError;

/// A named sub-balance of the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    /// Rewards for stakers
    Stakers,
    /// Rewards for master nodes
    MasterNodes,
    /// Rewards for the gather treasury
    Gather,
    /// Rewards for publishers (V2 only)
    Publishers,
    /// Funds destined for destruction (V2 only)
    Burn,
}

impl Bucket {
    /// All buckets in a stable order.
    pub const ALL: [Bucket; 5] = [
        Bucket::Stakers,
        Bucket::MasterNodes,
        Bucket::Gather,
        Bucket::Publishers,
        Bucket::Burn,
    ];

    /// Whether the bucket is paid out to a recipient. The burn bucket never is.
    pub fn is_withdrawable(self) -> bool {
        !matches!(self, Bucket::Burn)
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bucket::Stakers => write!(f, "stakers"),
            Bucket::MasterNodes => write!(f, "master_nodes"),
            Bucket::Gather => write!(f, "gather"),
            Bucket::Publishers => write!(f, "publishers"),
            Bucket::Burn => write!(f, "burn"),
        }
    }
}

impl std::str::FromStr for Bucket {
    type Err = DistributorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "stakers" | "staker" => Ok(Bucket::Stakers),
            "master_nodes" | "masternodes" | "master_node" => Ok(Bucket::MasterNodes),
            "gather" => Ok(Bucket::Gather),
            "publishers" | "publisher" => Ok(Bucket::Publishers),
            "burn" => Ok(Bucket::Burn),
            _ => Err(DistributorError::UnknownBucket(s.to_string())),
        }
    }
}

/// Storage schema of a distributor instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    V1,
    V2,
}

impl SchemaVersion {
    /// Buckets that receive allocations under this schema.
    pub fn active_buckets(self) -> &'static [Bucket] {
        match self {
            SchemaVersion::V1 => &[Bucket::Stakers, Bucket::MasterNodes, Bucket::Gather],
            SchemaVersion::V2 => &Bucket::ALL,
        }
    }

    /// Buckets that `withdraw_all` pays out under this schema.
    pub fn withdrawable_buckets(self) -> &'static [Bucket] {
        match self {
            SchemaVersion::V1 => &[Bucket::Stakers, Bucket::MasterNodes, Bucket::Gather],
            SchemaVersion::V2 => &[
                Bucket::Stakers,
                Bucket::MasterNodes,
                Bucket::Gather,
                Bucket::Publishers,
            ],
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "v1"),
            SchemaVersion::V2 => write!(f, "v2"),
        }
    }
}
