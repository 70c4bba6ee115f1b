// Copyright (c) 2024 The Botho Foundation

//! Events emitted by the distributor and the controller.

use serde::{Deserialize, Serialize};

use crate::{
    access::Role,
    address::Address,
    bucket::Bucket,
    coefficients::{Allocation, CoefficientUpdate, CoefficientsV2},
    units::{format_amount, Amount},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    /// Native currency was sent to a distributor.
    Deposited { from: Address, amount: Amount },
    RewardsAllocated { allocation: Allocation },
    BalanceWithdrawn {
        bucket: Bucket,
        to: Address,
        amount: Amount,
    },
    Burned { amount: Amount },
    CoefficientsUpdated { coefficients: CoefficientUpdate },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    UpgradeAuthorityTransferred {
        previous_authority: Address,
        new_authority: Address,
    },
    MigratedToV2 {
        coefficients: CoefficientsV2,
        /// Unallocated funds settled under the V1 weights.
        settled: Allocation,
    },
    RoleGranted {
        role: Role,
        account: Address,
        sender: Address,
    },
    RoleRevoked {
        role: Role,
        account: Address,
        sender: Address,
    },
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Event::Deposited { from, amount } => {
                write!(f, "Deposited {} from {}", format_amount(*amount), from)
            }
            Event::RewardsAllocated { allocation } => write!(
                f,
                "RewardsAllocated stakers={} master_nodes={} gather={} publishers={} burn={}",
                format_amount(allocation.stakers),
                format_amount(allocation.master_nodes),
                format_amount(allocation.gather),
                format_amount(allocation.publishers),
                format_amount(allocation.burn),
            ),
            Event::BalanceWithdrawn { bucket, to, amount } => write!(
                f,
                "BalanceWithdrawn {} {} to {}",
                bucket,
                format_amount(*amount),
                to
            ),
            Event::Burned { amount } => write!(f, "Burned {}", format_amount(*amount)),
            Event::CoefficientsUpdated { coefficients } => {
                write!(f, "CoefficientsUpdated {:?}", coefficients)
            }
            Event::OwnershipTransferred {
                previous_owner,
                new_owner,
            } => write!(f, "OwnershipTransferred {} -> {}", previous_owner, new_owner),
            Event::UpgradeAuthorityTransferred {
                previous_authority,
                new_authority,
            } => write!(
                f,
                "UpgradeAuthorityTransferred {} -> {}",
                previous_authority, new_authority
            ),
            Event::MigratedToV2 { settled, .. } => {
                write!(f, "MigratedToV2 (settled {})", format_amount(settled.total()))
            }
            Event::RoleGranted {
                role,
                account,
                sender,
            } => write!(f, "RoleGranted {:?} to {} by {}", role, account, sender),
            Event::RoleRevoked {
                role,
                account,
                sender,
            } => write!(f, "RoleRevoked {:?} from {} by {}", role, account, sender),
        }
    }
}

/// An event together with the contract that emitted it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub emitter: Address,
    pub event: Event,
}
