// Copyright (c) 2024 The Botho Foundation

//! Core types and logic for the BTH reward distributor.
//!
//! A reward distributor receives native currency and splits it among named
//! beneficiary buckets according to integer weighting coefficients. The
//! crate provides:
//!
//! - The distributor ledger and its one-time V1 -> V2 schema migration
//! - The allocation arithmetic for both coefficient schemas
//! - A role-gated controller that can own a distributor
//! - A deterministic runtime that applies calls atomically and models
//!   value transfers to recipients with hooks
//! - Configuration structures and amount formatting

pub mod access;
pub mod address;
pub mod bucket;
pub mod coefficients;
pub mod config;
pub mod controller;
pub mod distributor;
pub mod error;
pub mod events;
pub mod runtime;
pub mod units;

pub use access::{Role, RoleRegistry, STAKERS_ROLE_NAME};
pub use address::Address;
pub use bucket::{Bucket, SchemaVersion};
pub use coefficients::{
    Allocation, Coefficient, CoefficientUpdate, CoefficientsV1, CoefficientsV2, MigrationParams,
    TOTAL_COEFFICIENT,
};
pub use config::{CliSettings, ConfigError, DistributorConfig};
pub use controller::RewardDistributorController;
pub use distributor::{RewardDistributor, Schema};
pub use error::{DistributorError, Result};
pub use events::{Event, LoggedEvent};
pub use runtime::{DistributorDeployment, Recipient, Recipients, Runtime, WorldState};
pub use units::{bth, format_amount, parse_amount, Amount, UNITS_PER_BTH};
