// Copyright (c) 2024 The Botho Foundation

//! Operator tool for BTH reward distributors.
//!
//! Drives a local [`Runtime`](bth_distributor_core::Runtime) whose state is
//! persisted as JSON between invocations. Each subcommand loads the state,
//! applies one call and saves the result.

pub mod accounts;
pub mod commands;
pub mod store;

use std::path::PathBuf;

use bth_distributor_core::{Address, DistributorConfig};

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    pub config: DistributorConfig,
    /// Persisted runtime state
    pub state_path: PathBuf,
    /// Identity the calls are issued from
    pub from: Address,
}
