// Copyright (c) 2024 The Botho Foundation

//! CLI command implementations.
//!
//! These modules implement the user-facing CLI commands and legitimately
//! use stdout for output.

pub mod controller;
pub mod distributor;
pub mod funds;
pub mod init;
pub mod status;

use bth_distributor_core::{format_amount, Allocation, Bucket};

/// Print the non-zero parts of an allocation, one bucket per line.
pub(crate) fn print_allocation(allocation: &Allocation) {
    if allocation.is_empty() {
        println!("  (nothing)");
        return;
    }
    for bucket in Bucket::ALL {
        let amount = allocation.get(bucket);
        if amount > 0 {
            println!("  {:<14} {}", bucket, format_amount(amount));
        }
    }
}
