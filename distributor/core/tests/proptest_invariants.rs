// Copyright (c) 2024 The Botho Foundation

//! Property-based tests for the distributor's accounting invariants.
//!
//! Random sequences of deposits, allocations, withdrawals, burns and the
//! migration must never break conservation: the allocated balance is the
//! sum of the buckets and never exceeds the funds the distributor holds.

mod common;

use bth_distributor_core::{
    Address, Amount, Bucket, CoefficientUpdate, CoefficientsV1, CoefficientsV2, MigrationParams,
    TOTAL_COEFFICIENT,
};
use common::Fixture;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Deposit(Amount),
    Allocate,
    Withdraw(Bucket),
    Burn,
    Migrate,
    UpdateCoefficients(u64, u64, u64),
}

fn bucket_strategy() -> impl Strategy<Value = Bucket> {
    prop_oneof![
        Just(Bucket::Stakers),
        Just(Bucket::MasterNodes),
        Just(Bucket::Gather),
        Just(Bucket::Publishers),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1u128..1_000_000_000_000_000_000_000u128).prop_map(Op::Deposit),
        3 => Just(Op::Allocate),
        3 => bucket_strategy().prop_map(Op::Withdraw),
        1 => Just(Op::Burn),
        1 => Just(Op::Migrate),
        1 => (0..=TOTAL_COEFFICIENT, 0..=TOTAL_COEFFICIENT, 0..=TOTAL_COEFFICIENT)
            .prop_map(|(a, b, c)| Op::UpdateCoefficients(a, b, c)),
    ]
}

/// Apply `op`, ignoring rejected calls: a rejection must leave state as is.
fn apply(fx: &mut Fixture, op: &Op) {
    let recipient = Address::derive("recipient");
    let rt = &mut fx.rt;
    let (deployer, distributor) = (fx.deployer, fx.distributor);
    let _ = match op {
        Op::Deposit(amount) => rt.deposit(deployer, distributor, *amount),
        Op::Allocate => rt.allocate_rewards(deployer, distributor).map(|_| ()),
        Op::Withdraw(bucket) => rt.withdraw(deployer, distributor, *bucket, recipient).map(|_| ()),
        Op::Burn => rt.burn(deployer, distributor).map(|_| ()),
        Op::Migrate => rt
            .initialize_v2(deployer, distributor, &MigrationParams::default())
            .map(|_| ()),
        Op::UpdateCoefficients(stakers, gather, burn) => {
            // Complete the top-level split so most updates are valid.
            let stakers = *stakers / 2;
            let master_nodes = TOTAL_COEFFICIENT / 2 - stakers;
            let publishers = TOTAL_COEFFICIENT - stakers - master_nodes;
            let update = if rt.distributor(distributor).map_or(false, |l| l.is_migrated()) {
                CoefficientUpdate::V2(CoefficientsV2::new(
                    stakers,
                    master_nodes,
                    publishers,
                    *gather,
                    *burn,
                    *burn,
                ))
            } else {
                CoefficientUpdate::V1(CoefficientsV1::new(stakers, master_nodes, publishers, *gather))
            };
            rt.update_coefficients(deployer, distributor, update)
        }
    };
}

proptest! {
    /// Property: the books always balance.
    #[test]
    fn prop_allocated_equals_bucket_sum(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut fx = Fixture::new();
        for op in &ops {
            apply(&mut fx, op);
            let ledger = fx.ledger();
            prop_assert_eq!(ledger.allocated_balance(), ledger.bucket_sum(), "after {:?}", op);
            prop_assert!(ledger.allocated_balance() <= fx.held(), "after {:?}", op);
        }
    }

    /// Property: allocation distributes exactly the unallocated delta.
    #[test]
    fn prop_allocation_reaches_held(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut fx = Fixture::new();
        for op in &ops {
            apply(&mut fx, op);
        }
        let before = fx.ledger().allocated_balance();
        let allocation = fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();
        prop_assert_eq!(before + allocation.total(), fx.held());
        prop_assert_eq!(fx.ledger().allocated_balance(), fx.held());

        // Idempotent once settled.
        let again = fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();
        prop_assert!(again.is_empty());
    }

    /// Property: withdrawing a bucket zeroes it and never increases another.
    #[test]
    fn prop_withdraw_touches_only_its_bucket(
        ops in prop::collection::vec(op_strategy(), 0..30),
        bucket in bucket_strategy(),
    ) {
        let mut fx = Fixture::new();
        for op in &ops {
            apply(&mut fx, op);
        }
        let before = fx.ledger().clone();
        if fx.rt.withdraw(fx.deployer, fx.distributor, bucket, Address::derive("to")).is_ok() {
            let after = fx.ledger();
            prop_assert_eq!(after.balance_of(bucket), 0);
            for other in Bucket::ALL.iter().filter(|b| **b != bucket) {
                prop_assert_eq!(after.balance_of(*other), before.balance_of(*other));
            }
        }
    }

    /// Property: the migration happens at most once.
    #[test]
    fn prop_migration_at_most_once(ops in prop::collection::vec(op_strategy(), 0..30)) {
        let mut fx = Fixture::new();
        let mut migrations = 0;
        for op in &ops {
            let was_migrated = fx.ledger().is_migrated();
            apply(&mut fx, op);
            if !was_migrated && fx.ledger().is_migrated() {
                migrations += 1;
            }
        }
        prop_assert!(migrations <= 1);
    }
}
