// Copyright (c) 2024 The Botho Foundation

//! Recipients that call back into the runtime while being paid.

mod common;

use std::{cell::RefCell, rc::Rc};

use assert_matches::assert_matches;
use bth_distributor_core::{
    bth, Address, Amount, Bucket, DistributorError, Recipient, Recipients, Result, Role, Runtime,
};
use common::{tenths, Fixture, Recorder, Rejecting};

/// What a re-entering recipient saw during its callback.
#[derive(Debug, Default)]
struct Observation {
    stakers_balance: Option<Amount>,
    nested_withdrawal: Option<Result<Amount>>,
}

/// A staking contract that tries to withdraw again through the controller
/// every time it is paid.
struct GreedyStaking {
    address: Address,
    controller: Address,
    distributor: Address,
    seen: Rc<RefCell<Observation>>,
}

impl Recipient for GreedyStaking {
    fn on_receive(&mut self, rt: &mut Runtime, _: Address, _: Amount) -> Result<()> {
        let stakers_balance = rt.distributor(self.distributor)?.stakers_balance();
        let nested = rt.controller_withdraw_stakers_balance(self.address, self.controller, self.address);
        let mut seen = self.seen.borrow_mut();
        seen.stakers_balance = Some(stakers_balance);
        seen.nested_withdrawal = Some(nested);
        Ok(())
    }
}

/// Re-enters with a plain allocation while being paid.
struct Reallocator {
    distributor: Address,
    seen: Rc<RefCell<Vec<(Amount, Amount)>>>,
}

impl Recipient for Reallocator {
    fn on_receive(&mut self, rt: &mut Runtime, _: Address, _: Amount) -> Result<()> {
        let allocation = rt.allocate_rewards(Address::derive("anyone"), self.distributor)?;
        let ledger = rt.distributor(self.distributor)?;
        self.seen
            .borrow_mut()
            .push((allocation.total(), ledger.allocated_balance()));
        Ok(())
    }
}

#[test]
fn test_reentrant_withdrawal_sees_empty_bucket() {
    let mut fx = Fixture::new();
    let controller = fx.rt.deploy_controller(fx.deployer, fx.distributor).unwrap();
    fx.rt
        .transfer_ownership(fx.deployer, fx.distributor, controller)
        .unwrap();
    let staking = Address::derive("staking-contract");
    fx.rt
        .grant_role(fx.deployer, controller, Role::stakers(), staking)
        .unwrap();
    fx.deposit(bth(51));
    fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();

    let seen = Rc::new(RefCell::new(Observation::default()));
    fx.rt.register_recipient(
        staking,
        Box::new(GreedyStaking {
            address: staking,
            controller,
            distributor: fx.distributor,
            seen: seen.clone(),
        }),
    );

    let amount = fx
        .rt
        .controller_withdraw_stakers_balance(staking, controller, staking)
        .unwrap();
    assert_eq!(amount, tenths(75));

    let seen = seen.borrow();
    assert_eq!(seen.stakers_balance, Some(0));
    assert_eq!(seen.nested_withdrawal, Some(Ok(0)));
    assert_eq!(fx.rt.balance_of(staking), tenths(75));
    assert_eq!(fx.held(), tenths(435));
    assert_eq!(fx.ledger().allocated_balance(), tenths(435));
}

#[test]
fn test_reentrant_allocation_finds_nothing_new() {
    let mut fx = Fixture::new();
    fx.deposit(bth(51));
    fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();

    let gather = Address::derive("gather");
    let seen = Rc::new(RefCell::new(Vec::new()));
    fx.rt.register_recipient(
        gather,
        Box::new(Reallocator {
            distributor: fx.distributor,
            seen: seen.clone(),
        }),
    );
    fx.rt
        .withdraw_gather_balance(fx.deployer, fx.distributor, gather)
        .unwrap();

    assert_eq!(seen.borrow().as_slice(), &[(0, tenths(300))]);
    assert_eq!(fx.ledger().allocated_balance(), fx.held());
}

#[test]
fn test_rejecting_recipient_reverts_withdrawal() {
    let mut fx = Fixture::new();
    fx.deposit(bth(51));
    fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();
    let before = fx.rt.state().clone();

    let sink = Address::derive("sink");
    fx.rt.register_recipient(sink, Box::new(Rejecting));
    assert_matches!(
        fx.rt.withdraw(fx.deployer, fx.distributor, Bucket::MasterNodes, sink),
        Err(DistributorError::TransferFailed { to, amount, .. })
            if to == sink && amount == tenths(225)
    );
    assert_eq!(fx.rt.state(), &before);
    assert_eq!(fx.ledger().master_nodes_balance(), tenths(225));
}

#[test]
fn test_withdraw_all_is_atomic() {
    let mut fx = Fixture::new();
    fx.deposit(bth(51));
    fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();
    let before = fx.rt.state().clone();

    let stakers = Address::derive("stakers");
    let recorder = Recorder::default();
    fx.rt.register_recipient(stakers, Box::new(recorder.clone()));
    let gather = Address::derive("gather");
    fx.rt.register_recipient(gather, Box::new(Rejecting));

    let recipients = Recipients {
        stakers,
        master_nodes: Address::derive("mn"),
        gather,
        publishers: None,
    };
    assert_matches!(
        fx.rt.withdraw_all(fx.deployer, fx.distributor, &recipients),
        Err(DistributorError::TransferFailed { to, .. }) if to == gather
    );

    // The stakers payout happened and was rolled back with the rest.
    assert_eq!(recorder.received.borrow().as_slice(), &[tenths(75)]);
    assert_eq!(fx.rt.state(), &before);
    assert_eq!(fx.rt.balance_of(stakers), 0);
}

#[test]
fn test_hook_errors_surface_as_transfer_failures() {
    struct Failing;

    impl Recipient for Failing {
        fn on_receive(&mut self, rt: &mut Runtime, _: Address, _: Amount) -> Result<()> {
            // Tries to spend more than it has.
            rt.transfer(Address::derive("failing"), Address::derive("elsewhere"), bth(1_000))
        }
    }

    let mut fx = Fixture::new();
    fx.deposit(bth(51));
    fx.rt.allocate_rewards(fx.deployer, fx.distributor).unwrap();
    let failing = Address::derive("failing");
    fx.rt.register_recipient(failing, Box::new(Failing));

    let err = fx
        .rt
        .withdraw_stakers_balance(fx.deployer, fx.distributor, failing)
        .unwrap_err();
    assert_matches!(&err, DistributorError::TransferFailed { reason, .. } if reason.contains("Insufficient balance"));
    assert_eq!(fx.ledger().stakers_balance(), tenths(75));
}
