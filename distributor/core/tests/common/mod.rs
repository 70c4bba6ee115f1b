// Copyright (c) 2024 The Botho Foundation

//! Shared fixtures for the distributor integration tests.

#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc};

use bth_distributor_core::{
    bth, Address, Amount, CoefficientsV1, DistributorError, Recipient, Result, Runtime,
    UNITS_PER_BTH,
};

/// `n` tenths of a coin.
pub fn tenths(n: u128) -> Amount {
    n * UNITS_PER_BTH / 10
}

pub struct Fixture {
    pub rt: Runtime,
    pub deployer: Address,
    pub distributor: Address,
}

impl Fixture {
    /// A funded deployer and a fresh V1 distributor with default
    /// coefficients.
    pub fn new() -> Self {
        let deployer = Address::derive("deployer");
        let mut rt = Runtime::new();
        rt.mint(deployer, bth(10_000)).unwrap();
        let distributor = rt
            .deploy_distributor(deployer, CoefficientsV1::default())
            .unwrap();
        Self {
            rt,
            deployer,
            distributor,
        }
    }

    pub fn deposit(&mut self, amount: Amount) {
        self.rt
            .deposit(self.deployer, self.distributor, amount)
            .unwrap();
    }

    pub fn held(&self) -> Amount {
        self.rt.balance_of(self.distributor)
    }

    pub fn ledger(&self) -> &bth_distributor_core::RewardDistributor {
        self.rt.distributor(self.distributor).unwrap()
    }
}

/// Rejects every incoming transfer.
pub struct Rejecting;

impl Recipient for Rejecting {
    fn on_receive(&mut self, _: &mut Runtime, from: Address, _: Amount) -> Result<()> {
        Err(DistributorError::Forbidden {
            caller: from,
            reason: "recipient does not accept funds".to_string(),
        })
    }
}

/// Records every amount it receives.
#[derive(Clone, Default)]
pub struct Recorder {
    pub received: Rc<RefCell<Vec<Amount>>>,
}

impl Recipient for Recorder {
    fn on_receive(&mut self, _: &mut Runtime, _: Address, amount: Amount) -> Result<()> {
        self.received.borrow_mut().push(amount);
        Ok(())
    }
}
