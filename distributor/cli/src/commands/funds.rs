// Copyright (c) 2024 The Botho Foundation

use anyhow::Result;
use bth_distributor_core::{format_amount, parse_amount, Address};

use crate::{store::Session, Context};

/// Credit `amount` to `account` out of thin air.
pub fn fund(ctx: &Context, account: Address, amount: &str) -> Result<()> {
    let amount = parse_amount(amount)?;
    let mut session = Session::open(&ctx.state_path)?;
    session.runtime.mint(account, amount)?;
    println!(
        "Funded {} with {} (balance {})",
        account,
        format_amount(amount),
        format_amount(session.runtime.balance_of(account))
    );
    session.save()
}

/// Send `amount` from the caller to the distributor.
pub fn deposit(ctx: &Context, amount: &str) -> Result<()> {
    let amount = parse_amount(amount)?;
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    session.runtime.deposit(ctx.from, distributor, amount)?;
    println!(
        "Deposited {} into {} (held {})",
        format_amount(amount),
        distributor,
        format_amount(session.runtime.balance_of(distributor))
    );
    session.save()
}
