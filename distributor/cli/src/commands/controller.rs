// Copyright (c) 2024 The Botho Foundation

//! Calls routed through the managed controller.

use anyhow::Result;
use bth_distributor_core::{format_amount, Address, Role};

use super::print_allocation;
use crate::{store::Session, Context};

pub fn change_owner(ctx: &Context, new_owner: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    session
        .runtime
        .change_reward_distributor_owner(ctx.from, controller, new_owner)?;
    println!("Distributor ownership transferred to {}", new_owner);
    session.save()
}

pub fn grant_role(ctx: &Context, role: Role, account: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    if session.runtime.grant_role(ctx.from, controller, role, account)? {
        println!("Granted {:?} to {}", role, account);
    } else {
        println!("{} already holds {:?}", account, role);
    }
    session.save()
}

pub fn revoke_role(ctx: &Context, role: Role, account: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    if session.runtime.revoke_role(ctx.from, controller, role, account)? {
        println!("Revoked {:?} from {}", role, account);
    } else {
        println!("{} does not hold {:?}", account, role);
    }
    session.save()
}

pub fn renounce_role(ctx: &Context, role: Role) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    if session.runtime.renounce_role(ctx.from, controller, role)? {
        println!("{} renounced {:?}", ctx.from, role);
    } else {
        println!("{} does not hold {:?}", ctx.from, role);
    }
    session.save()
}

pub fn allocate(ctx: &Context) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    let allocation = session
        .runtime
        .controller_allocate_rewards(ctx.from, controller)?;
    println!("Allocated {}:", format_amount(allocation.total()));
    print_allocation(&allocation);
    session.save()
}

pub fn withdraw_stakers(ctx: &Context, to: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let controller = session.controller()?;
    let amount = session
        .runtime
        .controller_withdraw_stakers_balance(ctx.from, controller, to)?;
    println!("Withdrew {} of stakers rewards to {}", format_amount(amount), to);
    session.save()
}
