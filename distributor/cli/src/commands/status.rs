// Copyright (c) 2024 The Botho Foundation

use anyhow::Result;
use bth_distributor_core::{format_amount, Address, Bucket, Role};

use crate::{store::Session, Context};

/// Show the managed distributor and controller.
pub fn run(ctx: &Context) -> Result<()> {
    let session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let ledger = session.runtime.distributor(distributor)?;
    let held = session.runtime.balance_of(distributor);

    println!();
    println!("=== Reward Distributor ===");
    println!();
    println!("  Address:           {}", distributor);
    println!("  Schema:            {}", ledger.schema_version());
    println!("  Owner:             {}", ledger.owner());
    println!(
        "  Upgrade authority: {}",
        session.runtime.upgrade_authority(distributor)?
    );
    println!();
    println!("Balances:");
    println!("  held           {}", format_amount(held));
    println!("  allocated      {}", format_amount(ledger.allocated_balance()));
    println!("  unallocated    {}", format_amount(ledger.unallocated(held)));
    for bucket in ledger.schema_version().active_buckets() {
        println!("  {:<14} {}", bucket, format_amount(ledger.balance_of(*bucket)));
    }
    println!();
    println!("Coefficients (of {}):", ledger.total_coefficient());
    println!("  stakers        {}", ledger.stakers_coefficient());
    println!("  master_nodes   {}", ledger.master_nodes_coefficient());
    println!("  publishers     {}", ledger.publishers_coefficient());
    println!("  gather         {}", ledger.gather_coefficient());
    if let Some(v2) = ledger.v2_coefficients() {
        println!("  new_stakers      {}", v2.new_stakers);
        println!("  new_master_nodes {}", v2.new_master_nodes);
        println!("  burn_publishers  {}", v2.burn_publishers);
        println!("  burn_gather      {}", v2.burn_gather);
    }

    if let Some(controller) = session.controller {
        let front = session.runtime.controller(controller)?;
        println!();
        println!("Controller:");
        println!("  Address: {}", controller);
        for role in [Role::DEFAULT_ADMIN, Role::stakers()] {
            let members: Vec<String> = front.roles().members(role).map(|a| a.to_string()).collect();
            let members = if members.is_empty() {
                "(none)".to_string()
            } else {
                members.join(", ")
            };
            println!("  {:?}: {}", role, members);
        }
    }

    println!();
    println!(
        "Total supply: {} (burned {})",
        format_amount(session.runtime.state().total_supply()),
        format_amount(session.runtime.state().burned())
    );
    println!();
    Ok(())
}

/// Show the native balance of an account.
pub fn balance(ctx: &Context, account: Address) -> Result<()> {
    let session = Session::open(&ctx.state_path)?;
    println!("{} {}", account, format_amount(session.runtime.balance_of(account)));
    Ok(())
}

/// Show the most recent events.
pub fn events(ctx: &Context, limit: usize) -> Result<()> {
    let session = Session::open(&ctx.state_path)?;
    let events = session.runtime.events();
    let start = events.len().saturating_sub(limit);
    for (index, logged) in events.iter().enumerate().skip(start) {
        println!("#{:<4} {} {}", index, logged.emitter, logged.event);
    }
    Ok(())
}

/// Balance of a single bucket, for scripting.
pub fn bucket(ctx: &Context, bucket: Bucket) -> Result<()> {
    let session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let ledger = session.runtime.distributor(distributor)?;
    println!("{}", format_amount(ledger.balance_of(bucket)));
    Ok(())
}
