// Copyright (c) 2024 The Botho Foundation

//! Direct calls on the managed distributor.

use anyhow::Result;
use bth_distributor_core::{
    format_amount, Address, Bucket, Coefficient, CoefficientUpdate, CoefficientsV1,
    CoefficientsV2, Recipients,
};

use super::print_allocation;
use crate::{store::Session, Context};

/// Coefficients as given on the command line.
#[derive(Debug, Clone, Copy)]
pub struct CoefficientArgs {
    pub stakers: Coefficient,
    pub master_nodes: Coefficient,
    pub publishers: Coefficient,
    pub gather: Coefficient,
    pub burn_publishers: Option<Coefficient>,
    pub burn_gather: Option<Coefficient>,
}

pub fn allocate(ctx: &Context) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let allocation = session.runtime.allocate_rewards(ctx.from, distributor)?;
    println!("Allocated {}:", format_amount(allocation.total()));
    print_allocation(&allocation);
    session.save()
}

pub fn withdraw(ctx: &Context, bucket: Bucket, to: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let amount = session.runtime.withdraw(ctx.from, distributor, bucket, to)?;
    if amount == 0 {
        println!("The {} bucket is empty", bucket);
    } else {
        println!("Withdrew {} from {} to {}", format_amount(amount), bucket, to);
    }
    session.save()
}

pub fn withdraw_all(ctx: &Context, recipients: &Recipients) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let paid = session
        .runtime
        .withdraw_all(ctx.from, distributor, recipients)?;
    println!("Withdrew {}:", format_amount(paid.total()));
    print_allocation(&paid);
    session.save()
}

pub fn burn(ctx: &Context) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let amount = session.runtime.burn(ctx.from, distributor)?;
    println!("Burned {}", format_amount(amount));
    session.save()
}

/// Install new coefficients. The burn splits are required exactly when
/// the distributor runs schema V2.
pub fn update_coefficients(ctx: &Context, args: CoefficientArgs) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let migrated = session.runtime.distributor(distributor)?.is_migrated();

    let update = match (migrated, args.burn_publishers, args.burn_gather) {
        (false, None, None) => CoefficientUpdate::V1(CoefficientsV1::new(
            args.stakers,
            args.master_nodes,
            args.publishers,
            args.gather,
        )),
        (true, Some(burn_publishers), Some(burn_gather)) => {
            CoefficientUpdate::V2(CoefficientsV2::new(
                args.stakers,
                args.master_nodes,
                args.publishers,
                args.gather,
                burn_publishers,
                burn_gather,
            ))
        }
        (false, _, _) => {
            anyhow::bail!("Burn coefficients only apply after the V2 migration")
        }
        (true, _, _) => anyhow::bail!(
            "A V2 distributor needs both --burn-publishers and --burn-gather"
        ),
    };

    session
        .runtime
        .update_coefficients(ctx.from, distributor, update)?;
    println!("Coefficients of {} updated", distributor);
    session.save()
}

/// Run the one-time V2 migration with the configured burn splits.
pub fn migrate(ctx: &Context) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    let params = ctx.config.migration;
    let settled = session
        .runtime
        .initialize_v2(ctx.from, distributor, &params)?;
    println!("Distributor {} migrated to V2", distributor);
    println!(
        "  Burn splits: publishers {} / gather {}",
        params.burn_publishers, params.burn_gather
    );
    println!("Settled under V1 weights:");
    print_allocation(&settled);
    session.save()
}

pub fn transfer_ownership(ctx: &Context, new_owner: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    session
        .runtime
        .transfer_ownership(ctx.from, distributor, new_owner)?;
    println!("Ownership of {} transferred to {}", distributor, new_owner);
    session.save()
}

pub fn transfer_upgrade_authority(ctx: &Context, new_authority: Address) -> Result<()> {
    let mut session = Session::open(&ctx.state_path)?;
    let distributor = session.distributor()?;
    session
        .runtime
        .transfer_upgrade_authority(ctx.from, distributor, new_authority)?;
    println!(
        "Upgrade authority of {} transferred to {}",
        distributor, new_authority
    );
    session.save()
}
