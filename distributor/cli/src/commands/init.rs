// Copyright (c) 2024 The Botho Foundation

use anyhow::Result;

use crate::{store::Session, Context};

/// Deploy a distributor, and optionally a controller that takes ownership
/// of it.
pub fn run(ctx: &Context, with_controller: bool, force: bool) -> Result<()> {
    let mut session = Session::create(&ctx.state_path, force)?;
    let distributor = session
        .runtime
        .deploy_distributor(ctx.from, ctx.config.genesis)?;
    session.distributor = Some(distributor);

    println!("Reward distributor deployed at {}", distributor);
    println!("  Owner:             {}", ctx.from);
    println!("  Upgrade authority: {}", ctx.from);

    if with_controller {
        let controller = session.runtime.deploy_controller(ctx.from, distributor)?;
        session
            .runtime
            .transfer_ownership(ctx.from, distributor, controller)?;
        session.controller = Some(controller);
        println!("Controller deployed at {}", controller);
        println!("  Distributor ownership transferred to the controller");
    }

    session.save()
}
