// Copyright (c) 2024 The Botho Foundation

//! BTH Reward Distributor operator tool.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, Level};

use bth_distributor_cli::{accounts, commands, commands::distributor::CoefficientArgs, Context};
use bth_distributor_core::{Bucket, Coefficient, DistributorConfig, Recipients, Role};

#[derive(Parser)]
#[command(name = "bth-distributor")]
#[command(about = "Deploy and operate BTH reward distributors", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "distributor.toml")]
    config: PathBuf,

    /// Path to the state file (overrides the configured one)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Account issuing the call (label or 0x address)
    #[arg(long, global = true, default_value = "deployer")]
    from: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new reward distributor
    Init {
        /// Also deploy a controller and hand it ownership of the distributor
        #[arg(long)]
        with_controller: bool,

        /// Overwrite existing state
        #[arg(long)]
        force: bool,
    },

    /// Credit an account with new funds
    Fund {
        /// Account to credit
        account: String,

        /// Amount (in BTH, e.g. 7.5)
        amount: String,
    },

    /// Send funds from the caller to the distributor
    Deposit {
        /// Amount (in BTH, e.g. 7.5)
        amount: String,
    },

    /// Allocate unallocated funds to the buckets
    Allocate,

    /// Withdraw a bucket's balance to a recipient
    Withdraw {
        /// stakers, master-nodes, gather or publishers
        bucket: Bucket,

        /// Recipient account
        to: String,
    },

    /// Withdraw every bucket in one call
    WithdrawAll {
        #[arg(long)]
        stakers: String,

        #[arg(long)]
        master_nodes: String,

        #[arg(long)]
        gather: String,

        /// Required once migrated to V2
        #[arg(long)]
        publishers: Option<String>,
    },

    /// Destroy the burn bucket (V2)
    Burn,

    /// Replace the active coefficients
    UpdateCoefficients {
        #[arg(long)]
        stakers: Coefficient,

        #[arg(long)]
        master_nodes: Coefficient,

        #[arg(long)]
        publishers: Coefficient,

        #[arg(long)]
        gather: Coefficient,

        /// V2 only
        #[arg(long)]
        burn_publishers: Option<Coefficient>,

        /// V2 only
        #[arg(long)]
        burn_gather: Option<Coefficient>,
    },

    /// Run the one-time V2 migration
    Migrate,

    /// Transfer ownership of the distributor
    TransferOwnership {
        new_owner: String,
    },

    /// Transfer the upgrade authority of the distributor
    TransferUpgradeAuthority {
        new_authority: String,
    },

    /// Calls through the controller
    #[command(subcommand)]
    Controller(ControllerCommands),

    /// Show distributor status
    Status,

    /// Show an account balance
    Balance {
        account: String,
    },

    /// Show a single bucket balance
    Bucket {
        bucket: Bucket,
    },

    /// Show recent events
    Events {
        /// Number of events to show
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum ControllerCommands {
    /// Move ownership of the distributor (DEFAULT_ADMIN_ROLE)
    ChangeOwner { new_owner: String },

    /// Grant a role (e.g. STAKERS_ROLE)
    GrantRole { role: Role, account: String },

    /// Revoke a role
    RevokeRole { role: Role, account: String },

    /// Give up a role held by the caller
    RenounceRole { role: Role },

    /// Allocate through the controller (STAKERS_ROLE)
    Allocate,

    /// Withdraw the stakers bucket through the controller (STAKERS_ROLE)
    WithdrawStakers { to: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = if cli.config.exists() {
        debug!("Loading configuration from {}", cli.config.display());
        DistributorConfig::from_file(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        debug!("Using default configuration");
        DistributorConfig::default()
    };

    let ctx = Context {
        state_path: cli.state.unwrap_or_else(|| config.cli.state_path.clone()),
        from: accounts::resolve(&cli.from)?,
        config,
    };

    match cli.command {
        Commands::Init {
            with_controller,
            force,
        } => commands::init::run(&ctx, with_controller, force),
        Commands::Fund { account, amount } => {
            commands::funds::fund(&ctx, accounts::resolve(&account)?, &amount)
        }
        Commands::Deposit { amount } => commands::funds::deposit(&ctx, &amount),
        Commands::Allocate => commands::distributor::allocate(&ctx),
        Commands::Withdraw { bucket, to } => {
            commands::distributor::withdraw(&ctx, bucket, accounts::resolve(&to)?)
        }
        Commands::WithdrawAll {
            stakers,
            master_nodes,
            gather,
            publishers,
        } => {
            let recipients = Recipients {
                stakers: accounts::resolve(&stakers)?,
                master_nodes: accounts::resolve(&master_nodes)?,
                gather: accounts::resolve(&gather)?,
                publishers: publishers.as_deref().map(accounts::resolve).transpose()?,
            };
            commands::distributor::withdraw_all(&ctx, &recipients)
        }
        Commands::Burn => commands::distributor::burn(&ctx),
        Commands::UpdateCoefficients {
            stakers,
            master_nodes,
            publishers,
            gather,
            burn_publishers,
            burn_gather,
        } => commands::distributor::update_coefficients(
            &ctx,
            CoefficientArgs {
                stakers,
                master_nodes,
                publishers,
                gather,
                burn_publishers,
                burn_gather,
            },
        ),
        Commands::Migrate => commands::distributor::migrate(&ctx),
        Commands::TransferOwnership { new_owner } => {
            commands::distributor::transfer_ownership(&ctx, accounts::resolve(&new_owner)?)
        }
        Commands::TransferUpgradeAuthority { new_authority } => {
            commands::distributor::transfer_upgrade_authority(
                &ctx,
                accounts::resolve(&new_authority)?,
            )
        }
        Commands::Controller(command) => match command {
            ControllerCommands::ChangeOwner { new_owner } => {
                commands::controller::change_owner(&ctx, accounts::resolve(&new_owner)?)
            }
            ControllerCommands::GrantRole { role, account } => {
                commands::controller::grant_role(&ctx, role, accounts::resolve(&account)?)
            }
            ControllerCommands::RevokeRole { role, account } => {
                commands::controller::revoke_role(&ctx, role, accounts::resolve(&account)?)
            }
            ControllerCommands::RenounceRole { role } => {
                commands::controller::renounce_role(&ctx, role)
            }
            ControllerCommands::Allocate => commands::controller::allocate(&ctx),
            ControllerCommands::WithdrawStakers { to } => {
                commands::controller::withdraw_stakers(&ctx, accounts::resolve(&to)?)
            }
        },
        Commands::Status => commands::status::run(&ctx),
        Commands::Balance { account } => {
            commands::status::balance(&ctx, accounts::resolve(&account)?)
        }
        Commands::Bucket { bucket } => commands::status::bucket(&ctx, bucket),
        Commands::Events { limit } => commands::status::events(&ctx, limit),
    }
}
