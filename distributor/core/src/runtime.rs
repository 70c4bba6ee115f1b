// Copyright (c) 2024 The Botho Foundation

//! Deterministic execution environment for distributors and controllers.
//!
//! The [`Runtime`] owns the native balance of every account, the deployed
//! contracts and the event log. Every public call is applied atomically: the
//! world state is snapshotted on entry and restored if the call fails, so a
//! failed call leaves no trace, events included.
//!
//! Value transfers may invoke a [`Recipient`] hook registered for the
//! receiving account. Hooks get mutable access to the runtime and can issue
//! nested calls, each of which is its own atomic frame. A hook error fails
//! the transfer, and with it the outer call.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    access::Role,
    address::Address,
    bucket::Bucket,
    coefficients::{Allocation, CoefficientUpdate, CoefficientsV1, MigrationParams},
    controller::RewardDistributorController,
    distributor::RewardDistributor,
    error::{DistributorError, Result},
    events::{Event, LoggedEvent},
    units::{format_amount, Amount},
};

/// Code that runs when an account receives native currency.
pub trait Recipient {
    /// Called after `amount` has been credited. Returning an error rejects
    /// the transfer.
    fn on_receive(&mut self, runtime: &mut Runtime, from: Address, amount: Amount) -> Result<()>;
}

/// A deployed distributor behind its upgrade authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributorDeployment {
    /// Identity allowed to install the V2 schema.
    pub upgrade_authority: Address,
    pub ledger: RewardDistributor,
}

/// Everything the runtime persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    balances: BTreeMap<Address, Amount>,
    nonces: BTreeMap<Address, u64>,
    distributors: BTreeMap<Address, DistributorDeployment>,
    controllers: BTreeMap<Address, RewardDistributorController>,
    /// Total ever minted into the runtime.
    minted: Amount,
    /// Total destroyed by distributor burns.
    burned: Amount,
    events: Vec<LoggedEvent>,
}

impl WorldState {
    pub fn balance_of(&self, account: Address) -> Amount {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    /// Native currency in existence.
    pub fn total_supply(&self) -> Amount {
        self.minted - self.burned
    }

    pub fn burned(&self) -> Amount {
        self.burned
    }

    pub fn distributors(&self) -> impl Iterator<Item = (&Address, &DistributorDeployment)> {
        self.distributors.iter()
    }

    pub fn controllers(&self) -> impl Iterator<Item = (&Address, &RewardDistributorController)> {
        self.controllers.iter()
    }

    pub fn events(&self) -> &[LoggedEvent] {
        &self.events
    }
}

/// Recipients for `withdraw_all`, one per withdrawable bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipients {
    pub stakers: Address,
    pub master_nodes: Address,
    pub gather: Address,
    /// Required once the distributor runs schema V2.
    pub publishers: Option<Address>,
}

impl Recipients {
    pub fn for_bucket(&self, bucket: Bucket) -> Result<Address> {
        match bucket {
            Bucket::Stakers => Ok(self.stakers),
            Bucket::MasterNodes => Ok(self.master_nodes),
            Bucket::Gather => Ok(self.gather),
            Bucket::Publishers => self.publishers.ok_or(DistributorError::MissingRecipient(bucket)),
            Bucket::Burn => Err(DistributorError::MissingRecipient(bucket)),
        }
    }
}

#[derive(Default)]
pub struct Runtime {
    state: WorldState,
    recipients: HashMap<Address, Box<dyn Recipient>>,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("state", &self.state)
            .field("recipients", &self.recipients.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from persisted state. Recipient hooks are not persisted.
    pub fn from_state(state: WorldState) -> Self {
        Self {
            state,
            recipients: HashMap::new(),
        }
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn into_state(self) -> WorldState {
        self.state
    }

    pub fn register_recipient(&mut self, account: Address, hook: Box<dyn Recipient>) {
        self.recipients.insert(account, hook);
    }

    pub fn remove_recipient(&mut self, account: Address) -> Option<Box<dyn Recipient>> {
        self.recipients.remove(&account)
    }

    // === Queries ===

    pub fn balance_of(&self, account: Address) -> Amount {
        self.state.balance_of(account)
    }

    pub fn events(&self) -> &[LoggedEvent] {
        self.state.events()
    }

    fn deployment(&self, distributor: Address) -> Result<&DistributorDeployment> {
        self.state
            .distributors
            .get(&distributor)
            .ok_or(DistributorError::UnknownContract(distributor))
    }

    fn deployment_mut(&mut self, distributor: Address) -> Result<&mut DistributorDeployment> {
        self.state
            .distributors
            .get_mut(&distributor)
            .ok_or(DistributorError::UnknownContract(distributor))
    }

    pub fn distributor(&self, distributor: Address) -> Result<&RewardDistributor> {
        Ok(&self.deployment(distributor)?.ledger)
    }

    pub fn upgrade_authority(&self, distributor: Address) -> Result<Address> {
        Ok(self.deployment(distributor)?.upgrade_authority)
    }

    pub fn controller(&self, controller: Address) -> Result<&RewardDistributorController> {
        self.state
            .controllers
            .get(&controller)
            .ok_or(DistributorError::UnknownContract(controller))
    }

    fn controller_mut(&mut self, controller: Address) -> Result<&mut RewardDistributorController> {
        self.state
            .controllers
            .get_mut(&controller)
            .ok_or(DistributorError::UnknownContract(controller))
    }

    fn ledger_mut(&mut self, distributor: Address) -> Result<&mut RewardDistributor> {
        Ok(&mut self.deployment_mut(distributor)?.ledger)
    }

    // === Execution plumbing ===

    /// Run `call` as one atomic frame.
    fn atomic<T>(&mut self, operation: &str, call: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let events_len = self.state.events.len();
        let events = std::mem::take(&mut self.state.events);
        let snapshot = self.state.clone();
        self.state.events = events;

        match call(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!("{} reverted: {}", operation, e);
                let mut events = std::mem::take(&mut self.state.events);
                events.truncate(events_len);
                self.state = snapshot;
                self.state.events = events;
                Err(e)
            }
        }
    }

    fn emit(&mut self, emitter: Address, event: Event) {
        debug!("{} emitted {}", emitter, event);
        self.state.events.push(LoggedEvent { emitter, event });
    }

    fn next_contract_address(&mut self, deployer: Address) -> Address {
        let nonce = self.state.nonces.entry(deployer).or_default();
        let address = Address::derive(&format!("{}/{}", deployer, nonce));
        *nonce += 1;
        address
    }

    fn is_contract(&self, account: Address) -> bool {
        self.state.distributors.contains_key(&account) || self.state.controllers.contains_key(&account)
    }

    /// Contract accounts are only debited through their own calls.
    fn ensure_externally_owned(&self, from: Address) -> Result<()> {
        if self.is_contract(from) {
            return Err(DistributorError::forbidden(
                from,
                "contract funds move only through contract calls",
            ));
        }
        Ok(())
    }

    /// Move native currency and run the recipient hook, if any.
    fn send_value(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(DistributorError::InsufficientBalance {
                available,
                requested: amount,
            });
        }
        // A self-transfer leaves balances as they are.
        if from != to {
            let credited = self
                .balance_of(to)
                .checked_add(amount)
                .ok_or(DistributorError::ArithmeticOverflow)?;
            self.state.balances.insert(from, available - amount);
            self.state.balances.insert(to, credited);
            debug!("Transferred {} from {} to {}", format_amount(amount), from, to);

            if self.state.distributors.contains_key(&to) {
                self.emit(to, Event::Deposited { from, amount });
            }
        }

        // Detached while running so it cannot be re-entered.
        if let Some(mut hook) = self.recipients.remove(&to) {
            let result = hook.on_receive(self, from, amount);
            self.recipients.insert(to, hook);
            result.map_err(|e| DistributorError::TransferFailed {
                to,
                amount,
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    // === Accounts ===

    /// Create `amount` out of thin air in `account`. Funding for local use.
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<()> {
        self.atomic("mint", |rt| {
            let balance = rt
                .balance_of(account)
                .checked_add(amount)
                .ok_or(DistributorError::ArithmeticOverflow)?;
            rt.state.minted = rt
                .state
                .minted
                .checked_add(amount)
                .ok_or(DistributorError::ArithmeticOverflow)?;
            rt.state.balances.insert(account, balance);
            info!("Minted {} to {}", format_amount(amount), account);
            Ok(())
        })
    }

    /// Plain value transfer between accounts. `from` may not be a
    /// deployed contract.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        self.atomic("transfer", |rt| {
            rt.ensure_externally_owned(from)?;
            rt.send_value(from, to, amount)
        })
    }

    /// Send `amount` from `from` to a distributor's held funds.
    pub fn deposit(&mut self, from: Address, distributor: Address, amount: Amount) -> Result<()> {
        self.deployment(distributor)?;
        self.atomic("deposit", |rt| {
            rt.ensure_externally_owned(from)?;
            rt.send_value(from, distributor, amount)?;
            info!("Deposited {} into {}", format_amount(amount), distributor);
            Ok(())
        })
    }

    // === Deployment ===

    /// Deploy a V1 distributor. The deployer becomes both its owner and its
    /// upgrade authority.
    pub fn deploy_distributor(&mut self, deployer: Address, coefficients: CoefficientsV1) -> Result<Address> {
        self.atomic("deploy_distributor", |rt| {
            let ledger = RewardDistributor::new(deployer, coefficients)?;
            let address = rt.next_contract_address(deployer);
            rt.state.distributors.insert(
                address,
                DistributorDeployment {
                    upgrade_authority: deployer,
                    ledger,
                },
            );
            rt.emit(
                address,
                Event::OwnershipTransferred {
                    previous_owner: Address::ZERO,
                    new_owner: deployer,
                },
            );
            info!("Deployed reward distributor at {}", address);
            Ok(address)
        })
    }

    /// Deploy a controller for `distributor`. The deployer receives
    /// `DEFAULT_ADMIN_ROLE`. Ownership of the distributor is not moved.
    pub fn deploy_controller(&mut self, deployer: Address, distributor: Address) -> Result<Address> {
        self.atomic("deploy_controller", |rt| {
            rt.deployment(distributor)?;
            let address = rt.next_contract_address(deployer);
            rt.state
                .controllers
                .insert(address, RewardDistributorController::new(deployer, distributor));
            rt.emit(
                address,
                Event::RoleGranted {
                    role: Role::DEFAULT_ADMIN,
                    account: deployer,
                    sender: deployer,
                },
            );
            info!("Deployed controller at {} for {}", address, distributor);
            Ok(address)
        })
    }

    // === Distributor calls ===

    /// Allocate every unallocated held unit. Open to any caller.
    pub fn allocate_rewards(&mut self, caller: Address, distributor: Address) -> Result<Allocation> {
        self.atomic("allocate_rewards", |rt| rt.allocate_in_frame(caller, distributor))
    }

    fn allocate_in_frame(&mut self, caller: Address, distributor: Address) -> Result<Allocation> {
        let held = self.balance_of(distributor);
        let allocation = self.ledger_mut(distributor)?.allocate(held)?;
        if allocation.is_empty() {
            debug!("Nothing to allocate on {}", distributor);
            return Ok(allocation);
        }
        self.emit(distributor, Event::RewardsAllocated { allocation });
        info!(
            "{} allocated {} on {}",
            caller,
            format_amount(allocation.total()),
            distributor
        );
        Ok(allocation)
    }

    /// Pay out the whole balance of `bucket` to `to`. Owner only.
    pub fn withdraw(&mut self, caller: Address, distributor: Address, bucket: Bucket, to: Address) -> Result<Amount> {
        self.atomic("withdraw", |rt| rt.withdraw_in_frame(caller, distributor, bucket, to))
    }

    pub fn withdraw_stakers_balance(&mut self, caller: Address, distributor: Address, to: Address) -> Result<Amount> {
        self.withdraw(caller, distributor, Bucket::Stakers, to)
    }

    pub fn withdraw_master_nodes_balance(
        &mut self,
        caller: Address,
        distributor: Address,
        to: Address,
    ) -> Result<Amount> {
        self.withdraw(caller, distributor, Bucket::MasterNodes, to)
    }

    pub fn withdraw_gather_balance(&mut self, caller: Address, distributor: Address, to: Address) -> Result<Amount> {
        self.withdraw(caller, distributor, Bucket::Gather, to)
    }

    pub fn withdraw_publishers_balance(
        &mut self,
        caller: Address,
        distributor: Address,
        to: Address,
    ) -> Result<Amount> {
        self.withdraw(caller, distributor, Bucket::Publishers, to)
    }

    fn withdraw_in_frame(&mut self, caller: Address, distributor: Address, bucket: Bucket, to: Address) -> Result<Amount> {
        if to.is_zero() {
            return Err(DistributorError::InvalidAddress(
                "recipient is the zero address".to_string(),
            ));
        }
        // Effects first: the bucket is empty before any value moves.
        let amount = self.ledger_mut(distributor)?.take_bucket(caller, bucket)?;
        if amount == 0 {
            debug!("{} bucket of {} is empty", bucket, distributor);
            return Ok(0);
        }
        self.send_value(distributor, to, amount)?;
        self.emit(distributor, Event::BalanceWithdrawn { bucket, to, amount });
        info!(
            "Withdrew {} from {} bucket of {} to {}",
            format_amount(amount),
            bucket,
            distributor,
            to
        );
        Ok(amount)
    }

    /// Empty every withdrawable bucket in one atomic call. Owner only.
    pub fn withdraw_all(&mut self, caller: Address, distributor: Address, recipients: &Recipients) -> Result<Allocation> {
        self.atomic("withdraw_all", |rt| {
            let ledger = rt.distributor(distributor)?;
            ledger.ensure_owner(caller)?;
            let targets = ledger
                .schema_version()
                .withdrawable_buckets()
                .iter()
                .map(|bucket| recipients.for_bucket(*bucket).map(|to| (*bucket, to)))
                .collect::<Result<Vec<_>>>()?;

            let mut paid = Allocation::default();
            for (bucket, to) in targets {
                let amount = rt.withdraw_in_frame(caller, distributor, bucket, to)?;
                match bucket {
                    Bucket::Stakers => paid.stakers = amount,
                    Bucket::MasterNodes => paid.master_nodes = amount,
                    Bucket::Gather => paid.gather = amount,
                    Bucket::Publishers => paid.publishers = amount,
                    Bucket::Burn => paid.burn = amount,
                }
            }
            Ok(paid)
        })
    }

    /// Destroy the burn bucket. V2, owner only.
    pub fn burn(&mut self, caller: Address, distributor: Address) -> Result<Amount> {
        self.atomic("burn", |rt| {
            let amount = rt.ledger_mut(distributor)?.burn(caller)?;
            if amount == 0 {
                debug!("Burn bucket of {} is empty", distributor);
                return Ok(0);
            }
            let held = rt.balance_of(distributor);
            if held < amount {
                return Err(DistributorError::InsufficientBalance {
                    available: held,
                    requested: amount,
                });
            }
            rt.state.balances.insert(distributor, held - amount);
            rt.state.burned += amount;
            rt.emit(distributor, Event::Burned { amount });
            info!("Burned {} from {}", format_amount(amount), distributor);
            Ok(amount)
        })
    }

    pub fn update_coefficients(
        &mut self,
        caller: Address,
        distributor: Address,
        update: CoefficientUpdate,
    ) -> Result<()> {
        self.atomic("update_coefficients", |rt| {
            rt.ledger_mut(distributor)?.update_coefficients(caller, update)?;
            rt.emit(
                distributor,
                Event::CoefficientsUpdated {
                    coefficients: update,
                },
            );
            info!("Updated coefficients of {}: {:?}", distributor, update);
            Ok(())
        })
    }

    /// One-time V1 -> V2 migration. Upgrade authority only.
    pub fn initialize_v2(
        &mut self,
        caller: Address,
        distributor: Address,
        params: &MigrationParams,
    ) -> Result<Allocation> {
        self.atomic("initialize_v2", |rt| {
            let authority = rt.upgrade_authority(distributor)?;
            if caller != authority {
                return Err(DistributorError::Forbidden {
                    caller,
                    reason: "caller is not the upgrade authority".to_string(),
                });
            }
            let held = rt.balance_of(distributor);
            let (settled, coefficients) = rt.ledger_mut(distributor)?.initialize_v2(params, held)?;
            rt.emit(distributor, Event::MigratedToV2 { coefficients, settled });
            info!(
                "Migrated {} to V2, settled {}",
                distributor,
                format_amount(settled.total())
            );
            Ok(settled)
        })
    }

    pub fn transfer_ownership(&mut self, caller: Address, distributor: Address, new_owner: Address) -> Result<()> {
        self.atomic("transfer_ownership", |rt| {
            rt.transfer_ownership_in_frame(caller, distributor, new_owner)
        })
    }

    fn transfer_ownership_in_frame(&mut self, caller: Address, distributor: Address, new_owner: Address) -> Result<()> {
        let previous_owner = self.ledger_mut(distributor)?.transfer_ownership(caller, new_owner)?;
        self.emit(
            distributor,
            Event::OwnershipTransferred {
                previous_owner,
                new_owner,
            },
        );
        info!(
            "Ownership of {} transferred from {} to {}",
            distributor, previous_owner, new_owner
        );
        Ok(())
    }

    /// Hand the upgrade authority to `new_authority`. Current authority only.
    pub fn transfer_upgrade_authority(
        &mut self,
        caller: Address,
        distributor: Address,
        new_authority: Address,
    ) -> Result<()> {
        self.atomic("transfer_upgrade_authority", |rt| {
            let deployment = rt.deployment_mut(distributor)?;
            if caller != deployment.upgrade_authority {
                return Err(DistributorError::Forbidden {
                    caller,
                    reason: "caller is not the upgrade authority".to_string(),
                });
            }
            if new_authority.is_zero() {
                return Err(DistributorError::InvalidAddress(
                    "new upgrade authority is the zero address".to_string(),
                ));
            }
            let previous_authority = std::mem::replace(&mut deployment.upgrade_authority, new_authority);
            rt.emit(
                distributor,
                Event::UpgradeAuthorityTransferred {
                    previous_authority,
                    new_authority,
                },
            );
            info!(
                "Upgrade authority of {} transferred to {}",
                distributor, new_authority
            );
            Ok(())
        })
    }

    // === Controller calls ===

    /// Move ownership of the controlled distributor. `DEFAULT_ADMIN_ROLE` only.
    pub fn change_reward_distributor_owner(
        &mut self,
        caller: Address,
        controller: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.atomic("change_reward_distributor_owner", |rt| {
            let front = rt.controller(controller)?;
            front.authorize_owner_change(caller)?;
            let distributor = front.distributor();
            rt.transfer_ownership_in_frame(controller, distributor, new_owner)
        })
    }

    /// Allocate through the controller. `STAKERS_ROLE` only.
    pub fn controller_allocate_rewards(&mut self, caller: Address, controller: Address) -> Result<Allocation> {
        self.atomic("controller_allocate_rewards", |rt| {
            let front = rt.controller(controller)?;
            front.authorize_stakers(caller)?;
            let distributor = front.distributor();
            rt.allocate_in_frame(controller, distributor)
        })
    }

    /// Withdraw the stakers bucket through the controller. `STAKERS_ROLE`
    /// only; the controller must own the distributor.
    pub fn controller_withdraw_stakers_balance(
        &mut self,
        caller: Address,
        controller: Address,
        to: Address,
    ) -> Result<Amount> {
        self.atomic("controller_withdraw_stakers_balance", |rt| {
            let front = rt.controller(controller)?;
            front.authorize_stakers(caller)?;
            let distributor = front.distributor();
            rt.withdraw_in_frame(controller, distributor, Bucket::Stakers, to)
        })
    }

    pub fn grant_role(&mut self, caller: Address, controller: Address, role: Role, account: Address) -> Result<bool> {
        self.atomic("grant_role", |rt| {
            let changed = rt.controller_mut(controller)?.grant_role(caller, role, account)?;
            if changed {
                rt.emit(
                    controller,
                    Event::RoleGranted {
                        role,
                        account,
                        sender: caller,
                    },
                );
                info!("Granted {:?} to {} on {}", role, account, controller);
            }
            Ok(changed)
        })
    }

    pub fn revoke_role(&mut self, caller: Address, controller: Address, role: Role, account: Address) -> Result<bool> {
        self.atomic("revoke_role", |rt| {
            let changed = rt.controller_mut(controller)?.revoke_role(caller, role, account)?;
            rt.emit_revoked(controller, changed, role, account, caller);
            Ok(changed)
        })
    }

    pub fn renounce_role(&mut self, caller: Address, controller: Address, role: Role) -> Result<bool> {
        self.atomic("renounce_role", |rt| {
            let changed = rt.controller_mut(controller)?.renounce_role(caller, role, caller)?;
            rt.emit_revoked(controller, changed, role, caller, caller);
            Ok(changed)
        })
    }

    fn emit_revoked(&mut self, controller: Address, changed: bool, role: Role, account: Address, sender: Address) {
        if !changed {
            return;
        }
        self.emit(
            controller,
            Event::RoleRevoked {
                role,
                account,
                sender,
            },
        );
        info!("Revoked {:?} from {} on {}", role, account, controller);
    }
}
