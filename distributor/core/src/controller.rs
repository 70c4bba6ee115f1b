// Copyright (c) 2024 The Botho Foundation

//! Role-gated front door for a reward distributor.
//!
//! The controller is deployed once, takes ownership of an existing
//! distributor and forwards a narrow set of calls into it with its own
//! address as the caller. It holds no funds and never stores ledger state.

use serde::{Deserialize, Serialize};

use crate::{
    access::{Role, RoleRegistry},
    address::Address,
    error::Result,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDistributorController {
    distributor: Address,
    roles: RoleRegistry,
}

impl RewardDistributorController {
    /// `admin` receives `DEFAULT_ADMIN_ROLE`; `STAKERS_ROLE` is administered
    /// by `DEFAULT_ADMIN_ROLE`.
    pub fn new(admin: Address, distributor: Address) -> Self {
        let mut roles = RoleRegistry::default();
        roles.setup_role(Role::DEFAULT_ADMIN, admin);
        roles.set_role_admin(Role::stakers(), Role::DEFAULT_ADMIN);
        Self { distributor, roles }
    }

    /// The distributor this controller fronts.
    pub fn distributor(&self) -> Address {
        self.distributor
    }

    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.roles.has_role(role, account)
    }

    pub fn get_role_admin(&self, role: Role) -> Role {
        self.roles.role_admin(role)
    }

    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.roles.grant_role(caller, role, account)
    }

    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.roles.revoke_role(caller, role, account)
    }

    pub fn renounce_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.roles.renounce_role(caller, role, account)
    }

    /// Gate for `change_reward_distributor_owner`.
    pub fn authorize_owner_change(&self, caller: Address) -> Result<()> {
        self.roles.check_role(Role::DEFAULT_ADMIN, caller)
    }

    /// Gate for the calls forwarded on behalf of the staking contract.
    pub fn authorize_stakers(&self, caller: Address) -> Result<()> {
        self.roles.check_role(Role::stakers(), caller)
    }
}
