// Copyright (c) 2024 The Botho Foundation

//! Role-based access control.
//!
//! Roles are explicit capabilities: a [`RoleRegistry`] maps each role to
//! the set of identities holding it and to the role that administers it.
//! Every privileged path consults the registry before mutating anything.

use std::collections::{BTreeMap, BTreeSet};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};

use crate::{
    address::Address,
    error::{DistributorError, Result},
};

/// Name of the role held by the staking rewards contract.
pub const STAKERS_ROLE_NAME: &str = "STAKERS_ROLE";

const DEFAULT_ADMIN_ROLE_NAME: &str = "DEFAULT_ADMIN_ROLE";

/// A 32-byte role identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Role([u8; 32]);

impl Role {
    /// Administers every role that has no other admin. All-zero id.
    pub const DEFAULT_ADMIN: Role = Role([0u8; 32]);

    /// `keccak256(name)`, matching the usual on-chain role derivation.
    pub fn named(name: &str) -> Self {
        let digest = Keccak256::digest(name.as_bytes());
        let mut id = [0u8; 32];
        id.copy_from_slice(&digest);
        Self(id)
    }

    pub fn stakers() -> Self {
        Self::named(STAKERS_ROLE_NAME)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Human readable name for the well-known roles.
    pub fn label(&self) -> Option<&'static str> {
        if *self == Role::DEFAULT_ADMIN {
            Some(DEFAULT_ADMIN_ROLE_NAME)
        } else if *self == Role::stakers() {
            Some(STAKERS_ROLE_NAME)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.label() {
            Some(label) => write!(f, "Role({})", label),
            None => write!(f, "Role({})", self),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = DistributorError;

    /// Accepts `DEFAULT_ADMIN_ROLE`, any `*_ROLE` name, or a 0x-prefixed
    /// 32-byte hex id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == DEFAULT_ADMIN_ROLE_NAME {
            return Ok(Role::DEFAULT_ADMIN);
        }
        if let Some(digits) = s.strip_prefix("0x") {
            let mut id = [0u8; 32];
            hex::decode_to_slice(digits, &mut id)
                .map_err(|e| DistributorError::InvalidRole(format!("{}: {}", s, e)))?;
            return Ok(Role(id));
        }
        if s.ends_with("_ROLE") {
            return Ok(Role::named(s));
        }
        Err(DistributorError::InvalidRole(s.to_string()))
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Members and admins of every role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRegistry {
    members: BTreeMap<Role, BTreeSet<Address>>,
    admins: BTreeMap<Role, Role>,
}

impl RoleRegistry {
    pub fn has_role(&self, role: Role, account: Address) -> bool {
        self.members
            .get(&role)
            .map_or(false, |members| members.contains(&account))
    }

    /// The role whose holders may grant and revoke `role`.
    pub fn role_admin(&self, role: Role) -> Role {
        self.admins.get(&role).copied().unwrap_or(Role::DEFAULT_ADMIN)
    }

    pub fn members(&self, role: Role) -> impl Iterator<Item = &Address> {
        self.members.get(&role).into_iter().flatten()
    }

    pub fn check_role(&self, role: Role, account: Address) -> Result<()> {
        if !self.has_role(role, account) {
            return Err(DistributorError::forbidden(
                account,
                format!("missing role {:?}", role),
            ));
        }
        Ok(())
    }

    pub(crate) fn set_role_admin(&mut self, role: Role, admin: Role) {
        self.admins.insert(role, admin);
    }

    /// Grant without an authorization check. Initialization only.
    pub(crate) fn setup_role(&mut self, role: Role, account: Address) -> bool {
        self.members.entry(role).or_default().insert(account)
    }

    /// Grant `role` to `account`. Returns whether membership changed.
    pub fn grant_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.check_role(self.role_admin(role), caller)?;
        Ok(self.setup_role(role, account))
    }

    /// Revoke `role` from `account`. Returns whether membership changed.
    pub fn revoke_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        self.check_role(self.role_admin(role), caller)?;
        Ok(self.remove(role, account))
    }

    /// Give up a role held by the caller.
    pub fn renounce_role(&mut self, caller: Address, role: Role, account: Address) -> Result<bool> {
        if caller != account {
            return Err(DistributorError::forbidden(caller, "can only renounce roles for self"));
        }
        Ok(self.remove(role, account))
    }

    fn remove(&mut self, role: Role, account: Address) -> bool {
        let Some(members) = self.members.get_mut(&role) else {
            return false;
        };
        let removed = members.remove(&account);
        if members.is_empty() {
            self.members.remove(&role);
        }
        removed
    }
}
