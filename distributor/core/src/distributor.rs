// Copyright (c) 2024 The Botho Foundation

//! The reward distributor ledger.
//!
//! [`RewardDistributor`] is a pure state machine. It never moves value
//! itself: every operation that pays out first applies its effects (zeroing
//! the bucket and reducing the allocated balance) and then returns the
//! amount that the caller, normally the [`Runtime`](crate::Runtime), must
//! transfer. A recipient that re-enters during that transfer therefore
//! always observes the bucket already emptied.
//!
//! Held funds are owned by the execution environment and are passed in
//! wherever the ledger needs them.

use serde::{Deserialize, Serialize};

use crate::{
    address::Address,
    bucket::{Bucket, SchemaVersion},
    coefficients::{
        Allocation, Coefficient, CoefficientUpdate, CoefficientsV1, CoefficientsV2,
        MigrationParams, TOTAL_COEFFICIENT,
    },
    error::{DistributorError, Result},
    units::Amount,
};

/// Balances shared by both schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonBalances {
    pub stakers: Amount,
    pub master_nodes: Amount,
    pub gather: Amount,
    /// Sum of every bucket balance.
    pub allocated: Amount,
}

/// Ledger state under schema V1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerV1 {
    pub balances: CommonBalances,
    pub coefficients: CoefficientsV1,
}

/// Ledger state under schema V2. Extends the V1 prefix with the publishers
/// and burn buckets and the new coefficient set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerV2 {
    pub balances: CommonBalances,
    pub publishers: Amount,
    pub burn: Amount,
    /// Legacy V1 stakers coefficient, frozen at migration.
    pub legacy_stakers: Coefficient,
    /// Legacy V1 master nodes coefficient, rewritten at migration to the
    /// complement of the stakers coefficient.
    pub legacy_master_nodes: Coefficient,
    pub coefficients: CoefficientsV2,
}

/// Tagged storage layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    V1(LedgerV1),
    V2(LedgerV2),
}

impl Schema {
    fn version(&self) -> SchemaVersion {
        match self {
            Schema::V1(_) => SchemaVersion::V1,
            Schema::V2(_) => SchemaVersion::V2,
        }
    }

    fn balances(&self) -> &CommonBalances {
        match self {
            Schema::V1(ledger) => &ledger.balances,
            Schema::V2(ledger) => &ledger.balances,
        }
    }

    fn balances_mut(&mut self) -> &mut CommonBalances {
        match self {
            Schema::V1(ledger) => &mut ledger.balances,
            Schema::V2(ledger) => &mut ledger.balances,
        }
    }
}

/// Ledger of rewards awaiting distribution to beneficiary buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardDistributor {
    owner: Address,
    schema: Schema,
}

impl RewardDistributor {
    /// Create a fresh V1 ledger with zero balances.
    pub fn new(owner: Address, coefficients: CoefficientsV1) -> Result<Self> {
        if owner.is_zero() {
            return Err(DistributorError::InvalidAddress(
                "owner cannot be the zero address".to_string(),
            ));
        }
        coefficients.validate()?;
        Ok(Self {
            owner,
            schema: Schema::V1(LedgerV1 {
                balances: CommonBalances::default(),
                coefficients,
            }),
        })
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn schema_version(&self) -> SchemaVersion {
        self.schema.version()
    }

    /// Whether the one-time V2 migration has run.
    pub fn is_migrated(&self) -> bool {
        matches!(self.schema, Schema::V2(_))
    }

    pub fn total_coefficient(&self) -> Coefficient {
        TOTAL_COEFFICIENT
    }

    // === Balances ===

    /// Balance of `bucket`. Buckets that do not exist in the current schema
    /// report zero.
    pub fn balance_of(&self, bucket: Bucket) -> Amount {
        let balances = self.schema.balances();
        match (bucket, &self.schema) {
            (Bucket::Stakers, _) => balances.stakers,
            (Bucket::MasterNodes, _) => balances.master_nodes,
            (Bucket::Gather, _) => balances.gather,
            (Bucket::Publishers, Schema::V2(ledger)) => ledger.publishers,
            (Bucket::Burn, Schema::V2(ledger)) => ledger.burn,
            (Bucket::Publishers | Bucket::Burn, Schema::V1(_)) => 0,
        }
    }

    pub fn stakers_balance(&self) -> Amount {
        self.balance_of(Bucket::Stakers)
    }

    pub fn master_nodes_balance(&self) -> Amount {
        self.balance_of(Bucket::MasterNodes)
    }

    pub fn gather_balance(&self) -> Amount {
        self.balance_of(Bucket::Gather)
    }

    pub fn publishers_balance(&self) -> Amount {
        self.balance_of(Bucket::Publishers)
    }

    pub fn burn_balance(&self) -> Amount {
        self.balance_of(Bucket::Burn)
    }

    pub fn allocated_balance(&self) -> Amount {
        self.schema.balances().allocated
    }

    /// Funds held but not yet allocated to any bucket.
    pub fn unallocated(&self, held: Amount) -> Amount {
        held.saturating_sub(self.allocated_balance())
    }

    // === Coefficients ===

    pub fn stakers_coefficient(&self) -> Coefficient {
        match &self.schema {
            Schema::V1(ledger) => ledger.coefficients.stakers,
            Schema::V2(ledger) => ledger.legacy_stakers,
        }
    }

    pub fn master_nodes_coefficient(&self) -> Coefficient {
        match &self.schema {
            Schema::V1(ledger) => ledger.coefficients.master_nodes,
            Schema::V2(ledger) => ledger.legacy_master_nodes,
        }
    }

    pub fn publishers_coefficient(&self) -> Coefficient {
        match &self.schema {
            Schema::V1(ledger) => ledger.coefficients.publishers,
            Schema::V2(ledger) => ledger.coefficients.publishers,
        }
    }

    pub fn gather_coefficient(&self) -> Coefficient {
        match &self.schema {
            Schema::V1(ledger) => ledger.coefficients.gather,
            Schema::V2(ledger) => ledger.coefficients.gather,
        }
    }

    /// The active V2 coefficient set, once migrated.
    pub fn v2_coefficients(&self) -> Option<&CoefficientsV2> {
        match &self.schema {
            Schema::V1(_) => None,
            Schema::V2(ledger) => Some(&ledger.coefficients),
        }
    }

    pub fn new_stakers_coefficient(&self) -> Option<Coefficient> {
        self.v2_coefficients().map(|c| c.new_stakers)
    }

    pub fn new_master_nodes_coefficient(&self) -> Option<Coefficient> {
        self.v2_coefficients().map(|c| c.new_master_nodes)
    }

    pub fn burn_publishers_coefficient(&self) -> Option<Coefficient> {
        self.v2_coefficients().map(|c| c.burn_publishers)
    }

    pub fn burn_gather_coefficient(&self) -> Option<Coefficient> {
        self.v2_coefficients().map(|c| c.burn_gather)
    }

    // === Operations ===

    /// Fails with `Forbidden` unless `caller` is the owner.
    pub fn ensure_owner(&self, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(DistributorError::forbidden(caller, "caller is not the owner"));
        }
        Ok(())
    }

    fn split(&self, delta: Amount) -> Result<Allocation> {
        match &self.schema {
            Schema::V1(ledger) => ledger.coefficients.split(delta),
            Schema::V2(ledger) => ledger.coefficients.split(delta),
        }
    }

    /// Distribute everything held beyond the allocated balance across the
    /// active buckets. Open to any caller; a zero delta is a no-op.
    ///
    /// On success `allocated_balance() == held`.
    pub fn allocate(&mut self, held: Amount) -> Result<Allocation> {
        let delta = self.unallocated(held);
        if delta == 0 {
            return Ok(Allocation::default());
        }
        let allocation = self.split(delta)?;

        // Compute every new balance before touching state.
        let overflow = || DistributorError::ArithmeticOverflow;
        let current = self.schema.balances().clone();
        let next = CommonBalances {
            stakers: current.stakers.checked_add(allocation.stakers).ok_or_else(overflow)?,
            master_nodes: current
                .master_nodes
                .checked_add(allocation.master_nodes)
                .ok_or_else(overflow)?,
            gather: current.gather.checked_add(allocation.gather).ok_or_else(overflow)?,
            allocated: current.allocated.checked_add(delta).ok_or_else(overflow)?,
        };
        let extra = match &self.schema {
            Schema::V1(_) => None,
            Schema::V2(ledger) => Some((
                ledger
                    .publishers
                    .checked_add(allocation.publishers)
                    .ok_or_else(overflow)?,
                ledger.burn.checked_add(allocation.burn).ok_or_else(overflow)?,
            )),
        };

        *self.schema.balances_mut() = next;
        if let (Schema::V2(ledger), Some((publishers, burn))) = (&mut self.schema, extra) {
            ledger.publishers = publishers;
            ledger.burn = burn;
        }
        Ok(allocation)
    }

    /// Empty a withdrawable bucket and return its former balance.
    ///
    /// This is the effects half of a withdrawal; the caller must perform
    /// the transfer afterwards and discard the whole call if it fails.
    pub fn take_bucket(&mut self, caller: Address, bucket: Bucket) -> Result<Amount> {
        self.ensure_owner(caller)?;
        let version = self.schema_version();
        if !version.withdrawable_buckets().contains(&bucket) {
            return Err(DistributorError::UnsupportedInSchema {
                operation: withdraw_operation(bucket),
                schema: version,
            });
        }
        Ok(self.drain(bucket))
    }

    /// Empty the burn bucket and return the amount to destroy.
    pub fn burn(&mut self, caller: Address) -> Result<Amount> {
        self.ensure_owner(caller)?;
        if !self.is_migrated() {
            return Err(DistributorError::UnsupportedInSchema {
                operation: "burn",
                schema: self.schema_version(),
            });
        }
        Ok(self.drain(Bucket::Burn))
    }

    fn drain(&mut self, bucket: Bucket) -> Amount {
        let slot = match (&mut self.schema, bucket) {
            (Schema::V1(ledger), Bucket::Stakers) => &mut ledger.balances.stakers,
            (Schema::V1(ledger), Bucket::MasterNodes) => &mut ledger.balances.master_nodes,
            (Schema::V1(ledger), Bucket::Gather) => &mut ledger.balances.gather,
            (Schema::V2(ledger), Bucket::Stakers) => &mut ledger.balances.stakers,
            (Schema::V2(ledger), Bucket::MasterNodes) => &mut ledger.balances.master_nodes,
            (Schema::V2(ledger), Bucket::Gather) => &mut ledger.balances.gather,
            (Schema::V2(ledger), Bucket::Publishers) => &mut ledger.publishers,
            (Schema::V2(ledger), Bucket::Burn) => &mut ledger.burn,
            (Schema::V1(_), Bucket::Publishers | Bucket::Burn) => return 0,
        };
        let amount = std::mem::take(slot);
        // allocated is the sum of all buckets, so this cannot underflow.
        self.schema.balances_mut().allocated -= amount;
        amount
    }

    /// Replace the active coefficient set. Already allocated balances are
    /// not re-split.
    pub fn update_coefficients(&mut self, caller: Address, update: CoefficientUpdate) -> Result<()> {
        self.ensure_owner(caller)?;
        match (&mut self.schema, update) {
            (Schema::V1(ledger), CoefficientUpdate::V1(coefficients)) => {
                coefficients.validate()?;
                ledger.coefficients = coefficients;
                Ok(())
            }
            (Schema::V2(ledger), CoefficientUpdate::V2(coefficients)) => {
                coefficients.validate()?;
                ledger.coefficients = coefficients;
                Ok(())
            }
            (schema, _) => Err(DistributorError::UnsupportedInSchema {
                operation: "update_coefficients with this coefficient set",
                schema: schema.version(),
            }),
        }
    }

    /// One-time V1 -> V2 migration.
    ///
    /// Settles any unallocated funds under the V1 weights, introduces the
    /// publishers and burn buckets and installs the V2 coefficients.
    /// Authorization is the upgrade authority's concern and is checked by
    /// the runtime. Returns the final V1 settlement and the installed
    /// coefficients.
    pub fn initialize_v2(
        &mut self,
        params: &MigrationParams,
        held: Amount,
    ) -> Result<(Allocation, CoefficientsV2)> {
        let Schema::V1(current) = &self.schema else {
            return Err(DistributorError::AlreadyMigrated);
        };
        params.validate()?;
        let coefficients = CoefficientsV2::migrate_from(&current.coefficients, params);
        coefficients.validate()?;
        let legacy_stakers = current.coefficients.stakers;

        // Final settlement under the V1 weights; fails without side effects.
        let settled = self.allocate(held)?;

        let balances = self.schema.balances().clone();
        self.schema = Schema::V2(LedgerV2 {
            balances,
            publishers: 0,
            burn: 0,
            legacy_stakers,
            legacy_master_nodes: TOTAL_COEFFICIENT - legacy_stakers,
            coefficients,
        });
        Ok((settled, coefficients))
    }

    /// Hand ownership to `new_owner`. Returns the previous owner.
    pub fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<Address> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(DistributorError::InvalidAddress(
                "new owner is the zero address".to_string(),
            ));
        }
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }

    /// Sum of the bucket balances, for invariant checks.
    pub fn bucket_sum(&self) -> Amount {
        Bucket::ALL.iter().map(|b| self.balance_of(*b)).sum()
    }
}

fn withdraw_operation(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Stakers => "withdraw_stakers_balance",
        Bucket::MasterNodes => "withdraw_master_nodes_balance",
        Bucket::Gather => "withdraw_gather_balance",
        Bucket::Publishers => "withdraw_publishers_balance",
        Bucket::Burn => "withdraw burn balance",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{bth, UNITS_PER_BTH};
    use assert_matches::assert_matches;

    fn tenths(n: u128) -> Amount {
        n * UNITS_PER_BTH / 10
    }

    fn owner() -> Address {
        Address::derive("owner")
    }

    fn fresh() -> RewardDistributor {
        RewardDistributor::new(owner(), CoefficientsV1::default()).unwrap()
    }

    #[test]
    fn test_fresh_ledger() {
        let ledger = fresh();
        assert_eq!(ledger.schema_version(), SchemaVersion::V1);
        assert!(!ledger.is_migrated());
        assert_eq!(ledger.allocated_balance(), 0);
        assert_eq!(ledger.stakers_coefficient(), 750);
        assert_eq!(ledger.master_nodes_coefficient(), 2250);
        assert_eq!(ledger.publishers_coefficient(), 7000);
        assert_eq!(ledger.gather_coefficient(), 3000);
        assert_eq!(ledger.total_coefficient(), 10_000);
        assert_eq!(ledger.new_stakers_coefficient(), None);
    }

    #[test]
    fn test_rejects_zero_owner() {
        assert_matches!(
            RewardDistributor::new(Address::ZERO, CoefficientsV1::default()),
            Err(DistributorError::InvalidAddress(_))
        );
    }

    #[test]
    fn test_allocate_only_distributes_new_delta() {
        let mut ledger = fresh();
        ledger.allocate(bth(51)).unwrap();
        assert_eq!(ledger.allocated_balance(), bth(51));

        // Same held funds: nothing new.
        assert!(ledger.allocate(bth(51)).unwrap().is_empty());
        assert_eq!(ledger.stakers_balance(), tenths(75));

        // A second 51 doubles every bucket.
        ledger.allocate(bth(102)).unwrap();
        assert_eq!(ledger.stakers_balance(), bth(15));
        assert_eq!(ledger.master_nodes_balance(), bth(45));
        assert_eq!(ledger.gather_balance(), bth(42));
        assert_eq!(ledger.allocated_balance(), ledger.bucket_sum());
    }

    #[test]
    fn test_take_bucket_applies_effects() {
        let mut ledger = fresh();
        ledger.allocate(bth(51)).unwrap();
        let amount = ledger.take_bucket(owner(), Bucket::Stakers).unwrap();
        assert_eq!(amount, tenths(75));
        assert_eq!(ledger.stakers_balance(), 0);
        assert_eq!(ledger.allocated_balance(), tenths(435));
        assert_eq!(ledger.master_nodes_balance(), tenths(225));

        // Second take of an empty bucket is a no-op.
        assert_eq!(ledger.take_bucket(owner(), Bucket::Stakers).unwrap(), 0);
    }

    #[test]
    fn test_take_bucket_requires_owner() {
        let mut ledger = fresh();
        ledger.allocate(bth(51)).unwrap();
        let before = ledger.clone();
        assert_matches!(
            ledger.take_bucket(Address::derive("stranger"), Bucket::Stakers),
            Err(DistributorError::Forbidden { .. })
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_v1_has_no_publishers_or_burn() {
        let mut ledger = fresh();
        assert_matches!(
            ledger.take_bucket(owner(), Bucket::Publishers),
            Err(DistributorError::UnsupportedInSchema { schema: SchemaVersion::V1, .. })
        );
        assert_matches!(
            ledger.burn(owner()),
            Err(DistributorError::UnsupportedInSchema { schema: SchemaVersion::V1, .. })
        );
    }

    #[test]
    fn test_migration_fixture() {
        let mut ledger = fresh();
        let (settled, installed) = ledger.initialize_v2(&MigrationParams::default(), bth(51)).unwrap();
        assert_eq!(settled.total(), bth(51));
        assert_eq!(ledger.v2_coefficients(), Some(&installed));
        assert_eq!(ledger.allocated_balance(), bth(51));

        assert_eq!(ledger.stakers_coefficient(), 750);
        assert_eq!(ledger.master_nodes_coefficient(), 9250);
        assert_eq!(ledger.publishers_coefficient(), 7000);
        assert_eq!(ledger.gather_coefficient(), 3000);
        assert_eq!(ledger.new_stakers_coefficient(), Some(750));
        assert_eq!(ledger.new_master_nodes_coefficient(), Some(2250));
        assert_eq!(ledger.burn_publishers_coefficient(), Some(9000));
        assert_eq!(ledger.burn_gather_coefficient(), Some(9000));
        assert_eq!(ledger.publishers_balance(), 0);
        assert_eq!(ledger.burn_balance(), 0);

        assert_eq!(
            ledger.initialize_v2(&MigrationParams::default(), bth(51)),
            Err(DistributorError::AlreadyMigrated)
        );
    }

    #[test]
    fn test_update_coefficients() {
        let mut ledger = fresh();
        ledger
            .update_coefficients(owner(), CoefficientUpdate::V1(CoefficientsV1::new(2000, 2000, 6000, 5000)))
            .unwrap();
        assert_eq!(ledger.stakers_coefficient(), 2000);
        assert_eq!(ledger.gather_coefficient(), 5000);

        assert_matches!(
            ledger.update_coefficients(
                owner(),
                CoefficientUpdate::V1(CoefficientsV1::new(2000, 2000, 5000, 5000))
            ),
            Err(DistributorError::InvalidCoefficients(_))
        );
        assert_matches!(
            ledger.update_coefficients(
                owner(),
                CoefficientUpdate::V2(CoefficientsV2::new(2000, 2000, 6000, 5000, 0, 0))
            ),
            Err(DistributorError::UnsupportedInSchema { .. })
        );
        assert_eq!(ledger.stakers_coefficient(), 2000);
    }

    #[test]
    fn test_transfer_ownership() {
        let mut ledger = fresh();
        let next = Address::derive("multisig");
        assert_matches!(
            ledger.transfer_ownership(next, next),
            Err(DistributorError::Forbidden { .. })
        );
        assert_eq!(ledger.transfer_ownership(owner(), next).unwrap(), owner());
        assert_eq!(ledger.owner(), next);
        assert_matches!(
            ledger.transfer_ownership(next, Address::ZERO),
            Err(DistributorError::InvalidAddress(_))
        );
    }
}
