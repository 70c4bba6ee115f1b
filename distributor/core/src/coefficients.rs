// Copyright (c) 2024 The Botho Foundation

//! Weighting coefficients and the allocation arithmetic built on them.
//!
//! Coefficients are integer weights interpreted against
//! [`TOTAL_COEFFICIENT`]. Both schemas share the same top-level split:
//!
//! ```text
//! stakers + master_nodes + publishers == TOTAL_COEFFICIENT
//! ```
//!
//! where `publishers` is the weight of the publisher pool. `gather` is the
//! share of that pool routed to the gather bucket, and in V2 the two burn
//! coefficients are the shares of the gather and publisher portions that
//! are diverted to the burn bucket. Those sub-split ratios are each bounded
//! by `TOTAL_COEFFICIENT`.
//!
//! ## V1
//!
//! V1 has no publishers bucket. The publisher pool's net share is dormant
//! and the delta is normalized over the active weights:
//!
//! ```text
//! D            = stakers*T + master_nodes*T + publishers*gather
//! stakers     += delta * stakers*T / D
//! master_nodes += delta * master_nodes*T / D
//! gather      += delta - (stakers part) - (master_nodes part)
//! ```
//!
//! ## V2
//!
//! ```text
//! s    = delta * new_stakers / T
//! m    = delta * new_master_nodes / T
//! rest = delta - s - m
//! g    = rest * gather / T            p = rest - g
//! gb   = g * burn_gather / T          pb = p * burn_publishers / T
//! stakers += s, master_nodes += m, gather += g - gb,
//! publishers += p - pb, burn += gb + pb
//! ```
//!
//! In both schemas the rounding dust lands in a bucket that is computed by
//! subtraction, so the parts always sum to exactly `delta`.

use serde::{Deserialize, Serialize};

use crate::{
    bucket::Bucket,
    error::{DistributorError, Result},
    units::Amount,
};

/// An integer weight.
pub type Coefficient = u64;

/// Reference denominator for every coefficient.
pub const TOTAL_COEFFICIENT: Coefficient = 10_000;

const T: Coefficient = TOTAL_COEFFICIENT;

/// `value * numerator / denominator`, failing on overflow.
fn mul_div(value: Amount, numerator: impl Into<u128>, denominator: impl Into<u128>) -> Result<Amount> {
    let denominator = denominator.into();
    debug_assert!(denominator > 0);
    value
        .checked_mul(numerator.into())
        .map(|product| product / denominator)
        .ok_or(DistributorError::ArithmeticOverflow)
}

fn ensure_ratio(name: &str, value: Coefficient) -> Result<()> {
    if value > T {
        return Err(DistributorError::InvalidCoefficients(format!(
            "{} coefficient {} exceeds total {}",
            name, value, T
        )));
    }
    Ok(())
}

fn ensure_top_level_sum(stakers: Coefficient, master_nodes: Coefficient, publishers: Coefficient) -> Result<()> {
    let sum = stakers
        .checked_add(master_nodes)
        .and_then(|s| s.checked_add(publishers));
    if sum != Some(T) {
        return Err(DistributorError::InvalidCoefficients(format!(
            "stakers ({}) + master nodes ({}) + publishers ({}) must equal {}",
            stakers, master_nodes, publishers, T
        )));
    }
    Ok(())
}

/// Coefficients of a V1 distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoefficientsV1 {
    pub stakers: Coefficient,
    pub master_nodes: Coefficient,
    /// Publisher pool weight. Dormant in V1: no bucket receives it, but it
    /// takes part in validation and normalization.
    pub publishers: Coefficient,
    /// Share of the publisher pool routed to gather.
    pub gather: Coefficient,
}

impl Default for CoefficientsV1 {
    fn default() -> Self {
        Self {
            stakers: 750,
            master_nodes: 2250,
            publishers: 7000,
            gather: 3000,
        }
    }
}

impl CoefficientsV1 {
    pub fn new(
        stakers: Coefficient,
        master_nodes: Coefficient,
        publishers: Coefficient,
        gather: Coefficient,
    ) -> Self {
        Self {
            stakers,
            master_nodes,
            publishers,
            gather,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_top_level_sum(self.stakers, self.master_nodes, self.publishers)?;
        ensure_ratio("gather", self.gather)?;
        if self.active_weight()? == 0 {
            return Err(DistributorError::InvalidCoefficients(
                "no active bucket has a non-zero weight".to_string(),
            ));
        }
        Ok(())
    }

    /// Normalization denominator over the active V1 buckets.
    fn active_weight(&self) -> Result<u128> {
        let (stakers, master_nodes) = self.scaled_weights();
        let gather = u128::from(self.publishers) * u128::from(self.gather);
        stakers
            .checked_add(master_nodes)
            .and_then(|sm| sm.checked_add(gather))
            .ok_or(DistributorError::ArithmeticOverflow)
    }

    /// `stakers*T` and `master_nodes*T`. A u64 times T always fits in u128.
    fn scaled_weights(&self) -> (u128, u128) {
        let t = u128::from(T);
        (u128::from(self.stakers) * t, u128::from(self.master_nodes) * t)
    }

    /// Split `delta` across the V1 buckets.
    pub fn split(&self, delta: Amount) -> Result<Allocation> {
        if delta == 0 {
            return Ok(Allocation::default());
        }
        let denominator = self.active_weight()?;
        if denominator == 0 {
            return Err(DistributorError::InvalidCoefficients(
                "no active bucket has a non-zero weight".to_string(),
            ));
        }
        let (stakers_weight, master_nodes_weight) = self.scaled_weights();
        let stakers = mul_div(delta, stakers_weight, denominator)?;
        let master_nodes = mul_div(delta, master_nodes_weight, denominator)?;
        let gather = delta - stakers - master_nodes;
        Ok(Allocation {
            stakers,
            master_nodes,
            gather,
            ..Default::default()
        })
    }
}

/// Active coefficients of a V2 distributor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientsV2 {
    pub new_stakers: Coefficient,
    pub new_master_nodes: Coefficient,
    /// Publisher pool weight.
    pub publishers: Coefficient,
    /// Share of the publisher pool routed to gather.
    pub gather: Coefficient,
    /// Share of the publishers portion diverted to burn.
    pub burn_publishers: Coefficient,
    /// Share of the gather portion diverted to burn.
    pub burn_gather: Coefficient,
}

impl CoefficientsV2 {
    pub fn new(
        new_stakers: Coefficient,
        new_master_nodes: Coefficient,
        publishers: Coefficient,
        gather: Coefficient,
        burn_publishers: Coefficient,
        burn_gather: Coefficient,
    ) -> Self {
        Self {
            new_stakers,
            new_master_nodes,
            publishers,
            gather,
            burn_publishers,
            burn_gather,
        }
    }

    /// Coefficients installed by the V1 -> V2 migration.
    pub fn migrate_from(v1: &CoefficientsV1, params: &MigrationParams) -> Self {
        Self {
            new_stakers: v1.stakers,
            new_master_nodes: v1.master_nodes,
            publishers: v1.publishers,
            gather: v1.gather,
            burn_publishers: params.burn_publishers,
            burn_gather: params.burn_gather,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure_top_level_sum(self.new_stakers, self.new_master_nodes, self.publishers)?;
        ensure_ratio("gather", self.gather)?;
        ensure_ratio("burn publishers", self.burn_publishers)?;
        ensure_ratio("burn gather", self.burn_gather)?;
        Ok(())
    }

    /// Split `delta` across the V2 buckets.
    pub fn split(&self, delta: Amount) -> Result<Allocation> {
        if delta == 0 {
            return Ok(Allocation::default());
        }
        let stakers = mul_div(delta, self.new_stakers, T)?;
        let master_nodes = mul_div(delta, self.new_master_nodes, T)?;
        let rest = delta - stakers - master_nodes;

        let gather_gross = mul_div(rest, self.gather, T)?;
        let publishers_gross = rest - gather_gross;

        let gather_burn = mul_div(gather_gross, self.burn_gather, T)?;
        let publishers_burn = mul_div(publishers_gross, self.burn_publishers, T)?;

        Ok(Allocation {
            stakers,
            master_nodes,
            gather: gather_gross - gather_burn,
            publishers: publishers_gross - publishers_burn,
            burn: gather_burn + publishers_burn,
        })
    }
}

/// Burn splits installed by the one-time V2 migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationParams {
    pub burn_publishers: Coefficient,
    pub burn_gather: Coefficient,
}

impl Default for MigrationParams {
    fn default() -> Self {
        Self {
            burn_publishers: 9000,
            burn_gather: 9000,
        }
    }
}

impl MigrationParams {
    pub fn validate(&self) -> Result<()> {
        ensure_ratio("burn publishers", self.burn_publishers)?;
        ensure_ratio("burn gather", self.burn_gather)
    }
}

/// A coefficient update for either schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoefficientUpdate {
    V1(CoefficientsV1),
    V2(CoefficientsV2),
}

/// Per-bucket amounts produced by one allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub stakers: Amount,
    pub master_nodes: Amount,
    pub gather: Amount,
    pub publishers: Amount,
    pub burn: Amount,
}

impl Allocation {
    pub fn get(&self, bucket: Bucket) -> Amount {
        match bucket {
            Bucket::Stakers => self.stakers,
            Bucket::MasterNodes => self.master_nodes,
            Bucket::Gather => self.gather,
            Bucket::Publishers => self.publishers,
            Bucket::Burn => self.burn,
        }
    }

    /// Sum of all parts. Never overflows for a split of a single `Amount`.
    pub fn total(&self) -> Amount {
        self.stakers + self.master_nodes + self.gather + self.publishers + self.burn
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
