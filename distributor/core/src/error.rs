// Copyright (c) 2024 The Botho Foundation

//! Error taxonomy shared by the ledger, the controller and the runtime.

use thiserror::Error;

use crate::{address::Address, bucket::Bucket, bucket::SchemaVersion, units::Amount};

/// Every rejected precondition maps to exactly one variant. A call that
/// returns an error has left all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributorError {
    #[error("Insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance { available: Amount, requested: Amount },

    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),

    #[error("V2 already initialized")]
    AlreadyMigrated,

    #[error("The caller {caller} is not allowed: {reason}")]
    Forbidden { caller: Address, reason: String },

    #[error("Transfer of {amount} to {to} failed: {reason}")]
    TransferFailed {
        to: Address,
        amount: Amount,
        reason: String,
    },

    #[error("{operation} is not available in schema {schema}")]
    UnsupportedInSchema {
        operation: &'static str,
        schema: SchemaVersion,
    },

    #[error("Unknown bucket: {0}")]
    UnknownBucket(String),

    #[error("No recipient supplied for the {0} bucket")]
    MissingRecipient(Bucket),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("No contract deployed at {0}")]
    UnknownContract(Address),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid role: {0}")]
    InvalidRole(String),
}

impl DistributorError {
    pub(crate) fn forbidden(caller: Address, reason: impl Into<String>) -> Self {
        DistributorError::Forbidden {
            caller,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = DistributorError> = std::result::Result<T, E>;
