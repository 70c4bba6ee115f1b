// Copyright (c) 2024 The Botho Foundation

//! Account arguments.

use anyhow::{Context as _, Result};
use bth_distributor_core::Address;

/// Resolve an account argument: a `0x` address, or a label from which a
/// stable address is derived.
pub fn resolve(input: &str) -> Result<Address> {
    let input = input.trim();
    if input.is_empty() {
        anyhow::bail!("Account cannot be empty");
    }
    if input.starts_with("0x") {
        return input
            .parse()
            .with_context(|| format!("Invalid account address {}", input));
    }
    Ok(Address::derive(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_label() {
        assert_eq!(resolve("deployer").unwrap(), Address::derive("deployer"));
        assert_eq!(resolve(" deployer ").unwrap(), Address::derive("deployer"));
    }

    #[test]
    fn test_resolve_hex() {
        let addr = Address::derive("multisig");
        assert_eq!(resolve(&addr.to_string()).unwrap(), addr);
        assert!(resolve("0x1234").is_err());
        assert!(resolve("").is_err());
    }
}
