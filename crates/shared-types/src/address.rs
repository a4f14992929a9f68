// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Bitcoin wallet address validation

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

static BECH32_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(bc1|tb1|bcrt1)[02-9ac-hj-np-z]{8,87}$").expect("bech32 regex is valid")
});

static BASE58_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[13mn2][1-9A-HJ-NP-Za-km-z]{25,34}$").expect("base58 regex is valid")
});

/// Errors produced when parsing a wallet address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Address was empty or whitespace
    #[error("address must not be empty")]
    Empty,
    /// Address is not a recognizable Bitcoin address
    #[error("'{0}' is not a valid Bitcoin address")]
    Invalid(String),
}

/// A syntactically valid Bitcoin address
///
/// Accepts bech32/bech32m (`bc1`, `tb1`, `bcrt1`) and base58 (P2PKH/P2SH)
/// forms. Bech32 input is lowercased; checksums are not verified, the
/// indexer is the authority on whether the address exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "bc1pxwww0ct9ue7e8tdnlmug5m2tamfn7q06sahstg39ys4c9f3340qqxrdu9k")]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Parse and normalize an address
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or not a Bitcoin address
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(AddressError::Empty);
        }

        let lowered = trimmed.to_ascii_lowercase();
        if BECH32_REGEX.is_match(&lowered) {
            // mixed-case bech32 is invalid
            if trimmed != lowered && trimmed != trimmed.to_ascii_uppercase() {
                return Err(AddressError::Invalid(trimmed.to_string()));
            }
            return Ok(Self(lowered));
        }
        if BASE58_REGEX.is_match(trimmed) {
            return Ok(Self(trimmed.to_string()));
        }
        Err(AddressError::Invalid(trimmed.to_string()))
    }

    /// The normalized address string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for WalletAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for WalletAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_address_forms() {
        for address in [
            "bc1pxwww0ct9ue7e8tdnlmug5m2tamfn7q06sahstg39ys4c9f3340qqxrdu9k",
            "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq",
            "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx",
            "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2",
            "3J98t1WpEZ73CNmQviecrnyiWrnqRhWNLy",
        ] {
            assert!(WalletAddress::parse(address).is_ok(), "{address}");
        }
    }

    #[test]
    fn uppercase_bech32_is_normalized() {
        let address = WalletAddress::parse("BC1QAR0SRRR7XFKVY5L643LYDNW9RE59GTZZWF5MDQ").unwrap();
        assert_eq!(address.as_str(), "bc1qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(WalletAddress::parse("   "), Err(AddressError::Empty));
        assert!(matches!(
            WalletAddress::parse("0x742d35Cc6634C0532925a3b844Bc454e4438f44e"),
            Err(AddressError::Invalid(_))
        ));
        assert!(WalletAddress::parse("bc1Qar0srrr7xfkvy5l643lydnw9re59gtzzwf5mdq").is_err());
        assert!(WalletAddress::parse("bc1").is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: WalletAddress =
            serde_json::from_str("\"1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2\"").unwrap();
        assert_eq!(ok.to_string(), "1BvBMSEYstWetqTFn5Au4m4GFg7xJaNVN2");
        assert!(serde_json::from_str::<WalletAddress>("\"nope\"").is_err());
    }
}
