//! Token amounts and gas prices.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DeserializeFromStr, DisplayFromStr, SerializeDisplay};
use std::{fmt, str::FromStr};

/// Native denomination of Akash Network.
pub const NATIVE_DENOM: &str = "uakt";

/// Maximal number of fractional digits accepted in a gas price.
const MAX_DECIMALS: u32 = 18;

/// Amount of tokens in a given denomination.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coin {
    /// Denomination (e.g. `uakt`)
    pub denom: String,
    /// Integer amount in the smallest unit
    #[serde_as(as = "DisplayFromStr")]
    pub amount: u128,
}

impl Coin {
    pub fn new<S: Into<String>>(amount: u128, denom: S) -> Self {
        //! Create a coin.
        Self {
            amount,
            denom: denom.into(),
        }
    }

    pub fn parse_native(s: &str, denom: &str) -> Result<Self, AmountError> {
        //! Parse `"<amount><denom>"`, requiring the given denomination.
        let coin: Self = s.parse()?;
        if coin.denom != denom {
            return Err(AmountError::WrongDenom {
                expected: denom.to_string(),
                got: coin.denom,
            });
        }
        Ok(coin)
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let pos = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| AmountError::MissingDenom(s.to_string()))?;
        let (amount, denom) = s.split_at(pos);
        if amount.is_empty() {
            return Err(AmountError::MissingAmount(s.to_string()));
        }
        validate_denom(denom)?;
        Ok(Self {
            amount: amount
                .parse()
                .map_err(|_| AmountError::InvalidAmount(s.to_string()))?,
            denom: denom.to_string(),
        })
    }
}

fn validate_denom(denom: &str) -> Result<(), AmountError> {
    let mut chars = denom.chars();
    let valid_start = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || "/:._-".contains(c));
    if valid_start && valid_rest && denom.len() >= 2 && denom.len() <= 128 {
        Ok(())
    } else {
        Err(AmountError::InvalidDenom(denom.to_string()))
    }
}

/// Price of one unit of gas, possibly fractional (e.g. `0.025uakt`).
///
/// Stored as an exact decimal: `digits / 10^decimals`.
#[derive(Clone, Debug, PartialEq, Eq, SerializeDisplay, DeserializeFromStr)]
pub struct GasPrice {
    digits: u128,
    decimals: u32,
    denom: String,
}

impl GasPrice {
    pub fn denom(&self) -> &str {
        //! Denomination of the price.
        &self.denom
    }

    pub fn fee_for(&self, gas_limit: u64) -> Result<Coin, AmountError> {
        //! Compute `ceil(gas_price * gas_limit)`.
        let scale = 10u128.pow(self.decimals);
        let product = self
            .digits
            .checked_mul(u128::from(gas_limit))
            .ok_or(AmountError::Overflow)?;
        Ok(Coin::new(product.div_ceil(scale), self.denom.clone()))
    }
}

impl fmt::Display for GasPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u128.pow(self.decimals);
        let (whole, frac) = (self.digits / scale, self.digits % scale);
        if self.decimals == 0 {
            write!(f, "{whole}{}", self.denom)
        } else {
            let width = self.decimals as usize;
            write!(f, "{whole}.{frac:0width$}{}", self.denom)
        }
    }
}

impl FromStr for GasPrice {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let pos = s
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .ok_or_else(|| AmountError::MissingDenom(s.to_string()))?;
        let (number, denom) = s.split_at(pos);
        if number.is_empty() {
            return Err(AmountError::MissingAmount(s.to_string()));
        }
        validate_denom(denom)?;
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() || frac.contains('.') {
            return Err(AmountError::InvalidAmount(s.to_string()));
        }
        let frac = frac.trim_end_matches('0');
        let decimals = u32::try_from(frac.len()).map_err(|_| AmountError::Overflow)?;
        if decimals > MAX_DECIMALS {
            return Err(AmountError::InvalidAmount(s.to_string()));
        }
        let digits = format!("{whole}{frac}")
            .parse::<u128>()
            .map_err(|_| AmountError::InvalidAmount(s.to_string()))?;
        Ok(Self {
            digits,
            decimals,
            denom: denom.to_string(),
        })
    }
}

/// Amount validation errors.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum AmountError {
    /// No denomination after the number.
    #[error("Missing denomination in {0:?}")]
    MissingDenom(String),
    /// No digits before the denomination.
    #[error("Missing amount in {0:?}")]
    MissingAmount(String),
    /// Number could not be parsed.
    #[error("Invalid amount {0:?}")]
    InvalidAmount(String),
    /// Denomination contains forbidden characters.
    #[error("Invalid denomination {0:?}")]
    InvalidDenom(String),
    /// Denomination differs from the chain's native unit.
    #[error("Wrong denomination: expected {expected:?}, got {got:?}")]
    WrongDenom {
        /// Required denomination
        expected: String,
        /// Provided denomination
        got: String,
    },
    /// Arithmetic overflow.
    #[error("Amount overflow")]
    Overflow,
}
