use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A quoted registration or renewal price in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Base cost for the requested duration.
    pub base: U256,
    /// Premium on top of the base, e.g. during a decaying auction.
    pub premium: U256,
    /// Whether the price recurs (renewable registrations) or is one-time.
    pub recurring: bool,
}

impl Price {
    pub fn new(base: U256, premium: U256, recurring: bool) -> Self {
        Price {
            base,
            premium,
            recurring,
        }
    }

    /// Sum of base and premium.
    pub fn total(&self) -> U256 {
        self.base + self.premium
    }

    /// Total plus a 3% buffer, for transactions sent while an auction
    /// premium is still decaying.
    pub fn buffered(&self) -> U256 {
        self.total() * U256::from(103) / U256::from(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals() {
        let price = Price::new(U256::from(1000), U256::from(50), true);
        assert_eq!(price.total(), U256::from(1050));
    }

    #[test]
    fn buffer_adds_three_percent() {
        let price = Price::new(U256::from(100), U256::from(0), true);
        assert_eq!(price.buffered(), U256::from(103));
        let small = Price::new(U256::from(1), U256::from(0), false);
        assert_eq!(small.buffered(), U256::from(1));
        // Multiplication before division: 67 * 103 / 100 keeps the two
        // wei that 67 * (103 / 100) would drop.
        let odd = Price::new(U256::from(67), U256::from(0), false);
        assert_eq!(odd.buffered(), U256::from(69));
    }
}
