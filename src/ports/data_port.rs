//! Price data access port trait.

use crate::domain::error::CoinbackError;
use crate::domain::price_series::PriceSeries;

pub trait DataPort {
    /// Load the full, validated series for `coin`, oldest bar first.
    fn load_series(&self, coin: &str) -> Result<PriceSeries, CoinbackError>;

    /// Coins with data available to this adapter, sorted.
    fn list_coins(&self) -> Result<Vec<String>, CoinbackError>;
}
