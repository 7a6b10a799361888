use crate::error::GatewayError;
use serde::Serialize;

/// The single long holding in the simulated account.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Holding {
    pub size: f64,
    pub entry_price: f64,
    /// Commission paid when the holding was opened.
    pub entry_fee: f64,
}

impl Holding {
    /// Total cash spent to open the holding, commission included.
    pub fn cost_basis(&self) -> f64 {
        self.entry_price * self.size + self.entry_fee
    }
}

/// Manages the state of the trading account: cash and at most one holding.
/// Its sole responsibility is to accurately reflect the current state based on fills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Portfolio {
    pub cash: f64,
    pub holding: Option<Holding>,
}

impl Portfolio {
    /// Creates a new `Portfolio` with a given amount of starting capital.
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            holding: None,
        }
    }

    /// Opens the holding. Cash decreases by notional plus commission.
    pub fn apply_buy(&mut self, price: f64, size: f64, fee: f64) -> Result<(), GatewayError> {
        if self.holding.is_some() {
            return Err(GatewayError::PositionExists);
        }
        let required = price * size + fee;
        if required > self.cash {
            return Err(GatewayError::InsufficientCash {
                required,
                available: self.cash,
            });
        }
        self.cash -= required;
        self.holding = Some(Holding {
            size,
            entry_price: price,
            entry_fee: fee,
        });
        Ok(())
    }

    /// Closes the holding and returns the realized PnL net of both commissions.
    pub fn apply_sell(&mut self, price: f64, fee: f64) -> Result<f64, GatewayError> {
        let holding = self.holding.take().ok_or(GatewayError::NoPosition)?;
        let proceeds = price * holding.size - fee;
        self.cash += proceeds;
        Ok(proceeds - holding.cost_basis())
    }

    /// Equity = cash + market value of the holding at `mark`.
    pub fn equity(&self, mark: f64) -> f64 {
        self.cash + self.holding.map_or(0.0, |h| h.size * mark)
    }

    pub fn is_flat(&self) -> bool {
        self.holding.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buy_then_sell_realizes_pnl_net_of_fees() {
        let mut portfolio = Portfolio::new(1_000.0);
        portfolio.apply_buy(10.0, 50.0, 1.0).unwrap();
        assert_eq!(portfolio.cash, 499.0);
        assert_eq!(portfolio.equity(12.0), 499.0 + 600.0);

        let pnl = portfolio.apply_sell(12.0, 1.0).unwrap();
        assert_eq!(pnl, 98.0);
        assert_eq!(portfolio.cash, 1_098.0);
        assert!(portfolio.is_flat());
    }

    #[test]
    fn buy_beyond_cash_is_rejected_without_mutation() {
        let mut portfolio = Portfolio::new(100.0);
        let err = portfolio.apply_buy(10.0, 11.0, 0.0).unwrap_err();
        assert!(matches!(err, GatewayError::InsufficientCash { .. }));
        assert_eq!(portfolio.cash, 100.0);
        assert!(portfolio.is_flat());
    }

    #[test]
    fn second_buy_is_rejected() {
        let mut portfolio = Portfolio::new(1_000.0);
        portfolio.apply_buy(10.0, 1.0, 0.0).unwrap();
        assert_eq!(
            portfolio.apply_buy(10.0, 1.0, 0.0),
            Err(GatewayError::PositionExists)
        );
    }

    #[test]
    fn sell_without_holding_is_rejected() {
        let mut portfolio = Portfolio::new(1_000.0);
        assert_eq!(portfolio.apply_sell(10.0, 0.0), Err(GatewayError::NoPosition));
    }
}
