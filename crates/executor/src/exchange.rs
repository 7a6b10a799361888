use crate::error::GatewayError;
use crate::portfolio::Portfolio;
use configuration::Simulation;
use core_types::{Bar, Fill, OrderHandle, OrderSide};

/// Where the decision engine sends its orders.
///
/// Submitting only acknowledges the order. The outcome arrives later as an
/// `OrderUpdate`, which the host feeds back to the engine.
pub trait OrderGateway {
    /// Submits a market buy for `size` units.
    fn submit_buy(&mut self, size: f64) -> Result<OrderHandle, GatewayError>;

    /// Submits a market sell for the whole open holding.
    fn submit_close(&mut self) -> Result<OrderHandle, GatewayError>;
}

/// The outcome of a submitted order.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderUpdate {
    Filled(Fill),
    Rejected { handle: OrderHandle, reason: String },
}

#[derive(Debug, Clone, Copy)]
struct PendingOrder {
    handle: OrderHandle,
    side: OrderSide,
    size: f64,
}

/// The "virtual exchange" for backtesting.
///
/// Market orders wait for the next bar and fill at its open, moved against the
/// trader by `slippage_pct` and charged `taker_fee_pct` of the fill notional.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    portfolio: Portfolio,
    pending: Option<PendingOrder>,
    params: Simulation,
}

impl SimulatedGateway {
    pub fn new(initial_capital: f64, params: Simulation) -> Self {
        Self {
            portfolio: Portfolio::new(initial_capital),
            pending: None,
            params,
        }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Calculates the execution price, modeling for slippage.
    fn execution_price(&self, side: OrderSide, open: f64) -> f64 {
        match side {
            // For a buy, slippage makes the price HIGHER (worse).
            OrderSide::Buy => open * (1.0 + self.params.slippage_pct),
            // For a sell, slippage makes the price LOWER (worse).
            OrderSide::Sell => open * (1.0 - self.params.slippage_pct),
        }
    }

    /// Fills the pending order, if any, at `bar`'s open.
    pub fn fill_pending(&mut self, bar: &Bar) -> Option<OrderUpdate> {
        let order = self.pending.take()?;
        let price = self.execution_price(order.side, bar.open);

        let update = match order.side {
            OrderSide::Buy => {
                let fee = price * order.size * self.params.taker_fee_pct;
                match self.portfolio.apply_buy(price, order.size, fee) {
                    Ok(()) => OrderUpdate::Filled(Fill {
                        handle: order.handle,
                        side: OrderSide::Buy,
                        filled_price: price,
                        filled_size: order.size,
                        position_pnl_on_close: None,
                        timestamp: bar.timestamp,
                    }),
                    Err(e) => OrderUpdate::Rejected {
                        handle: order.handle,
                        reason: e.to_string(),
                    },
                }
            }
            OrderSide::Sell => {
                let fee = price * order.size * self.params.taker_fee_pct;
                match self.portfolio.apply_sell(price, fee) {
                    Ok(pnl) => OrderUpdate::Filled(Fill {
                        handle: order.handle,
                        side: OrderSide::Sell,
                        filled_price: price,
                        filled_size: order.size,
                        position_pnl_on_close: Some(pnl),
                        timestamp: bar.timestamp,
                    }),
                    Err(e) => OrderUpdate::Rejected {
                        handle: order.handle,
                        reason: e.to_string(),
                    },
                }
            }
        };

        tracing::debug!(?update, open = bar.open, "SimulatedGateway: order processed");
        Some(update)
    }

    fn ensure_no_pending(&self) -> Result<(), GatewayError> {
        match &self.pending {
            Some(order) => Err(GatewayError::OrderPending(order.handle)),
            None => Ok(()),
        }
    }
}

impl OrderGateway for SimulatedGateway {
    fn submit_buy(&mut self, size: f64) -> Result<OrderHandle, GatewayError> {
        self.ensure_no_pending()?;
        if !(size.is_finite() && size > 0.0) {
            return Err(GatewayError::InvalidSize(size));
        }
        if !self.portfolio.is_flat() {
            return Err(GatewayError::PositionExists);
        }
        let handle = OrderHandle::new();
        self.pending = Some(PendingOrder {
            handle,
            side: OrderSide::Buy,
            size,
        });
        tracing::debug!(%handle, size, "SimulatedGateway: buy accepted");
        Ok(handle)
    }

    fn submit_close(&mut self) -> Result<OrderHandle, GatewayError> {
        self.ensure_no_pending()?;
        let holding = self.portfolio.holding.ok_or(GatewayError::NoPosition)?;
        let handle = OrderHandle::new();
        self.pending = Some(PendingOrder {
            handle,
            side: OrderSide::Sell,
            size: holding.size,
        });
        tracing::debug!(%handle, size = holding.size, "SimulatedGateway: close accepted");
        Ok(handle)
    }
}
