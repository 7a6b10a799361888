use crate::error::EngineError;
use crate::guard::SessionGuard;
use alerter::{AlertQueue, messages};
use chrono::NaiveDate;
use configuration::{Config, StopMode};
use core_types::{Bar, ExitReason, Fill, OrderHandle, OrderSide, Position, SessionState, TradeRecord};
use executor::OrderGateway;
use indicators::{Cross, IndicatorSnapshot};
use persistence::{SessionStore, TradeLedger};
use risk::PositionSizer;

/// The externally reported state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No position and the session is open for entries.
    Flat,
    /// A position is open or being closed.
    InPosition,
    /// No new entries until the next session.
    Locked,
}

/// What `on_bar` did with a bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// The bar failed a guard and changed nothing.
    Skipped,
    /// Nothing to do.
    Hold,
    /// The session is locked and no order was needed.
    Locked,
    EnterLong { handle: OrderHandle, size: f64 },
    Exit { handle: OrderHandle, reason: ExitReason },
}

/// What `on_fill` did with a fill.
#[derive(Debug, Clone, PartialEq)]
pub enum FillOutcome {
    Opened(Position),
    Closed(TradeRecord),
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingEntry {
    handle: OrderHandle,
    entry_price: f64,
    stop_price: f64,
    target_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Flat,
    EntryPending(PendingEntry),
    InPosition(Position),
    ExitPending {
        position: Position,
        handle: OrderHandle,
        reason: ExitReason,
    },
}

/// Strategy parameters the engine reads on every bar.
#[derive(Debug, Clone)]
struct Rules {
    symbol: String,
    adx_threshold: f64,
    stop_multiple: f64,
    stop_mode: StopMode,
    trailing_multiple: f64,
    target_multiple: Option<f64>,
    max_entries_per_session: Option<u32>,
}

/// The long-only trend-following decision engine.
///
/// It is driven by three inputs, all delivered on the same logical thread:
/// `on_bar` for each new bar with its indicator snapshot, and `on_fill` /
/// `on_reject` for the outcome of orders it submitted. It owns the session
/// state and persists it before any order or alert that depends on it.
pub struct TrendEngine<G: OrderGateway> {
    rules: Rules,
    guard: SessionGuard,
    sizer: PositionSizer,
    gateway: G,
    store: Box<dyn SessionStore>,
    ledger: Box<dyn TradeLedger>,
    alerts: AlertQueue,
    state: SessionState,
    phase: Phase,
    last_equity: Option<f64>,
}

impl<G: OrderGateway> TrendEngine<G> {
    /// Creates the engine and restores the session state from `store`.
    pub fn new(
        config: &Config,
        gateway: G,
        store: Box<dyn SessionStore>,
        ledger: Box<dyn TradeLedger>,
        alerts: AlertQueue,
    ) -> Result<Self, EngineError> {
        let risk = &config.risk_management;
        if !(risk.stop_multiple.is_finite() && risk.stop_multiple > 0.0) {
            return Err(EngineError::Configuration(
                "stop_multiple must be positive".to_string(),
            ));
        }
        let sizer = PositionSizer::from_params(risk)?;

        let state = store.load();
        tracing::info!(
            symbol = %config.instrument.symbol,
            last_date = ?state.last_date,
            locked = state.session_locked,
            trades = state.session_trades,
            "Session state restored"
        );

        Ok(Self {
            rules: Rules {
                symbol: config.instrument.symbol.clone(),
                adx_threshold: config.strategy.adx_threshold,
                stop_multiple: risk.stop_multiple,
                stop_mode: risk.stop_mode,
                trailing_multiple: risk.trailing_multiple,
                target_multiple: risk.target_multiple,
                max_entries_per_session: config.session.max_entries_per_session,
            },
            guard: SessionGuard::new(&config.session),
            sizer,
            gateway,
            store,
            ledger,
            alerts,
            state,
            phase: Phase::Flat,
            last_equity: None,
        })
    }

    pub fn session(&self) -> &SessionState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut G {
        &mut self.gateway
    }

    /// The open (or closing) position, if any.
    pub fn position(&self) -> Option<&Position> {
        match &self.phase {
            Phase::InPosition(position) | Phase::ExitPending { position, .. } => Some(position),
            _ => None,
        }
    }

    /// True while an entry or exit order awaits its fill.
    pub fn has_pending_order(&self) -> bool {
        matches!(self.phase, Phase::EntryPending(_) | Phase::ExitPending { .. })
    }

    pub fn engine_state(&self) -> EngineState {
        if self.is_locked() {
            EngineState::Locked
        } else if self.position().is_some() {
            EngineState::InPosition
        } else {
            EngineState::Flat
        }
    }

    fn is_locked(&self) -> bool {
        match self.state.last_date {
            Some(date) => self.state.is_locked_for(date),
            None => self.state.session_locked,
        }
    }

    /// Evaluates one bar. `equity` is the account value marked at this bar's close.
    pub fn on_bar(&mut self, bar: &Bar, snapshot: &IndicatorSnapshot, equity: f64) -> Decision {
        // 0. Guards.
        if let Err(e) = bar.validate() {
            tracing::warn!(error = %e, "Skipping malformed bar");
            return Decision::Skipped;
        }
        if !equity.is_finite() {
            tracing::warn!(equity, "Skipping bar with non-finite equity");
            return Decision::Skipped;
        }
        let date = bar.session_date();
        if self.state.last_date.is_some_and(|last| date < last) {
            tracing::warn!(%date, last = ?self.state.last_date, "Skipping bar from an earlier session");
            return Decision::Skipped;
        }

        let decision = self.evaluate(bar, snapshot, equity, date);
        self.last_equity = Some(equity);
        decision
    }

    fn evaluate(
        &mut self,
        bar: &Bar,
        snapshot: &IndicatorSnapshot,
        equity: f64,
        date: NaiveDate,
    ) -> Decision {
        // 1. Day rollover.
        if self.state.is_new_session(date) {
            self.state.roll_over(date, equity, self.last_equity);
            tracing::info!(%date, equity, "New session started");
            self.persist();
        }

        // 2. Locked sessions only finish flattening.
        if self.state.is_locked_for(date) {
            return match self.phase {
                Phase::InPosition(_) => self
                    .flatten(ExitReason::SessionLocked)
                    .unwrap_or(Decision::Locked),
                _ => Decision::Locked,
            };
        }

        // 3. Equity floor.
        if self.guard.floor_breached(equity) {
            self.state.lock();
            tracing::warn!(equity, floor = ?self.guard.equity_floor(), "Equity floor breached, locking session");
            self.persist();
            let decision = self.flatten(ExitReason::EquityFloor);
            self.alerts.notify(messages::equity_floor_hit(
                equity,
                self.guard.equity_floor().unwrap_or_default(),
                self.state.session_change_pct(equity),
                self.state.session_trades,
            ));
            return decision.unwrap_or(Decision::Locked);
        }

        // 4. Session cap.
        if self.guard.cap_reached(&self.state, equity) {
            self.state.record_cap_hit(date, equity);
            tracing::info!(equity, session_pnl = self.state.session_pnl, "Session cap reached, locking session");
            self.persist();
            let decision = self.flatten(ExitReason::SessionCap);
            self.alerts.notify(messages::session_booked(
                self.state.session_change_pct(equity),
                self.state.session_trades,
                self.state.session_start_equity.unwrap_or(equity),
                equity,
            ));
            return decision.unwrap_or(Decision::Locked);
        }

        match self.phase {
            // 5. Entry.
            Phase::Flat => self.try_enter(bar, snapshot, equity),
            // 6. Exit.
            Phase::InPosition(_) => self.manage_position(bar, snapshot),
            Phase::EntryPending(_) | Phase::ExitPending { .. } => Decision::Hold,
        }
    }

    fn try_enter(&mut self, bar: &Bar, snapshot: &IndicatorSnapshot, equity: f64) -> Decision {
        if snapshot.cross != Cross::Up || snapshot.adx <= self.rules.adx_threshold {
            return Decision::Hold;
        }
        if let Some(max) = self.rules.max_entries_per_session {
            if self.state.session_entries >= max {
                tracing::debug!(max, "Entry limit for the session reached");
                return Decision::Hold;
            }
        }

        let entry_price = bar.close;
        let stop_price = entry_price - self.rules.stop_multiple * snapshot.atr;
        if stop_price >= entry_price {
            tracing::debug!(entry_price, stop_price, "Stop not below entry, skipping entry");
            return Decision::Hold;
        }
        let size = self.sizer.size(equity, entry_price, stop_price);
        if size <= 0.0 {
            tracing::debug!(equity, entry_price, stop_price, "Position size is zero, skipping entry");
            return Decision::Hold;
        }
        let target_price = self
            .rules
            .target_multiple
            .map(|k| entry_price + k * snapshot.atr);

        match self.gateway.submit_buy(size) {
            Ok(handle) => {
                tracing::info!(%handle, size, entry_price, stop_price, ?target_price, adx = snapshot.adx, "Entry submitted");
                self.phase = Phase::EntryPending(PendingEntry {
                    handle,
                    entry_price,
                    stop_price,
                    target_price,
                });
                Decision::EnterLong { handle, size }
            }
            Err(e) => {
                tracing::warn!(error = %e, size, "Entry rejected by gateway");
                Decision::Hold
            }
        }
    }

    fn manage_position(&mut self, bar: &Bar, snapshot: &IndicatorSnapshot) -> Decision {
        let Phase::InPosition(position) = &mut self.phase else {
            return Decision::Hold;
        };

        position.highest_close = position.highest_close.max(bar.close);
        if self.rules.stop_mode == StopMode::Trailing {
            let trailed = position.highest_close - self.rules.trailing_multiple * snapshot.atr;
            if trailed > position.stop_price {
                tracing::debug!(from = position.stop_price, to = trailed, "Trailing stop raised");
                position.stop_price = trailed;
            }
        }

        let reason = if bar.low <= position.stop_price {
            Some(ExitReason::StopLoss)
        } else if position.target_price.is_some_and(|target| bar.high >= target) {
            Some(ExitReason::Target)
        } else if snapshot.ema_fast < snapshot.ema_slow {
            Some(ExitReason::CrossDown)
        } else {
            None
        };

        match reason {
            Some(reason) => self.flatten(reason).unwrap_or(Decision::Hold),
            None => Decision::Hold,
        }
    }

    /// Submits one close for an open position with no close pending.
    ///
    /// Returns `None` when there was nothing to close or the gateway refused.
    fn flatten(&mut self, reason: ExitReason) -> Option<Decision> {
        if !matches!(self.phase, Phase::InPosition(_)) {
            return None;
        }
        let Phase::InPosition(position) = std::mem::replace(&mut self.phase, Phase::Flat) else {
            return None;
        };

        match self.gateway.submit_close() {
            Ok(handle) => {
                tracing::info!(%handle, %reason, size = position.size, "Exit submitted");
                self.phase = Phase::ExitPending {
                    position,
                    handle,
                    reason,
                };
                Some(Decision::Exit { handle, reason })
            }
            Err(e) => {
                tracing::warn!(error = %e, %reason, "Close rejected by gateway");
                self.phase = Phase::InPosition(position);
                None
            }
        }
    }

    /// Applies a fill reported by the gateway.
    pub fn on_fill(&mut self, fill: &Fill) -> FillOutcome {
        match std::mem::replace(&mut self.phase, Phase::Flat) {
            Phase::EntryPending(entry) if entry.handle == fill.handle && fill.side == OrderSide::Buy => {
                self.open_position(entry, fill)
            }
            Phase::ExitPending {
                position,
                handle,
                reason,
            } if handle == fill.handle && fill.side == OrderSide::Sell => {
                let pnl = fill
                    .position_pnl_on_close
                    .unwrap_or_else(|| position.pnl_at(fill.filled_price));
                let record =
                    TradeRecord::from_close(&position, fill.filled_price, pnl, fill.timestamp.date());
                tracing::info!(%reason, pnl, exit = fill.filled_price, "Position closed");
                self.on_trade_closed(record.clone());
                FillOutcome::Closed(record)
            }
            other => {
                self.phase = other;
                tracing::warn!(handle = %fill.handle, side = ?fill.side, "Ignoring fill for an unknown order");
                FillOutcome::Ignored
            }
        }
    }

    fn open_position(&mut self, entry: PendingEntry, fill: &Fill) -> FillOutcome {
        let position = Position {
            side: OrderSide::Buy,
            entry_price: fill.filled_price,
            size: fill.filled_size,
            stop_price: entry.stop_price,
            target_price: entry.target_price,
            highest_close: entry.entry_price,
            opened_at: fill.timestamp,
        };
        self.state.record_entry();
        self.persist();
        self.phase = Phase::InPosition(position.clone());
        tracing::info!(size = position.size, price = position.entry_price, stop = position.stop_price, "Position opened");

        self.alerts.notify(messages::entry_filled(
            &self.rules.symbol,
            position.size,
            position.entry_price,
            position.stop_price,
            position.target_price,
        ));

        if self.is_locked() {
            tracing::warn!("Entry filled after the session locked, closing immediately");
            self.flatten(ExitReason::SessionLocked);
        }
        FillOutcome::Opened(position)
    }

    /// Records a closed trade: ledger, session counters, persistence, alert.
    pub fn on_trade_closed(&mut self, record: TradeRecord) {
        if let Err(e) = self.ledger.append(&record) {
            tracing::error!(error = %e, "Failed to append trade to ledger");
        }
        self.state.record_trade(record.pnl);
        self.persist();
        self.phase = Phase::Flat;

        self.alerts.notify(messages::position_closed(
            &self.rules.symbol,
            record.pnl,
            record.return_pct,
        ));
    }

    /// Applies a rejection reported by the gateway after submission.
    pub fn on_reject(&mut self, handle: OrderHandle, reason: &str) {
        match std::mem::replace(&mut self.phase, Phase::Flat) {
            Phase::EntryPending(entry) if entry.handle == handle => {
                tracing::warn!(%handle, reason, "Entry order rejected, staying flat");
            }
            Phase::ExitPending {
                position,
                handle: pending,
                ..
            } if pending == handle => {
                tracing::warn!(%handle, reason, "Close order rejected, position remains open");
                self.phase = Phase::InPosition(position);
            }
            other => {
                tracing::debug!(%handle, reason, "Rejection for an unknown order");
                self.phase = other;
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.state) {
            tracing::error!(error = %e, "Failed to persist session state, continuing in memory");
        }
    }
}
