//! Text formats for the alerts the engine emits.

/// Whole-unit sizes print without decimals; fractional sizes keep four.
fn format_size(size: f64) -> String {
    if size.fract() == 0.0 {
        format!("{:.0}", size)
    } else {
        format!("{:.4}", size)
    }
}

pub fn entry_filled(symbol: &str, size: f64, price: f64, stop: f64, target: Option<f64>) -> String {
    let mut msg = format!(
        "LONG {} {} @ {:.2} SL {:.2}",
        format_size(size),
        symbol,
        price,
        stop
    );
    if let Some(target) = target {
        msg.push_str(&format!(" PT {:.2}", target));
    }
    msg
}

/// `return_fraction` is PnL over entry notional; it is shown as a percentage.
pub fn position_closed(symbol: &str, pnl: f64, return_fraction: Option<f64>) -> String {
    match return_fraction {
        Some(r) => format!("CLOSED {} {:+.1} $ ({:.2} %)", symbol, pnl, r * 100.0),
        None => format!("CLOSED {} {:+.1} $", symbol, pnl),
    }
}

pub fn session_booked(change_pct: f64, trades: u32, start_equity: f64, equity: f64) -> String {
    format!(
        "🎯 Session booked: {:+.2}% in {} trades. Equity: ${:.2} → ${:.2}. Bot locked until next session.",
        change_pct, trades, start_equity, equity
    )
}

pub fn equity_floor_hit(equity: f64, floor: f64, change_pct: f64, trades: u32) -> String {
    format!(
        "🛑 Equity floor hit: ${:.2} ≤ ${:.2}. Session {:+.2}% in {} trades. Bot locked until next session.",
        equity, floor, change_pct, trades
    )
}
