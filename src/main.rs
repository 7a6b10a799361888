use alerter::{AlertPolicy, AlertQueue, sink_from_config, spawn_alert_worker};
use analytics::{AnalyticsEngine, PerformanceReport};
use anyhow::Context;
use backtester::{Backtester, load_bars};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use comfy_table::Table;
use configuration::{Config, load_config};
use core_types::{SessionState, TradeRecord};
use persistence::{CsvTradeLedger, JsonFileSessionStore, SessionStore, read_trades};
use std::path::PathBuf;

/// The main entry point for the trendguard application.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Credentials may live in a .env file; it is optional.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard =
        configuration::init_tracing(&config.logging).context("Failed to initialise logging")?;

    match cli.command {
        Commands::Backtest(args) => handle_backtest(&config, args).await,
        Commands::State { action } => handle_state(&config, action),
        Commands::Trades => handle_trades(&config),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A rule-based trend-following engine with session guards.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a bar file through the engine against the simulated gateway.
    Backtest(BacktestArgs),
    /// Inspect or reset the persisted session state.
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Summarise the trade ledger.
    Trades,
}

#[derive(Parser)]
struct BacktestArgs {
    /// CSV file with date,open,high,low,close,volume columns.
    #[arg(long)]
    bars: PathBuf,

    /// Reset the persisted session state before replaying.
    #[arg(long)]
    fresh_state: bool,

    /// Show a progress bar.
    #[arg(long)]
    progress: bool,
}

#[derive(Subcommand)]
enum StateAction {
    Show,
    Reset,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_backtest(config: &Config, args: BacktestArgs) -> anyhow::Result<()> {
    let store = JsonFileSessionStore::new(&config.persistence.state_path);
    if args.fresh_state {
        store
            .save(&SessionState::default())
            .context("Failed to reset session state")?;
        tracing::info!(path = %store.path().display(), "Session state reset");
    }
    let ledger = CsvTradeLedger::new(
        &config.persistence.trades_path,
        config.persistence.record_return_pct,
    );

    let (alerts, alert_rx) = AlertQueue::bounded(config.alerts.queue_capacity);
    let worker = spawn_alert_worker(
        alert_rx,
        sink_from_config(&config.alerts),
        AlertPolicy::from_config(&config.alerts),
    );

    let bars = load_bars(&args.bars)?;
    let mut backtester = Backtester::new(config, Box::new(store), Box::new(ledger), alerts)?
        .with_progress(args.progress);
    let result = backtester.run(&bars)?;

    println!(
        "\n{} | {} bars ({} skipped) | {} → {}",
        config.instrument.symbol,
        result.bars_processed,
        result.bars_skipped,
        result.equity_curve.first().map(|(d, _)| d.to_string()).unwrap_or_default(),
        result.equity_curve.last().map(|(d, _)| d.to_string()).unwrap_or_default(),
    );
    println!("{}", trades_table(&result.trades));
    println!("{}", report_table(&result.report));

    // Dropping the engine closes the alert queue; the worker drains what is left.
    drop(backtester);
    worker.await.context("Alert worker panicked")?;
    Ok(())
}

fn handle_state(config: &Config, action: StateAction) -> anyhow::Result<()> {
    let store = JsonFileSessionStore::new(&config.persistence.state_path);
    match action {
        StateAction::Show => {
            let state = store.load();
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
        StateAction::Reset => {
            store
                .save(&SessionState::default())
                .context("Failed to reset session state")?;
            println!("Session state at {} reset.", store.path().display());
        }
    }
    Ok(())
}

fn handle_trades(config: &Config) -> anyhow::Result<()> {
    let path = &config.persistence.trades_path;
    let trades = read_trades(path)
        .with_context(|| format!("Failed to read trade ledger {}", path.display()))?;
    if trades.is_empty() {
        println!("No trades recorded in {}.", path.display());
        return Ok(());
    }

    let initial_capital = config.instrument.initial_capital;
    let curve = equity_from_trades(&trades, initial_capital);
    let report = AnalyticsEngine::new().calculate(&trades, &curve, initial_capital)?;

    println!("{}", trades_table(&trades));
    println!("{}", report_table(&report));
    Ok(())
}

// ==============================================================================
// Output Helpers
// ==============================================================================

/// Realised equity after each exit date, starting from `initial_capital`.
fn equity_from_trades(trades: &[TradeRecord], initial_capital: f64) -> Vec<(NaiveDate, f64)> {
    let mut sorted: Vec<&TradeRecord> = trades.iter().collect();
    sorted.sort_by_key(|t| t.date_out);

    let mut curve: Vec<(NaiveDate, f64)> = Vec::new();
    if let Some(start) = trades.iter().map(|t| t.date_in.min(t.date_out)).min() {
        curve.push((start.pred_opt().unwrap_or(start), initial_capital));
    }
    let mut equity = initial_capital;
    for trade in sorted {
        equity += trade.pnl;
        match curve.last_mut() {
            Some((date, value)) if *date == trade.date_out => *value = equity,
            _ => curve.push((trade.date_out, equity)),
        }
    }
    curve
}

fn trades_table(trades: &[TradeRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["In", "Out", "Shares", "Entry", "Exit", "PnL", "Return"]);
    for t in trades {
        table.add_row(vec![
            t.date_in.to_string(),
            t.date_out.to_string(),
            format!("{:.4}", t.shares),
            format!("{:.2}", t.entry_price),
            format!("{:.2}", t.exit_price),
            format!("{:+.2}", t.pnl),
            t.return_pct
                .map(|r| format!("{:+.2}%", r * 100.0))
                .unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

fn report_table(report: &PerformanceReport) -> Table {
    fn opt(value: Option<f64>, suffix: &str) -> String {
        value
            .map(|v| format!("{v:.2}{suffix}"))
            .unwrap_or_else(|| "n/a".to_string())
    }

    let mut table = Table::new();
    table.set_header(vec!["Metric", "Value"]);
    let rows = [
        ("Net profit", format!("{:+.2}", report.total_net_profit)),
        ("Gross profit", format!("{:.2}", report.gross_profit)),
        ("Gross loss", format!("{:.2}", report.gross_loss)),
        ("Total return", format!("{:+.2}%", report.total_return_pct)),
        ("CAGR", opt(report.cagr_pct, "%")),
        ("Max drawdown", format!("{:.2} ({:.2}%)", report.max_drawdown, report.max_drawdown_pct)),
        ("Profit factor", opt(report.profit_factor, "")),
        ("Sharpe", opt(report.sharpe_ratio, "")),
        ("Calmar", opt(report.calmar_ratio, "")),
        ("Trades", report.total_trades.to_string()),
        ("Win rate", opt(report.win_rate_pct, "%")),
        ("Average win", format!("{:.2}", report.average_win)),
        ("Average loss", format!("{:.2}", report.average_loss)),
        ("Payoff ratio", opt(report.payoff_ratio, "")),
        ("Avg holding (days)", format!("{:.1}", report.average_holding_days)),
    ];
    for (metric, value) in rows {
        table.add_row(vec![metric.to_string(), value]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(d_in: u32, d_out: u32, pnl: f64) -> TradeRecord {
        TradeRecord {
            date_in: NaiveDate::from_ymd_opt(2024, 6, d_in).unwrap(),
            date_out: NaiveDate::from_ymd_opt(2024, 6, d_out).unwrap(),
            shares: 1.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            pnl,
            return_pct: None,
        }
    }

    #[test]
    fn ledger_equity_starts_before_first_trade_and_merges_same_day_exits() {
        let trades = [trade(5, 7, 10.0), trade(2, 3, -5.0), trade(7, 7, 2.0)];
        let curve = equity_from_trades(&trades, 100.0);
        let day = |d| NaiveDate::from_ymd_opt(2024, 6, d).unwrap();
        assert_eq!(curve, vec![(day(1), 100.0), (day(3), 95.0), (day(7), 107.0)]);
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::try_parse_from([
            "trendguard",
            "--config",
            "alt.toml",
            "backtest",
            "--bars",
            "spy.csv",
            "--fresh-state",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("alt.toml"));
        match cli.command {
            Commands::Backtest(args) => {
                assert_eq!(args.bars, PathBuf::from("spy.csv"));
                assert!(args.fresh_state);
                assert!(!args.progress);
            }
            _ => panic!("expected backtest"),
        }
    }
}
