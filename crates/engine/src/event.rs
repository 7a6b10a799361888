use crate::decision::TrendEngine;
use crate::feed::BarGate;
use core_types::{Bar, Fill, OrderHandle};
use executor::OrderGateway;
use indicators::IndicatorEngine;
use tokio::sync::mpsc;

/// Everything the live host can tell the engine. Bars and order outcomes share
/// one channel so they are applied strictly in arrival order.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A closed bar and the account equity marked at its close.
    Bar { bar: Bar, equity: f64 },
    Fill(Fill),
    Rejected { handle: OrderHandle, reason: String },
}

/// Runs the engine until every sender of `event_rx` is dropped, then hands the
/// engine back to the caller.
pub async fn run_event_loop<G: OrderGateway>(
    mut event_rx: mpsc::Receiver<EngineEvent>,
    mut indicators: IndicatorEngine,
    mut engine: TrendEngine<G>,
) -> TrendEngine<G> {
    tracing::info!("Engine event loop started.");
    let mut gate = BarGate::new();

    while let Some(event) = event_rx.recv().await {
        match event {
            EngineEvent::Bar { bar, equity } => {
                if !gate.admit(&bar) {
                    continue;
                }
                if let Some(snapshot) = indicators.next(&bar) {
                    let decision = engine.on_bar(&bar, &snapshot, equity);
                    tracing::debug!(?decision, timestamp = %bar.timestamp, "Bar processed");
                }
            }
            EngineEvent::Fill(fill) => {
                engine.on_fill(&fill);
            }
            EngineEvent::Rejected { handle, reason } => {
                engine.on_reject(handle, &reason);
            }
        }
    }

    tracing::info!("Event channel closed. Engine event loop shutting down.");
    engine
}
