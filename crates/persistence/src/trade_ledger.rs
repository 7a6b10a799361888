use crate::error::PersistenceError;
use core_types::TradeRecord;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const BASE_HEADER: [&str; 6] = ["date_in", "date_out", "shares", "entry", "exit", "pnl"];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Append-only record of closed trades.
pub trait TradeLedger: Send {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError>;
}

/// Writes one CSV row per closed trade.
///
/// The header is written when the file is missing or empty, so reopening an
/// existing ledger never duplicates it.
#[derive(Debug, Clone)]
pub struct CsvTradeLedger {
    path: PathBuf,
    include_return_pct: bool,
}

impl CsvTradeLedger {
    pub fn new(path: impl Into<PathBuf>, include_return_pct: bool) -> Self {
        Self {
            path: path.into(),
            include_return_pct,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn header(&self) -> Vec<&'static str> {
        let mut header = BASE_HEADER.to_vec();
        if self.include_return_pct {
            header.push("return_pct");
        }
        header
    }

    fn row(&self, record: &TradeRecord) -> Vec<String> {
        let mut row = vec![
            record.date_in.format(DATE_FORMAT).to_string(),
            record.date_out.format(DATE_FORMAT).to_string(),
            record.shares.to_string(),
            record.entry_price.to_string(),
            record.exit_price.to_string(),
            record.pnl.to_string(),
        ];
        if self.include_return_pct {
            row.push(record.return_pct.map(|r| r.to_string()).unwrap_or_default());
        }
        row
    }
}

impl TradeLedger for CsvTradeLedger {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PersistenceError::io(&self.path, e))?;
        let needs_header = file
            .metadata()
            .map_err(|e| PersistenceError::io(&self.path, e))?
            .len()
            == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(self.header())?;
        }
        writer.write_record(self.row(record))?;
        writer.flush().map_err(|e| PersistenceError::io(&self.path, e))?;

        let file = writer
            .into_inner()
            .map_err(|e| PersistenceError::io(&self.path, e.into_error()))?;
        file.sync_data()
            .map_err(|e| PersistenceError::io(&self.path, e))?;

        tracing::debug!(path = %self.path.display(), pnl = record.pnl, "Trade appended to ledger");
        Ok(())
    }
}

/// Reads every record from a ledger file. A missing file is an empty ledger.
pub fn read_trades(path: &Path) -> Result<Vec<TradeRecord>, PersistenceError> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    let mut reader = csv::Reader::from_reader(file);
    let trades = reader
        .deserialize::<TradeRecord>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(trades)
}

/// An in-memory ledger for tests. Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryTradeLedger {
    records: Arc<Mutex<Vec<TradeRecord>>>,
}

impl MemoryTradeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TradeRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }
}

impl TradeLedger for MemoryTradeLedger {
    fn append(&mut self, record: &TradeRecord) -> Result<(), PersistenceError> {
        self.records
            .lock()
            .map_err(|_| PersistenceError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}
