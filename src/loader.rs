// 📂 Transaction Loader - CSV / JSON → Vec<Transaction>
// Ingestion adapter for the CLI and server; the detector itself never touches files

use crate::transaction::Transaction;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransactionFormat {
    /// Pick by file extension (.csv / .json)
    Auto,
    Csv,
    Json,
}

impl TransactionFormat {
    /// Resolve `Auto` against a path
    pub fn resolve(self, path: &Path) -> Result<TransactionFormat> {
        if self != TransactionFormat::Auto {
            return Ok(self);
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(TransactionFormat::Csv),
            Some("json") => Ok(TransactionFormat::Json),
            _ => bail!(
                "Cannot infer transaction format from {:?} (expected .csv or .json)",
                path
            ),
        }
    }
}

/// Load transactions from CSV with camelCase headers
///
/// Expected columns: id, sourceAccount, targetAccount, amount, category, time.
/// Empty cells become missing values; a missing id gets a fresh UUID.
pub fn load_csv(csv_path: &Path) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_path(csv_path).context("Failed to open CSV file")?;

    let mut transactions = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let transaction: Transaction = result
            .with_context(|| format!("Failed to deserialize transaction on row {}", line + 1))?;
        transactions.push(transaction);
    }

    Ok(transactions)
}

/// Load transactions from a JSON array
pub fn load_json(json_path: &Path) -> Result<Vec<Transaction>> {
    let file = File::open(json_path).context("Failed to open JSON file")?;

    let transactions: Vec<Transaction> = serde_json::from_reader(BufReader::new(file))
        .context("Failed to deserialize transactions from JSON")?;

    Ok(transactions)
}

/// Load transactions in the given (or inferred) format
pub fn load_transactions(path: &Path, format: TransactionFormat) -> Result<Vec<Transaction>> {
    match format.resolve(path)? {
        TransactionFormat::Csv => load_csv(path),
        TransactionFormat::Json => load_json(path),
        TransactionFormat::Auto => unreachable!("resolve never returns Auto"),
    }
}

// ============================================================================
// TESTS
// ============================================================================
