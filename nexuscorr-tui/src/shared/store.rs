//! Latest correlation snapshot and its derived symbol headers

use crate::shared::types::{Cell, CorrelationMatrix};
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Default)]
pub struct MatrixStore {
    matrix: CorrelationMatrix,
    symbols: Vec<String>,
    snapshot_count: u64,
    last_update: Option<DateTime<Utc>>,
}

impl MatrixStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored matrix wholesale and rebuild the symbol headers
    pub fn apply(&mut self, matrix: CorrelationMatrix) {
        self.symbols = matrix.symbols().map(str::to_string).collect();
        self.matrix = matrix;
        self.snapshot_count += 1;
        self.last_update = Some(Utc::now());
    }

    /// Apply every snapshot already queued on `rx` without waiting, in arrival order
    ///
    /// Returns the number of snapshots applied.
    pub fn apply_pending(&mut self, rx: &mut mpsc::Receiver<CorrelationMatrix>) -> usize {
        let mut applied = 0;
        while let Ok(matrix) = rx.try_recv() {
            self.apply(matrix);
            applied += 1;
        }
        applied
    }

    pub fn matrix(&self) -> &CorrelationMatrix {
        &self.matrix
    }

    /// Row and column headers, in snapshot key order
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn cell(&self, row: &str, col: &str) -> Cell {
        self.matrix.get(row, col).into()
    }

    /// Full grid in header order, one `(row symbol, cells)` entry per row
    pub fn rows(&self) -> impl Iterator<Item = (&str, Vec<Cell>)> + '_ {
        self.symbols.iter().map(move |row| {
            let cells = self
                .symbols
                .iter()
                .map(|col| self.cell(row, col))
                .collect();
            (row.as_str(), cells)
        })
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn snapshot_count(&self) -> u64 {
        self.snapshot_count
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(json: &str) -> CorrelationMatrix {
        json.parse().unwrap()
    }

    #[test]
    fn test_apply_derives_symbols_in_key_order() {
        let mut store = MatrixStore::new();
        assert!(store.is_empty());

        store.apply(matrix(
            r#"{"BTC":{"BTC":1.0,"ETH":0.5},"ETH":{"BTC":0.5,"ETH":1.0}}"#,
        ));

        assert_eq!(store.symbols(), ["BTC", "ETH"]);
        assert_eq!(store.snapshot_count(), 1);
        assert!(store.last_update().is_some());
    }

    #[test]
    fn test_snapshots_replace_not_merge() {
        let mut store = MatrixStore::new();
        store.apply(matrix(r#"{"BTC":{"BTC":1.0,"SOL":0.3},"SOL":{"SOL":1.0}}"#));
        store.apply(matrix(r#"{"ETH":{"ETH":1.0}}"#));

        assert_eq!(store.symbols(), ["ETH"]);
        assert_eq!(store.cell("BTC", "SOL"), Cell::Unknown);
        assert_eq!(store.cell("ETH", "ETH"), Cell::Value(1.0));
    }

    #[test]
    fn test_missing_cells_render_unknown() {
        let mut store = MatrixStore::new();
        store.apply(matrix(
            r#"{"BTC":{"BTC":1.0,"ETH":0.82},"ETH":{"ETH":1.0},"SOL":{}}"#,
        ));

        let rows: Vec<(&str, Vec<String>)> = store
            .rows()
            .map(|(row, cells)| (row, cells.iter().map(Cell::to_string).collect()))
            .collect();

        assert_eq!(
            rows,
            vec![
                ("BTC", vec!["1.0000".to_string(), "0.8200".to_string(), "-".to_string()]),
                ("ETH", vec!["-".to_string(), "1.0000".to_string(), "-".to_string()]),
                ("SOL", vec!["-".to_string(), "-".to_string(), "-".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_apply_pending_keeps_arrival_order() {
        let (tx, mut rx) = mpsc::channel(8);
        tx.send(matrix(r#"{"BTC":{"BTC":1.0}}"#)).await.unwrap();
        tx.send(matrix(r#"{"ETH":{"ETH":1.0}}"#)).await.unwrap();

        let mut store = MatrixStore::new();
        assert_eq!(store.apply_pending(&mut rx), 2);
        assert_eq!(store.symbols(), ["ETH"]);
        assert_eq!(store.snapshot_count(), 2);

        assert_eq!(store.apply_pending(&mut rx), 0);
    }
}
