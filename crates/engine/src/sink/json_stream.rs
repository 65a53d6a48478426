//! NDJSON (newline-delimited JSON) stream sink.
//!
//! Each row is serialized directly to the writer without an intermediate
//! `String`.
//!
//! ```ignore
//! let mut sink = JsonStreamSink::stdout();
//! sink.write_summary(&summary)?;
//! sink.write_trades(&trades)?;
//! ```

use super::{EventRow, StepRow, SummaryRow, TradeRow};
use serde::Serialize;
use std::io::{self, BufWriter, Write};

/// Wraps any `Write` in a `BufWriter`; one JSON object per line.
pub struct JsonStreamSink<W: Write> {
    writer: BufWriter<W>,
    rows_written: usize,
}

impl JsonStreamSink<io::Stdout> {
    /// Write NDJSON to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonStreamSink<W> {
    /// Create a sink wrapping any writer (file, Vec<u8>, etc.).
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(64 * 1024, writer),
            rows_written: 0,
        }
    }

    pub fn write_summary(&mut self, row: &SummaryRow) -> io::Result<()> {
        self.write_row(row)
    }

    pub fn write_steps(&mut self, rows: &[StepRow<'_>]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    pub fn write_trades(&mut self, rows: &[TradeRow]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    pub fn write_events(&mut self, rows: &[EventRow<'_>]) -> io::Result<()> {
        rows.iter().try_for_each(|row| self.write_row(row))
    }

    /// Flush and return how many rows were written.
    pub fn finish(mut self) -> io::Result<usize> {
        self.writer.flush()?;
        Ok(self.rows_written)
    }

    fn write_row<T: Serialize>(&mut self, row: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, row).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.rows_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::StepRecord;
    use crate::sink::{event_rows, SummaryRow};
    use nftswap_core::{TradeEvent, TradeOutcome};

    #[test]
    fn ndjson_rows_are_tagged() {
        let mut buf = Vec::new();
        let mut sink = JsonStreamSink::new(&mut buf);

        let summary = SummaryRow {
            kind: "summary",
            total_steps: 7,
            failed_steps: 1,
            total_trades: 2,
            open: 1,
            accepted: 1,
            canceled: 0,
            rejected: 0,
            events: 3,
            elapsed_ms: 2,
        };
        let step = StepRecord {
            index: 4,
            op: "accept",
            ok: true,
            trade_id: Some(0),
            ..StepRecord::default()
        };
        let events = vec![TradeEvent::updated(0, TradeOutcome::Accepted)];

        sink.write_summary(&summary).unwrap();
        sink.write_steps(&[StepRow {
            kind: "step",
            step: &step,
        }])
        .unwrap();
        sink.write_events(&event_rows(&events)).unwrap();
        let n = sink.finish().unwrap();
        assert_eq!(n, 3);

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<serde_json::Value> = output
            .trim()
            .split('\n')
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);

        assert_eq!(lines[0]["kind"], "summary");
        assert_eq!(lines[1]["kind"], "step");
        assert_eq!(lines[1]["op"], "accept");
        assert_eq!(lines[1]["trade_id"], 0);
        assert_eq!(lines[2]["kind"], "event");
        assert_eq!(lines[2]["event"], "TradeUpdated");
        assert_eq!(lines[2]["outcome"], "accepted");
    }
}
