//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over operation records from a CSV file.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of OperationRecords
//!                  ↓
//!           csv_format module
//!           (CsvRecord, convert_csv_record)
//! ```

use crate::io::csv_format::{convert_csv_record, CsvRecord};
use crate::types::OperationRecord;
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous CSV reader
///
/// Reads the operation log in batches with constant memory per batch.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    ///
    /// # Arguments
    ///
    /// * `reader` - Async reader providing CSV data
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 0,
        }
    }

    /// Read a batch of operation records
    ///
    /// Reads up to `batch_size` rows. Rows that fail to parse or convert are
    /// logged and skipped, and do not count towards the batch size.
    ///
    /// # Arguments
    ///
    /// * `batch_size` - Maximum number of records to read
    ///
    /// # Returns
    ///
    /// The converted records in file order. An empty vector means the end of
    /// the file was reached.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<OperationRecord> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<CsvRecord>();

        while batch.len() < batch_size {
            let Some(next) = records.next().await else {
                break;
            };
            self.line_num += 1;
            let line = self.line_num + 1;

            match next {
                Ok(csv_record) => match convert_csv_record(csv_record) {
                    Ok(record) => batch.push(record),
                    Err(e) => tracing::warn!(line, error = %e, "Skipping record"),
                },
                Err(e) => tracing::warn!(line, error = %e, "CSV parse error"),
            }
        }

        batch
    }
}
