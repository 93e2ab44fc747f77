//! CSV format handling for operation logs and reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to operation records
//! - Report rows and their serialization
//!
//! All functions are pure (no I/O beyond the writer they are handed) for easy
//! testing.

use crate::types::{
    ItemStatus, Listing, Operation, OperationRecord, Points, ReplayError, Role, SwapStatus, UserId,
};
use csv::WriterBuilder;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns:
/// `op,actor,target,offer,label,email,title,description,category,size,condition`.
/// Every column after `actor` is optional, since each op only reads a few.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct CsvRecord {
    pub op: String,
    pub actor: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub offer: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Treat blank cells like absent ones
fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(
    value: Option<String>,
    op: &'static str,
    field: &'static str,
) -> Result<String, ReplayError> {
    present(value).ok_or(ReplayError::MissingField { op, field })
}

/// Convert a CsvRecord to an OperationRecord
///
/// This function:
/// - Parses the op name (case-insensitive) into an `Operation`
/// - Checks that the columns the op needs are present
/// - Leaves listing content unchecked; the engine validates it
///
/// # Arguments
///
/// * `csv_record` - The deserialized CSV record
///
/// # Returns
///
/// * `Ok(OperationRecord)` - Successfully converted record
/// * `Err(ReplayError::UnknownOp)` - The op column names no known operation
/// * `Err(ReplayError::MissingField)` - A column the op needs is blank
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<OperationRecord, ReplayError> {
    let CsvRecord {
        op,
        actor,
        target,
        offer,
        label,
        email,
        title,
        description,
        category,
        size,
        condition,
    } = csv_record;

    let operation = match op.trim().to_lowercase().as_str() {
        "register" => Operation::Register {
            email: required(email, "register", "email")?,
        },
        "admin" => Operation::Admin {
            email: required(email, "admin", "email")?,
        },
        "list" => Operation::List {
            label: required(label, "list", "label")?,
            listing: Listing {
                title: present(title).unwrap_or_default(),
                description: present(description).unwrap_or_default(),
                category: present(category).unwrap_or_default(),
                size: present(size).unwrap_or_default(),
                condition: present(condition).unwrap_or_default(),
                images: Vec::new(),
            },
        },
        "approve" => Operation::Approve {
            item: required(target, "approve", "target")?,
        },
        "reject_listing" => Operation::RejectListing {
            item: required(target, "reject_listing", "target")?,
        },
        "redeem" => Operation::Redeem {
            item: required(target, "redeem", "target")?,
        },
        "propose" => Operation::Propose {
            offer: required(offer, "propose", "offer")?,
            target: required(target, "propose", "target")?,
            label: required(label, "propose", "label")?,
        },
        "accept" => Operation::Accept {
            swap: required(target, "accept", "target")?,
        },
        "reject_swap" => Operation::RejectSwap {
            swap: required(target, "reject_swap", "target")?,
        },
        _ => return Err(ReplayError::UnknownOp { op }),
    };

    let actor = present(Some(actor)).ok_or(ReplayError::MissingField {
        op: operation.name(),
        field: "actor",
    })?;

    Ok(OperationRecord::new(UserId::new(actor), operation))
}

/// A row of one of the replay reports
///
/// Rows are written sorted by `sort_key`, under `HEADER`.
pub trait ReportRow: Serialize {
    const HEADER: &'static [&'static str];

    fn sort_key(&self) -> &str;
}

/// `users` report row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    pub user: String,
    pub email: String,
    pub role: Role,
    pub points: Points,
}

impl ReportRow for UserRow {
    const HEADER: &'static [&'static str] = &["user", "email", "role", "points"];

    fn sort_key(&self) -> &str {
        &self.user
    }
}

/// `items` report row; `item` is the label from the operation log
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemRow {
    pub item: String,
    pub uploader: String,
    pub title: String,
    pub approved: bool,
    pub status: ItemStatus,
}

impl ReportRow for ItemRow {
    const HEADER: &'static [&'static str] = &["item", "uploader", "title", "approved", "status"];

    fn sort_key(&self) -> &str {
        &self.item
    }
}

/// `swaps` report row; ids are replaced by their labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRow {
    pub swap: String,
    pub requester: String,
    pub requester_item: String,
    pub owner: String,
    pub owner_item: String,
    pub status: SwapStatus,
}

impl ReportRow for SwapRow {
    const HEADER: &'static [&'static str] = &[
        "swap",
        "requester",
        "requester_item",
        "owner",
        "owner_item",
        "status",
    ];

    fn sort_key(&self) -> &str {
        &self.swap
    }
}

/// Write report rows to CSV format
///
/// The header is always written, even for an empty report. Rows are sorted
/// by their key for deterministic output.
///
/// # Arguments
///
/// * `rows` - Rows to write, in any order
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_report_csv<R: ReportRow>(rows: &[R], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(output);

    writer
        .write_record(R::HEADER)
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted: Vec<&R> = rows.iter().collect();
    sorted.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));

    for row in sorted {
        writer
            .serialize(row)
            .map_err(|e| format!("Failed to write report record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
