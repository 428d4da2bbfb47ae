use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Read;
use tracing::{info, warn};

use super::registry::TeamRegistry;
use super::types::TeamInput;
use crate::admin::AdminToken;
use crate::store::Store;

/// A row that could not be turned into a team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based position among the data rows (the header row is not counted)
    pub row_index: usize,
    /// Machine-readable reason, e.g. "DuplicateNumber"
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub errors: Vec<RowError>,
}

/// A parsed row, or the reason code and message explaining why it could not
/// be parsed.
pub type ParsedRow = std::result::Result<TeamInput, (String, String)>;

/// Create one team per row. A bad row is recorded and skipped; it never stops
/// the rows after it.
pub fn import_teams<S: Store + ?Sized>(
    registry: &mut TeamRegistry<'_, S>,
    admin: &AdminToken,
    rows: impl IntoIterator<Item = ParsedRow>,
) -> ImportReport {
    let mut report = ImportReport::default();

    for (i, row) in rows.into_iter().enumerate() {
        let row_index = i + 1;
        let outcome = match row {
            Ok(input) => registry
                .create(admin, &input)
                .map_err(|e| (e.code().to_string(), e.to_string())),
            Err(parse_error) => Err(parse_error),
        };

        match outcome {
            Ok(_) => report.success_count += 1,
            Err((reason, message)) => {
                warn!(row_index, %reason, "Skipping import row: {}", message);
                report.errors.push(RowError {
                    row_index,
                    reason,
                    message,
                });
            }
        }
    }

    info!(
        imported = report.success_count,
        skipped = report.errors.len(),
        "Team import finished"
    );
    report
}

/// Read team rows from CSV with a header row.
///
/// Recognised columns (case-insensitive): `number`, `name`, `location`,
/// `active`. Unknown columns are ignored. At least one of `number` and
/// `name` must be present.
pub fn read_team_rows<R: Read>(reader: R) -> Result<Vec<ParsedRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read CSV header row")?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let number_col = column("number");
    let name_col = column("name");
    let location_col = column("location");
    let active_col = column("active");

    if number_col.is_none() && name_col.is_none() {
        bail!("CSV needs a 'number' or 'name' column");
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let row = match record {
            Ok(record) => {
                let cell = |col: Option<usize>| {
                    col.and_then(|c| record.get(c))
                        .filter(|v| !v.is_empty())
                        .map(str::to_string)
                };
                parse_row(
                    cell(number_col),
                    cell(name_col),
                    cell(location_col),
                    cell(active_col),
                )
            }
            Err(e) => Err(("ParseError".to_string(), format!("Malformed CSV row: {}", e))),
        };
        rows.push(row);
    }
    Ok(rows)
}

fn parse_row(
    number: Option<String>,
    name: Option<String>,
    location: Option<String>,
    active: Option<String>,
) -> ParsedRow {
    let number = match number {
        None => None,
        Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
            (
                "InvalidNumber".to_string(),
                format!("Team number '{}' is not an integer", raw),
            )
        })?),
    };

    let active = match active.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("true" | "yes" | "y" | "1") => Some(true),
        Some("false" | "no" | "n" | "0") => Some(false),
        Some(other) => {
            return Err((
                "ParseError".to_string(),
                format!("Cannot read '{}' as active/inactive", other),
            ))
        }
    };

    Ok(TeamInput {
        number,
        name,
        location,
        active,
    })
}
