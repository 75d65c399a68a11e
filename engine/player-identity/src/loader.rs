//! Snapshot and roster readers
//!
//! These adapt provider exports into pipeline records. They do no business
//! logic beyond decoding cells; sentinel encodings found in the input are
//! decoded to `Cleared` so the quality gate can see them.

use crate::error::{ResolveError, Result};
use crate::roster::RosterCandidate;
use crate::types::{IdSlot, PlayerRecord, ProviderSchema};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load a snapshot file; `.csv` files are read as CSV, anything else as JSON
pub async fn load_snapshot<P: AsRef<Path>>(
    path: P,
    schema: &ProviderSchema,
) -> Result<Vec<PlayerRecord>> {
    let path = path.as_ref();
    info!("Loading player snapshot from: {:?}", path);

    let content = tokio::fs::read_to_string(path).await?;
    let records = if is_csv(path) {
        parse_csv_snapshot(content.as_bytes(), schema)?
    } else {
        parse_json_snapshot(&content, schema)?
    };

    info!("Loaded {} snapshot rows", records.len());
    Ok(records)
}

/// Load a roster file (plain array or Sleeper `players/nfl` object)
pub async fn load_roster<P: AsRef<Path>>(path: P) -> Result<Vec<RosterCandidate>> {
    let path = path.as_ref();
    info!("Loading platform roster from: {:?}", path);

    let content = tokio::fs::read_to_string(path).await?;
    let roster = parse_roster_json(&content)?;

    info!("Loaded {} roster candidates", roster.len());
    Ok(roster)
}

fn is_csv(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Parse a JSON array of snapshot rows
pub fn parse_json_snapshot(content: &str, schema: &ProviderSchema) -> Result<Vec<PlayerRecord>> {
    let value: Value = serde_json::from_str(content)?;
    let rows = value
        .as_array()
        .ok_or_else(|| ResolveError::invalid_row(0, "snapshot must be a JSON array of objects"))?;

    rows.iter().enumerate().map(|(row, value)| record_from_json(row, value, schema)).collect()
}

fn record_from_json(row: usize, value: &Value, schema: &ProviderSchema) -> Result<PlayerRecord> {
    let object =
        value.as_object().ok_or_else(|| ResolveError::invalid_row(row, "row is not an object"))?;

    let name =
        text_field(object, "name").ok_or_else(|| ResolveError::invalid_row(row, "missing name"))?;
    let position = text_field(object, "position").unwrap_or_default();
    let team = text_field(object, "team").unwrap_or_default();
    let mut record = PlayerRecord::new(row, &name, &position, &team);

    for spec in schema.iter() {
        if let Some(cell) = object.get(&spec.name) {
            let slot =
                IdSlot::from_json(spec.kind, cell).ok_or_else(|| ResolveError::InvalidIdentifier {
                    provider: spec.name.clone(),
                    row,
                    value: cell.to_string(),
                })?;
            record.set_slot(&spec.name, slot);
        }
    }

    record.birthdate = parse_birthdate(row, text_field(object, "birthdate").as_deref());
    record.draft_year = parse_draft_year(row, text_field(object, "draft_year").as_deref())?;
    Ok(record)
}

/// Parse a CSV snapshot with a header row. A `name` column is required;
/// columns outside the schema are ignored.
pub fn parse_csv_snapshot<R: Read>(
    reader: R,
    schema: &ProviderSchema,
) -> Result<Vec<PlayerRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|header| header == name);

    let name_column =
        column("name").ok_or_else(|| ResolveError::config("snapshot has no name column"))?;
    let position_column = column("position");
    let team_column = column("team");
    let birthdate_column = column("birthdate");
    let draft_year_column = column("draft_year");
    let provider_columns: Vec<(usize, &crate::types::ProviderSpec)> =
        schema.iter().filter_map(|spec| column(&spec.name).map(|index| (index, spec))).collect();

    let mut records = Vec::new();
    for (row, result) in csv_reader.records().enumerate() {
        let fields = result?;
        let cell = |index: Option<usize>| index.and_then(|index| fields.get(index)).unwrap_or("");

        let name = cell(Some(name_column));
        if name.is_empty() {
            return Err(ResolveError::invalid_row(row, "missing name"));
        }
        let mut record = PlayerRecord::new(row, name, cell(position_column), cell(team_column));

        for (index, spec) in &provider_columns {
            let raw = cell(Some(*index));
            let slot = IdSlot::parse(spec.kind, raw).ok_or_else(|| ResolveError::InvalidIdentifier {
                provider: spec.name.clone(),
                row,
                value: raw.to_string(),
            })?;
            record.set_slot(&spec.name, slot);
        }

        record.birthdate = parse_birthdate(row, Some(cell(birthdate_column)));
        record.draft_year = parse_draft_year(row, Some(cell(draft_year_column)))?;
        records.push(record);
    }

    Ok(records)
}

/// Parse a roster document: either an array of candidate objects or an
/// object keyed by platform player ID (Sleeper's `players/nfl` shape)
pub fn parse_roster_json(content: &str) -> Result<Vec<RosterCandidate>> {
    let value: Value = serde_json::from_str(content)?;
    parse_roster_value(&value)
}

/// Same as [`parse_roster_json`] for an already decoded document
pub fn parse_roster_value(value: &Value) -> Result<Vec<RosterCandidate>> {
    let mut roster: Vec<RosterCandidate> = match value {
        Value::Array(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(row, entry)| {
                entry.as_object().and_then(|object| candidate_from_json(row, None, object))
            })
            .collect(),
        Value::Object(entries) => entries
            .iter()
            .enumerate()
            .filter_map(|(row, (key, entry))| {
                let object = entry.as_object()?;
                candidate_from_json(row, Some(key.as_str()), object)
            })
            .collect(),
        _ => return Err(ResolveError::invalid_row(0, "roster must be a JSON array or object")),
    };

    roster.sort_by(|a, b| a.player_id.cmp(&b.player_id));
    Ok(roster)
}

fn candidate_from_json(
    row: usize,
    key: Option<&str>,
    object: &Map<String, Value>,
) -> Option<RosterCandidate> {
    let player_id = text_field(object, "player_id").or_else(|| key.map(str::to_string))?;

    let full_name = text_field(object, "full_name").or_else(|| {
        let first = text_field(object, "first_name").unwrap_or_default();
        let last = text_field(object, "last_name").unwrap_or_default();
        let joined = format!("{} {}", first.trim(), last.trim()).trim().to_string();
        (!joined.is_empty()).then_some(joined)
    });
    let Some(full_name) = full_name else {
        debug!("Skipping roster entry {} without a name", player_id);
        return None;
    };

    let birthdate = text_field(object, "birthdate").or_else(|| text_field(object, "birth_date"));
    Some(RosterCandidate {
        player_id,
        full_name,
        position: text_field(object, "position"),
        birthdate: parse_birthdate(row, birthdate.as_deref()),
    })
}

fn text_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Birthdates are corroborating only; unreadable ones are dropped with a warning
fn parse_birthdate(row: usize, raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
        return None;
    }

    // Accept full timestamps by reading the date prefix
    let date_part = raw.get(..10).unwrap_or(raw);
    match NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!("Ignoring unreadable birthdate {:?} on row {}", raw, row);
            None
        }
    }
}

fn parse_draft_year(row: usize, raw: Option<&str>) -> Result<Option<i32>> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() || raw.eq_ignore_ascii_case("na") {
        return Ok(None);
    }

    let parsed = raw
        .parse::<i32>()
        .ok()
        .or_else(|| {
            raw.parse::<f64>().ok().filter(|year| year.fract() == 0.0).map(|year| year as i32)
        });
    parsed
        .map(Some)
        .ok_or_else(|| ResolveError::invalid_row(row, format!("draft_year is not a year: {raw}")))
}
