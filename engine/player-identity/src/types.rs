use crate::normalize::{canonical_position, normalize_name};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Encoded sentinel for numeric identifier columns
pub const NUMERIC_SENTINEL: i64 = -1;

/// Encoded sentinel for string identifier columns
pub const TEXT_SENTINEL: &str = "DUPLICATE_CLEARED";

static UNKNOWN_SLOT: IdSlot = IdSlot::Unknown;

/// Storage type of a provider identifier column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdKind {
    Numeric,
    Text,
}

/// A real identifier value assigned by one provider
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProviderValue {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for ProviderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderValue::Numeric(value) => write!(f, "{value}"),
            ProviderValue::Text(value) => write!(f, "{value}"),
        }
    }
}

/// State of one provider identifier on a record
///
/// `Cleared` is the sentinel: the identifier was removed because another
/// record kept it. It is distinct from `Unknown`, which means the provider
/// never supplied a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum IdSlot {
    #[default]
    Unknown,
    Cleared,
    Known(ProviderValue),
}

impl IdSlot {
    pub fn is_known(&self) -> bool {
        matches!(self, IdSlot::Known(_))
    }

    pub fn is_cleared(&self) -> bool {
        matches!(self, IdSlot::Cleared)
    }

    /// The real identifier, if any
    pub fn known(&self) -> Option<&ProviderValue> {
        match self {
            IdSlot::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Parse a raw text cell. Returns `None` when the text is not a valid
    /// identifier of the given kind.
    pub fn parse(kind: IdKind, raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("na") || raw.eq_ignore_ascii_case("null") {
            return Some(IdSlot::Unknown);
        }

        match kind {
            IdKind::Numeric => {
                let value = match raw.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        // CSV exports sometimes carry integral floats ("12345.0")
                        let float = raw.parse::<f64>().ok()?;
                        if float.fract() != 0.0 || !float.is_finite() {
                            return None;
                        }
                        float as i64
                    }
                };
                if value == NUMERIC_SENTINEL {
                    Some(IdSlot::Cleared)
                } else {
                    Some(IdSlot::Known(ProviderValue::Numeric(value)))
                }
            }
            IdKind::Text => {
                if raw == TEXT_SENTINEL {
                    Some(IdSlot::Cleared)
                } else {
                    Some(IdSlot::Known(ProviderValue::Text(raw.to_string())))
                }
            }
        }
    }

    /// Decode a JSON cell. Returns `None` for values of the wrong shape.
    pub fn from_json(kind: IdKind, value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(IdSlot::Unknown),
            serde_json::Value::String(raw) => Self::parse(kind, raw),
            serde_json::Value::Number(number) => Self::parse(kind, &number.to_string()),
            _ => None,
        }
    }

    /// Encode for output: real value, sentinel, or null
    pub fn encode(&self, kind: IdKind) -> serde_json::Value {
        match (self, kind) {
            (IdSlot::Unknown, _) => serde_json::Value::Null,
            (IdSlot::Cleared, IdKind::Numeric) => serde_json::Value::from(NUMERIC_SENTINEL),
            (IdSlot::Cleared, IdKind::Text) => serde_json::Value::from(TEXT_SENTINEL),
            (IdSlot::Known(ProviderValue::Numeric(value)), _) => serde_json::Value::from(*value),
            (IdSlot::Known(ProviderValue::Text(value)), _) => {
                serde_json::Value::from(value.clone())
            }
        }
    }
}

/// One provider identifier column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    /// Column name (e.g., "sleeper_id")
    pub name: String,

    /// Storage type of the column
    pub kind: IdKind,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>, kind: IdKind) -> Self {
        Self { name: name.into(), kind }
    }

    /// Label used in correction statuses ("sleeper_id" -> "sleeper")
    pub fn label(&self) -> &str {
        self.name.strip_suffix("_id").unwrap_or(&self.name)
    }
}

/// Ordered set of provider identifier columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderSchema {
    providers: Vec<ProviderSpec>,
}

impl ProviderSchema {
    pub fn new(providers: Vec<ProviderSpec>) -> Self {
        Self { providers }
    }

    pub fn get(&self, name: &str) -> Option<&ProviderSpec> {
        self.providers.iter().find(|spec| spec.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.providers.iter().position(|spec| spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderSpec> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Audit tag recording what happened to a record's identifiers
///
/// Each variant carries the provider label it refers to, so
/// `ClearedDuplicate("sleeper")` renders as `cleared_sleeper_duplicate`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum CorrectionStatus {
    #[default]
    Original,
    ClearedDuplicate(String),
    KeptNewer(String),
    KeptVerified(String),
    AddedId(String),
    CorrectedId(String),
}

impl CorrectionStatus {
    /// How informative this status is; a record's primary status is only
    /// ever replaced by a higher-ranked one
    pub fn rank(&self) -> u8 {
        match self {
            CorrectionStatus::Original => 0,
            CorrectionStatus::KeptNewer(_) => 1,
            CorrectionStatus::KeptVerified(_) => 2,
            CorrectionStatus::ClearedDuplicate(_) => 3,
            CorrectionStatus::AddedId(_) | CorrectionStatus::CorrectedId(_) => 4,
        }
    }

    /// Provider label the status refers to
    pub fn provider(&self) -> Option<&str> {
        match self {
            CorrectionStatus::Original => None,
            CorrectionStatus::ClearedDuplicate(label)
            | CorrectionStatus::KeptNewer(label)
            | CorrectionStatus::KeptVerified(label)
            | CorrectionStatus::AddedId(label)
            | CorrectionStatus::CorrectedId(label) => Some(label),
        }
    }

    /// Whether this status accounts for a sentinel on the given provider
    pub fn reflects_clearing(&self, label: &str) -> bool {
        match self {
            CorrectionStatus::ClearedDuplicate(l) | CorrectionStatus::CorrectedId(l) => l == label,
            _ => false,
        }
    }
}

impl fmt::Display for CorrectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionStatus::Original => write!(f, "original"),
            CorrectionStatus::ClearedDuplicate(label) => write!(f, "cleared_{label}_duplicate"),
            CorrectionStatus::KeptNewer(label) => write!(f, "kept_{label}_newer"),
            CorrectionStatus::KeptVerified(label) => write!(f, "kept_{label}_verified"),
            CorrectionStatus::AddedId(label) => write!(f, "added_{label}_id"),
            CorrectionStatus::CorrectedId(label) => write!(f, "corrected_{label}_id"),
        }
    }
}

impl FromStr for CorrectionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "original" {
            return Ok(CorrectionStatus::Original);
        }

        let parsed = if let Some(label) =
            s.strip_prefix("cleared_").and_then(|rest| rest.strip_suffix("_duplicate"))
        {
            CorrectionStatus::ClearedDuplicate(label.to_string())
        } else if let Some(label) =
            s.strip_prefix("kept_").and_then(|rest| rest.strip_suffix("_newer"))
        {
            CorrectionStatus::KeptNewer(label.to_string())
        } else if let Some(label) =
            s.strip_prefix("kept_").and_then(|rest| rest.strip_suffix("_verified"))
        {
            CorrectionStatus::KeptVerified(label.to_string())
        } else if let Some(label) =
            s.strip_prefix("added_").and_then(|rest| rest.strip_suffix("_id"))
        {
            CorrectionStatus::AddedId(label.to_string())
        } else if let Some(label) =
            s.strip_prefix("corrected_").and_then(|rest| rest.strip_suffix("_id"))
        {
            CorrectionStatus::CorrectedId(label.to_string())
        } else {
            return Err(format!("unrecognized correction status: {s}"));
        };

        match parsed.provider() {
            Some(label) if !label.is_empty() => Ok(parsed),
            _ => Err(format!("correction status without provider: {s}")),
        }
    }
}

impl From<CorrectionStatus> for String {
    fn from(status: CorrectionStatus) -> Self {
        status.to_string()
    }
}

impl TryFrom<String> for CorrectionStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Result of cross-checking a contested platform ID against the roster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BirthdateCheck {
    /// The record's platform ID is not shared with any other record
    #[default]
    Uncontested,
    /// Shared ID, and the record's birthdate equals the roster's
    ContestedVerified,
    /// Shared ID, and the record's birthdate differs from the roster's
    ContestedMismatch,
    /// Shared ID, but one of the two birthdates is absent
    ContestedUnverified,
}

/// A player record moving through the resolution pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerRecord {
    /// Dense surrogate key, assigned by the final stage
    pub canonical_id: Option<u32>,

    /// Position of the row in the loaded snapshot
    pub source_row: usize,

    /// Identifier slot per provider column; absent entries are `Unknown`
    pub provider_ids: BTreeMap<String, IdSlot>,

    pub name: String,
    pub normalized_name: String,
    pub position: String,
    pub team: String,
    pub birthdate: Option<NaiveDate>,
    pub draft_year: Option<i32>,

    /// Most informative status applied so far
    pub correction_status: CorrectionStatus,

    /// Every status applied, in stage order
    pub correction_history: Vec<CorrectionStatus>,

    pub birthdate_check: BirthdateCheck,
    pub roster_birthdate: Option<NaiveDate>,
}

impl PlayerRecord {
    /// Create a record with no identifiers
    pub fn new(source_row: usize, name: &str, position: &str, team: &str) -> Self {
        let name = name.trim().to_string();
        Self {
            canonical_id: None,
            source_row,
            provider_ids: BTreeMap::new(),
            normalized_name: normalize_name(&name),
            name,
            position: canonical_position(position),
            team: team.trim().to_uppercase(),
            birthdate: None,
            draft_year: None,
            correction_status: CorrectionStatus::Original,
            correction_history: Vec::new(),
            birthdate_check: BirthdateCheck::Uncontested,
            roster_birthdate: None,
        }
    }

    pub fn with_id(mut self, provider: &str, value: ProviderValue) -> Self {
        self.set_slot(provider, IdSlot::Known(value));
        self
    }

    pub fn with_slot(mut self, provider: &str, slot: IdSlot) -> Self {
        self.set_slot(provider, slot);
        self
    }

    pub fn with_birthdate(mut self, birthdate: Option<NaiveDate>) -> Self {
        self.birthdate = birthdate;
        self
    }

    pub fn with_draft_year(mut self, draft_year: Option<i32>) -> Self {
        self.draft_year = draft_year;
        self
    }

    pub fn slot(&self, provider: &str) -> &IdSlot {
        self.provider_ids.get(provider).unwrap_or(&UNKNOWN_SLOT)
    }

    pub fn set_slot(&mut self, provider: &str, slot: IdSlot) {
        if slot == IdSlot::Unknown {
            self.provider_ids.remove(provider);
        } else {
            self.provider_ids.insert(provider.to_string(), slot);
        }
    }

    /// Whether at least one provider column holds a real identifier
    pub fn has_known_id(&self) -> bool {
        self.provider_ids.values().any(IdSlot::is_known)
    }

    /// Record a correction. The primary status only moves to a strictly more
    /// informative value; the history keeps everything.
    pub fn apply_status(&mut self, status: CorrectionStatus) {
        if status.rank() > self.correction_status.rank() {
            self.correction_status = status.clone();
        }
        self.correction_history.push(status);
    }

    /// Whether any applied status explains a sentinel on this provider label
    pub fn accounts_for_sentinel(&self, label: &str) -> bool {
        self.correction_status.reflects_clearing(label)
            || self.correction_history.iter().any(|status| status.reflects_clearing(label))
    }

    /// First real identifier in schema order, used as the primary sort key
    /// for canonical numbering
    pub fn first_known_id(&self, schema: &ProviderSchema) -> Option<(usize, &ProviderValue)> {
        schema
            .iter()
            .enumerate()
            .find_map(|(index, spec)| self.slot(&spec.name).known().map(|value| (index, value)))
    }

    /// Total, deterministic order over records: name, then every identifier
    /// slot in schema order, then source row
    pub fn tiebreak_cmp(&self, other: &Self, schema: &ProviderSchema) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| {
                for spec in schema.iter() {
                    let own = slot_sort_key(self.slot(&spec.name));
                    let ordering = own.cmp(&slot_sort_key(other.slot(&spec.name)));
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            })
            .then_with(|| self.source_row.cmp(&other.source_row))
    }

    /// "Last, First" rendering of the player name
    pub fn name_last_first(&self) -> String {
        crate::normalize::last_first(&self.name)
    }
}

fn slot_sort_key(slot: &IdSlot) -> (u8, Option<&ProviderValue>) {
    match slot {
        IdSlot::Known(value) => (0, Some(value)),
        IdSlot::Cleared => (1, None),
        IdSlot::Unknown => (2, None),
    }
}
