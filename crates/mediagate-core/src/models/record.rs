use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use super::attributes::MediaAttributes;
use super::identity::Identity;
use crate::error::AppError;

/// Flat state discriminator as stored in the `media_files.state` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "file_state", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Stable,
    Adding,
    Replacing,
    BeingReplaced,
    Deleting,
}

/// Workflow state of a record together with the relations that state requires.
///
/// Only `BeingReplaced` carries the replacement links and only `Deleting`
/// carries the requesting identity, so a record value cannot hold a relation
/// its state does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    /// Live and not pending any change.
    Stable,
    /// Proposed by a Standard identity, waiting for approval.
    Adding,
    /// Holds staged content proposed as the successor of another record.
    Replacing,
    /// Waiting for its successor `on`, proposed by identity `by`.
    BeingReplaced { by: Uuid, on: Uuid },
    /// Removal proposed by identity `by`.
    Deleting { by: Uuid },
}

impl RecordState {
    pub fn kind(&self) -> StateKind {
        match self {
            RecordState::Stable => StateKind::Stable,
            RecordState::Adding => StateKind::Adding,
            RecordState::Replacing => StateKind::Replacing,
            RecordState::BeingReplaced { .. } => StateKind::BeingReplaced,
            RecordState::Deleting { .. } => StateKind::Deleting,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, RecordState::Stable)
    }

    pub fn being_replaced_by(&self) -> Option<Uuid> {
        match self {
            RecordState::BeingReplaced { by, .. } => Some(*by),
            _ => None,
        }
    }

    pub fn being_replaced_on(&self) -> Option<Uuid> {
        match self {
            RecordState::BeingReplaced { on, .. } => Some(*on),
            _ => None,
        }
    }

    pub fn deleting_by(&self) -> Option<Uuid> {
        match self {
            RecordState::Deleting { by } => Some(*by),
            _ => None,
        }
    }

    /// Rebuild a state from its stored columns, rejecting any combination that
    /// breaks the state/relation bijection.
    pub fn from_columns(
        kind: StateKind,
        being_replaced_by: Option<Uuid>,
        being_replaced_on: Option<Uuid>,
        deleting_by: Option<Uuid>,
    ) -> Result<Self, AppError> {
        let state = match (kind, being_replaced_by, being_replaced_on, deleting_by) {
            (StateKind::Stable, None, None, None) => RecordState::Stable,
            (StateKind::Adding, None, None, None) => RecordState::Adding,
            (StateKind::Replacing, None, None, None) => RecordState::Replacing,
            (StateKind::BeingReplaced, Some(by), Some(on), None) => {
                RecordState::BeingReplaced { by, on }
            }
            (StateKind::Deleting, None, None, Some(by)) => RecordState::Deleting { by },
            _ => {
                return Err(AppError::Inconsistent(format!(
                    "state {:?} with being_replaced_by={:?}, being_replaced_on={:?}, deleting_by={:?}",
                    kind, being_replaced_by, being_replaced_on, deleting_by
                )))
            }
        };
        Ok(state)
    }
}

/// One media file and its workflow state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    /// File-store key; unique across records.
    pub path: String,
    #[serde(flatten)]
    pub state: RecordState,
    pub added_by: Uuid,
    pub attributes: MediaAttributes,
    pub added_at: DateTime<Utc>,
}

impl Record {
    /// Build a record for freshly stored content.
    ///
    /// Privileged identities create live records; Standard identities create
    /// records waiting for approval.
    pub fn new(path: impl Into<String>, attributes: MediaAttributes, added_by: &Identity) -> Self {
        let state = if added_by.is_privileged() {
            RecordState::Stable
        } else {
            RecordState::Adding
        };

        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            state,
            added_by: added_by.id,
            attributes,
            added_at: Utc::now(),
        }
    }
}

/// Database row for `media_files` (relations flattened into nullable columns).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct RecordRow {
    pub id: Uuid,
    pub path: String,
    pub state: StateKind,
    pub added_by: Uuid,
    pub being_replaced_by: Option<Uuid>,
    pub being_replaced_on: Option<Uuid>,
    pub deleting_by: Option<Uuid>,
    pub attributes: JsonValue,
    pub added_at: DateTime<Utc>,
}

impl TryFrom<RecordRow> for Record {
    type Error = AppError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let state = RecordState::from_columns(
            row.state,
            row.being_replaced_by,
            row.being_replaced_on,
            row.deleting_by,
        )
        .map_err(|e| AppError::Inconsistent(format!("record {}: {}", row.id, e)))?;

        let attributes: MediaAttributes = serde_json::from_value(row.attributes).map_err(|e| {
            AppError::Inconsistent(format!("record {} has unreadable attributes: {}", row.id, e))
        })?;

        Ok(Record {
            id: row.id,
            path: row.path,
            state,
            added_by: row.added_by,
            attributes,
            added_at: row.added_at,
        })
    }
}

impl From<&Record> for RecordRow {
    fn from(record: &Record) -> Self {
        RecordRow {
            id: record.id,
            path: record.path.clone(),
            state: record.state.kind(),
            added_by: record.added_by,
            being_replaced_by: record.state.being_replaced_by(),
            being_replaced_on: record.state.being_replaced_on(),
            deleting_by: record.state.deleting_by(),
            attributes: serde_json::to_value(&record.attributes).unwrap_or(JsonValue::Null),
            added_at: record.added_at,
        }
    }
}
