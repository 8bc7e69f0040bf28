//! Column encoding and row mapping.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;

use crate::domain::{
    OptionId, Path, PathId, Solution, SolutionId, Step, StepId, StepOption, StepRole, Tree, TreeId,
};
use crate::infrastructure::error::{StoreError, StoreResult};

macro_rules! sql_id {
    ($($name:ident),+) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.to_string()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )+
    };
}

sql_id!(TreeId, PathId, StepId, OptionId, SolutionId);

/// Fixed-width RFC 3339 so timestamps sort as text.
pub fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_ts(row: &Row<'_>, idx: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub const TREE_COLUMNS: &str = "id, name, description, creator, created_at";
pub const PATH_COLUMNS: &str = "id, name, creator, created_at";
pub const STEP_COLUMNS: &str = "id, name, is_first, is_final, solution_id, creator, created_at";
pub const OPTION_COLUMNS: &str = "id, name, step_id, next_step_id, creator, created_at";
pub const SOLUTION_COLUMNS: &str = "id, name, description, slug, creator, created_at";

/// Tree row without its path list.
pub fn tree_from_row(row: &Row<'_>) -> rusqlite::Result<Tree> {
    Ok(Tree {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        paths: Vec::new(),
        creator: row.get("creator")?,
        created_at: decode_ts(row, "created_at")?,
    })
}

/// Path row without its step list.
pub fn path_from_row(row: &Row<'_>) -> rusqlite::Result<Path> {
    Ok(Path {
        id: row.get("id")?,
        name: row.get("name")?,
        steps: Vec::new(),
        creator: row.get("creator")?,
        created_at: decode_ts(row, "created_at")?,
    })
}

/// Raw step row: role flags as stored.
pub struct StepRow {
    pub id: StepId,
    pub name: String,
    pub is_first: bool,
    pub is_final: bool,
    pub solution: Option<SolutionId>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

pub fn step_row(row: &Row<'_>) -> rusqlite::Result<StepRow> {
    Ok(StepRow {
        id: row.get("id")?,
        name: row.get("name")?,
        is_first: row.get("is_first")?,
        is_final: row.get("is_final")?,
        solution: row.get("solution_id")?,
        creator: row.get("creator")?,
        created_at: decode_ts(row, "created_at")?,
    })
}

impl StepRow {
    /// Decode the role flags. The schema constraints make the failure arm
    /// unreachable unless the database was edited behind our back.
    pub fn into_step(self, paths: BTreeSet<PathId>) -> StoreResult<Step> {
        let role = match (self.is_first, self.is_final, self.solution) {
            (true, false, None) => StepRole::Initial,
            (false, false, None) => StepRole::Internal,
            (false, true, Some(solution)) => StepRole::Final(solution),
            (is_first, is_final, solution) => {
                return Err(StoreError::Corrupt {
                    table: "steps",
                    message: format!(
                        "step {} has is_first={is_first} is_final={is_final} solution={solution:?}",
                        self.id
                    ),
                })
            }
        };
        Ok(Step {
            id: self.id,
            name: self.name,
            role,
            paths,
            creator: self.creator,
            created_at: self.created_at,
        })
    }
}

pub fn option_from_row(row: &Row<'_>) -> rusqlite::Result<StepOption> {
    Ok(StepOption {
        id: row.get("id")?,
        name: row.get("name")?,
        step: row.get("step_id")?,
        next_step: row.get("next_step_id")?,
        creator: row.get("creator")?,
        created_at: decode_ts(row, "created_at")?,
    })
}

pub fn solution_from_row(row: &Row<'_>) -> rusqlite::Result<Solution> {
    Ok(Solution {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        slug: row.get("slug")?,
        creator: row.get("creator")?,
        created_at: decode_ts(row, "created_at")?,
    })
}
