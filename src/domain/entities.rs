//! Domain entities: trees, paths, steps, options and solutions

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of every entity name.
pub const NAME_MAX_LENGTH: usize = 63;

/// Creation timestamp at the precision the store keeps (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }
    };
}

entity_id!(
    /// Identifier of a [`Tree`].
    TreeId
);
entity_id!(
    /// Identifier of a [`Path`].
    PathId
);
entity_id!(
    /// Identifier of a [`Step`].
    StepId
);
entity_id!(
    /// Identifier of a [`StepOption`].
    OptionId
);
entity_id!(
    /// Identifier of a [`Solution`].
    SolutionId
);

/// The acting identity behind a request.
///
/// Authentication happens outside this crate; the principal only carries
/// what the core needs: a name to record as creator and the write gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub name: String,
    pub superuser: bool,
}

impl Principal {
    pub fn new(name: impl Into<String>, superuser: bool) -> Self {
        Self {
            name: name.into(),
            superuser,
        }
    }

    /// Principal with write access.
    pub fn superuser(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    /// Principal limited to reads.
    pub fn reader(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }
}

/// Top-level container grouping paths toward a set of solutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    pub id: TreeId,
    /// Unique per creator
    pub name: String,
    pub description: String,
    /// Member paths (a path may belong to several trees)
    pub paths: Vec<PathId>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl Tree {
    pub fn new(name: impl Into<String>, description: impl Into<String>, creator: &str) -> Self {
        Self {
            id: TreeId::new(),
            name: name.into(),
            description: description.into(),
            paths: Vec::new(),
            creator: creator.to_string(),
            created_at: now(),
        }
    }
}

/// Navigable collection of steps; steps may be shared across paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    pub id: PathId,
    pub name: String,
    pub steps: Vec<StepId>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl Path {
    pub fn new(name: impl Into<String>, creator: &str) -> Self {
        Self {
            id: PathId::new(),
            name: name.into(),
            steps: Vec::new(),
            creator: creator.to_string(),
            created_at: now(),
        }
    }
}

/// Role of a step in traversal.
///
/// A step is the entry point, an internal decision point, or a terminal
/// node carrying exactly one solution. "First and final" cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepRole {
    Initial,
    Internal,
    Final(SolutionId),
}

impl StepRole {
    pub fn is_first(&self) -> bool {
        matches!(self, StepRole::Initial)
    }

    pub fn is_final(&self) -> bool {
        matches!(self, StepRole::Final(_))
    }

    pub fn solution(&self) -> Option<SolutionId> {
        match self {
            StepRole::Final(solution) => Some(*solution),
            _ => None,
        }
    }
}

impl fmt::Display for StepRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepRole::Initial => write!(f, "first"),
            StepRole::Internal => write!(f, "internal"),
            StepRole::Final(_) => write!(f, "final"),
        }
    }
}

/// Decision point of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub name: String,
    pub role: StepRole,
    /// Owning paths; the step lives as long as this set is non-empty
    pub paths: BTreeSet<PathId>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl Step {
    pub fn new(name: impl Into<String>, role: StepRole, creator: &str) -> Self {
        Self {
            id: StepId::new(),
            name: name.into(),
            role,
            paths: BTreeSet::new(),
            creator: creator.to_string(),
            created_at: now(),
        }
    }
}

/// Labeled choice offered at a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOption {
    pub id: OptionId,
    pub name: String,
    /// Step offering this option
    pub step: StepId,
    /// Step reached by choosing it; `None` ends the walk without advancing
    pub next_step: Option<StepId>,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl StepOption {
    pub fn new(
        name: impl Into<String>,
        step: StepId,
        next_step: Option<StepId>,
        creator: &str,
    ) -> Self {
        Self {
            id: OptionId::new(),
            name: name.into(),
            step,
            next_step,
            creator: creator.to_string(),
            created_at: now(),
        }
    }
}

/// Terminal recommendation: a design pattern or other structural hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    pub id: SolutionId,
    pub name: String,
    /// Markdown body
    pub description: String,
    /// URL-safe identifier
    pub slug: String,
    pub creator: String,
    pub created_at: DateTime<Utc>,
}

impl Solution {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        slug: impl Into<String>,
        creator: &str,
    ) -> Self {
        Self {
            id: SolutionId::new(),
            name: name.into(),
            description: description.into(),
            slug: slug.into(),
            creator: creator.to_string(),
            created_at: now(),
        }
    }
}

/// Derive a URL-safe slug from a display name.
///
/// `"Strategy Pattern!"` → `"strategy-pattern"`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
