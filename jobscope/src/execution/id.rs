use std::fmt;
use std::str::FromStr;

use jobscope_shared::errors::JobscopeError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of one execution (a random 128-bit UUID).
///
/// Rendered in hyphenated form, which is also the name of the execution's
/// directory in the artifact store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(Uuid);

impl ExecutionId {
    /// Mint a fresh id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ExecutionId {
    type Err = JobscopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| JobscopeError::UnknownExecution(format!("{s} is not an execution id: {e}")))
    }
}

impl From<Uuid> for ExecutionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}
