use std::fmt;

use jobscope_shared::errors::{JobscopeError, JobscopeResult};
use serde::{Deserialize, Serialize};

use crate::execution::ExecutionId;

/// Kind of artifact an execution owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Working file, deleted at cleanup.
    Temporary,
    /// Durable result, fetched later by the client.
    Output,
    /// Stored request document (at most one per execution).
    Request,
    /// Stored response document (at most one per execution).
    Response,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Temporary,
        ArtifactKind::Output,
        ArtifactKind::Request,
        ArtifactKind::Response,
    ];

    /// Request and response are singletons addressed without a name.
    pub fn is_singleton(&self) -> bool {
        matches!(self, ArtifactKind::Request | ArtifactKind::Response)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Temporary => "temporary",
            ArtifactKind::Output => "output",
            ArtifactKind::Request => "request",
            ArtifactKind::Response => "response",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one artifact: `(execution, kind, name)`.
///
/// Temporary and output keys carry a name that is a single path component;
/// request and response keys carry none.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactKey {
    execution_id: ExecutionId,
    kind: ArtifactKind,
    name: Option<String>,
}

impl ArtifactKey {
    /// Build a validated key.
    pub fn new(
        execution_id: ExecutionId,
        kind: ArtifactKind,
        name: Option<&str>,
    ) -> JobscopeResult<Self> {
        match (kind.is_singleton(), name) {
            (true, Some(name)) => Err(JobscopeError::InvalidArtifactKey(format!(
                "{kind} artifacts are unnamed, got name {name:?}"
            ))),
            (true, None) => Ok(Self {
                execution_id,
                kind,
                name: None,
            }),
            (false, None) => Err(JobscopeError::InvalidArtifactKey(format!(
                "{kind} artifacts require a name"
            ))),
            (false, Some(name)) => {
                validate_name(name)?;
                Ok(Self {
                    execution_id,
                    kind,
                    name: Some(name.to_string()),
                })
            }
        }
    }

    pub fn temporary(execution_id: ExecutionId, name: &str) -> JobscopeResult<Self> {
        Self::new(execution_id, ArtifactKind::Temporary, Some(name))
    }

    pub fn output(execution_id: ExecutionId, name: &str) -> JobscopeResult<Self> {
        Self::new(execution_id, ArtifactKind::Output, Some(name))
    }

    pub fn request(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            kind: ArtifactKind::Request,
            name: None,
        }
    }

    pub fn response(execution_id: ExecutionId) -> Self {
        Self {
            execution_id,
            kind: ArtifactKind::Response,
            name: None,
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.execution_id
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}/{}/{}", self.execution_id, self.kind, name),
            None => write!(f, "{}/{}", self.execution_id, self.kind),
        }
    }
}

fn validate_name(name: &str) -> JobscopeResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(JobscopeError::InvalidArtifactKey(format!(
            "artifact name must be a single path component, got {name:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_named_kinds_require_name() {
        let id = ExecutionId::generate();

        assert!(ArtifactKey::new(id, ArtifactKind::Output, None).is_err());
        assert!(ArtifactKey::new(id, ArtifactKind::Temporary, None).is_err());
        assert!(ArtifactKey::output(id, "result.tif").is_ok());
    }

    #[test]
    fn test_singletons_reject_name() {
        let id = ExecutionId::generate();

        let err = ArtifactKey::new(id, ArtifactKind::Request, Some("req")).unwrap_err();
        assert!(matches!(err, JobscopeError::InvalidArtifactKey(_)));
        assert_eq!(
            ArtifactKey::new(id, ArtifactKind::Response, None).unwrap(),
            ArtifactKey::response(id)
        );
    }

    #[test]
    fn test_rejects_traversal() {
        let id = ExecutionId::generate();

        for bad in ["", ".", "..", "../escape", "a/b", "a\\b"] {
            assert!(ArtifactKey::output(id, bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_display() {
        let id = ExecutionId::generate();

        assert_eq!(
            ArtifactKey::temporary(id, "t.gml").unwrap().to_string(),
            format!("{id}/temporary/t.gml")
        );
        assert_eq!(ArtifactKey::request(id).to_string(), format!("{id}/request"));
    }

    proptest! {
        #[test]
        fn prop_names_with_separator_rejected(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
            let id = ExecutionId::generate();
            let name = format!("{prefix}/{suffix}");
            prop_assert!(ArtifactKey::output(id, &name).is_err());
        }

        #[test]
        fn prop_plain_names_accepted(name in "[A-Za-z0-9_-][A-Za-z0-9_.-]{0,40}") {
            prop_assume!(name != "." && name != "..");
            let id = ExecutionId::generate();
            let key = ArtifactKey::temporary(id, &name).unwrap();
            prop_assert_eq!(key.name(), Some(name.as_str()));
        }
    }
}
