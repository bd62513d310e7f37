//! Backend-native query fragments attached to adapter-convention nodes.

use std::fmt;

use federa_core::{BackendKind, BitSet};
use serde::{Deserialize, Serialize};

/// Which part of a native query a fragment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Clause {
    Scan,
    Filter,
    Project,
    Aggregate,
    Sort,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scan => "scan",
            Self::Filter => "filter",
            Self::Project => "project",
            Self::Aggregate => "aggregate",
            Self::Sort => "sort",
        };
        f.write_str(name)
    }
}

/// Fragment body in the backend's own language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeBody {
    /// JSON query document (document stores, search indexes).
    Json(serde_json::Value),
    /// Textual query clause (wide-column stores, file stores).
    Text(String),
}

impl fmt::Display for NativeBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A piece of a backend-native query.
///
/// Dynamic parameters appear in the body as placeholders; `params` lists the
/// parameter indexes the executor must bind before sending it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFragment {
    pub backend: BackendKind,
    pub clause: Clause,
    pub body: NativeBody,
    pub params: BitSet,
}

impl NativeFragment {
    pub fn json(backend: BackendKind, clause: Clause, body: serde_json::Value) -> Self {
        Self {
            backend,
            clause,
            body: NativeBody::Json(body),
            params: BitSet::empty(),
        }
    }

    pub fn text(backend: BackendKind, clause: Clause, body: impl Into<String>) -> Self {
        Self {
            backend,
            clause,
            body: NativeBody::Text(body.into()),
            params: BitSet::empty(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: BitSet) -> Self {
        self.params = params;
        self
    }

    /// JSON body, if any.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match &self.body {
            NativeBody::Json(v) => Some(v),
            NativeBody::Text(_) => None,
        }
    }

    /// Text body, if any.
    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            NativeBody::Text(s) => Some(s),
            NativeBody::Json(_) => None,
        }
    }
}

impl fmt::Display for NativeFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} {}", self.backend, self.clause, self.body)
    }
}
