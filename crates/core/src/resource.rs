//! Resource definitions and the dependency map built from them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Mapping of resource id to the ids it requires, in declaration order.
pub type DependencyMap = HashMap<String, Vec<String>>;

/// The kind of work a resource performs.
///
/// Each kind owns one output record per request, written by the renderer
/// under `<action_dir>/<output_dir>/<request_id>__<output_dir>_output.pkl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Chat,
    HttpClient,
    Exec,
    Python,
    Data,
}

impl ActionKind {
    /// All kinds in the order their output records are imported.
    pub const ALL: [ActionKind; 5] = [
        ActionKind::Chat,
        ActionKind::HttpClient,
        ActionKind::Exec,
        ActionKind::Python,
        ActionKind::Data,
    ];

    /// Block keyword introducing this kind inside a definition.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::HttpClient => "httpClient",
            Self::Exec => "exec",
            Self::Python => "python",
            Self::Data => "data",
        }
    }

    /// Directory (and import alias) of this kind's output record.
    pub fn output_dir(self) -> &'static str {
        match self {
            Self::Chat => "llm",
            Self::HttpClient => "client",
            Self::Exec => "exec",
            Self::Python => "python",
            Self::Data => "data",
        }
    }

    /// Schema module the output record extends.
    pub fn schema_file(self) -> &'static str {
        match self {
            Self::Chat => "LLM.pkl",
            Self::HttpClient => "Http.pkl",
            Self::Exec => "Exec.pkl",
            Self::Python => "Python.pkl",
            Self::Data => "Data.pkl",
        }
    }

    /// Top-level block holding per-resource entries in the output record.
    pub fn record_block(self) -> &'static str {
        match self {
            Self::Data => "files",
            _ => "resources",
        }
    }

    /// File name of the output record for one request.
    pub fn record_file_name(self, request_id: &str) -> String {
        format!("{request_id}__{}_output.pkl", self.output_dir())
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.keyword() == keyword)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One entry of the resource catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntry {
    /// Identifier, unique within a catalog
    pub id: String,

    /// Identifiers this resource requires (possibly empty)
    #[serde(default)]
    pub requires: Vec<String>,

    /// Kind of work, when the definition declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ActionKind>,

    /// Location of the definition file
    pub file: PathBuf,
}
