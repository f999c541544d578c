//! Response encodings a route can negotiate.
//!
//! One table drives sentinel detection, target file extension, the format
//! name handed to the renderer, and the HTTP content type, so the four can
//! never disagree.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A response encoding produced by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    Jsonnet,
    Textproto,
    Yaml,
    Plist,
    Xml,
    Pcf,
    #[default]
    Json,
}

impl ResponseFormat {
    /// Sentinel detection order: the first flag present wins.
    pub const PRIORITY: [ResponseFormat; 7] = [
        ResponseFormat::Jsonnet,
        ResponseFormat::Textproto,
        ResponseFormat::Yaml,
        ResponseFormat::Plist,
        ResponseFormat::Xml,
        ResponseFormat::Pcf,
        ResponseFormat::Json,
    ];

    /// Name of the zero-content flag file announcing this format.
    pub fn flag_file(self) -> &'static str {
        match self {
            Self::Jsonnet => "response-jsonnet",
            Self::Textproto => "response-txtpb",
            Self::Yaml => "response-yaml",
            Self::Plist => "response-plist",
            Self::Xml => "response-xml",
            Self::Pcf => "response-pcf",
            Self::Json => "response-json",
        }
    }

    /// Extension of the rendered response file (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jsonnet | Self::Json => "json",
            Self::Textproto => "txtpb",
            Self::Yaml => "yaml",
            Self::Plist => "plist",
            Self::Xml => "xml",
            Self::Pcf => "pcf",
        }
    }

    /// Format name understood by the renderer's `--format` flag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Jsonnet => "jsonnet",
            Self::Textproto => "textproto",
            Self::Yaml => "yaml",
            Self::Plist => "plist",
            Self::Xml => "xml",
            Self::Pcf => "pcf",
            Self::Json => "json",
        }
    }

    /// HTTP `Content-Type` for a response rendered in this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jsonnet | Self::Json => "application/json",
            Self::Textproto => "application/protobuf",
            Self::Yaml => "application/yaml",
            Self::Plist => "application/x-plist",
            Self::Xml => "application/xml",
            Self::Pcf => "text/plain",
        }
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRIORITY
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown response type: '{s}'"))
    }
}
