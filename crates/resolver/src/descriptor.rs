//! Request and response descriptors written as definition files.
//!
//! The request descriptor captures one inbound HTTP call so resources can
//! read it through the `request` import. The response descriptor is what
//! the renderer turns into the final negotiated bytes.

use std::fmt::Write as _;

/// Full URI of a module inside the schema package.
pub fn schema_uri(schema_package: &str, module: &str) -> String {
    format!("{schema_package}#/{module}")
}

/// Escape a value for a double-quoted string literal.
///
/// `\(` opens an interpolation in the authoring language, so a literal
/// backslash before `(` must not survive unescaped.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// One inbound HTTP call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: String,
    /// Header name/value pairs, one entry per value
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Query parameter name/value pairs, one entry per value
    pub params: Vec<(String, String)>,
}

impl RequestDescriptor {
    pub fn to_definition(&self, schema_package: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "amends \"{}\"\n",
            schema_uri(schema_package, "APIServerRequest.pkl")
        );
        let _ = writeln!(out, "url = \"{}\"", escape(&self.url));
        let _ = writeln!(out, "method = \"{}\"", escape(&self.method));
        write_mapping(&mut out, "headers", &self.headers);
        let _ = writeln!(out, "data = \"{}\"", escape(&self.body));
        write_mapping(&mut out, "params", &self.params);
        out
    }
}

fn write_mapping(out: &mut String, block: &str, pairs: &[(String, String)]) {
    let _ = writeln!(out, "{block} {{");
    for (name, value) in pairs {
        let _ = writeln!(out, "  [\"{}\"] = \"{}\"", escape(name), escape(value));
    }
    let _ = writeln!(out, "}}");
}

/// Outcome handed to the renderer for the final response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDescriptor {
    pub success: bool,
    pub data: Vec<String>,
    pub error_code: u16,
    pub error_message: String,
}

impl ResponseDescriptor {
    pub fn success(data: Vec<String>) -> Self {
        Self {
            success: true,
            data,
            error_code: 0,
            error_message: String::new(),
        }
    }

    pub fn to_definition(&self, schema_package: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "amends \"{}\"\n",
            schema_uri(schema_package, "APIServerResponse.pkl")
        );
        let _ = writeln!(out, "success = {}", self.success);
        if self.data.is_empty() {
            let _ = writeln!(out, "response {{}}");
        } else {
            let _ = writeln!(out, "response {{\n  data {{");
            for item in &self.data {
                let _ = writeln!(out, "    \"{}\"", escape(item));
            }
            let _ = writeln!(out, "  }}\n}}");
        }
        let _ = writeln!(
            out,
            "errors {{\n  code = {}\n  message = \"{}\"\n}}",
            self.error_code,
            escape(&self.error_message)
        );
        out
    }
}
