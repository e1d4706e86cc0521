//! Projections of an opened environment onto process environment variables.
//!
//! Scalar entries of the top-level `environmentVariables` property become
//! variables. Scalar entries of `files` are written to temporary files and
//! the file paths are exported under the entry's name.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::Result;
use crate::models::NamedProperties;
use crate::property::TypedProperty;
use crate::resolve::REDACTED;

pub const ENVIRONMENT_VARIABLES_KEY: &str = "environmentVariables";
pub const FILES_KEY: &str = "files";

/// Stand-in for a file path when files are not written.
pub const UNKNOWN_PATH: &str = "[unknown]";

/// A projected string value and whether it came from a secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedValue {
    pub value: String,
    pub secret: bool,
}

/// Options for [`prepare_environment`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrepareOptions {
    /// Quote values as JSON strings.
    pub quote: bool,
    /// Replace secret variable values with `[secret]`.
    pub redact: bool,
    /// Skip writing files; their variables get `[unknown]` as the path.
    pub pretend: bool,
}

/// `KEY=value` pairs for an environment, sorted by key within each
/// projection, plus the files written for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedEnvironment {
    pub environ: Vec<String>,
    /// Temporary files written for the `files` projection. The caller owns
    /// them.
    pub files: Vec<PathBuf>,
    /// Plaintext of every secret value, variables and file contents alike.
    pub secrets: Vec<String>,
}

impl PreparedEnvironment {
    /// One pair per line, optionally prefixed with `export `.
    pub fn render(&self, export: bool) -> String {
        let mut out = String::new();
        for pair in &self.environ {
            if export {
                out.push_str("export ");
            }
            out.push_str(pair);
            out.push('\n');
        }
        out
    }

    /// Delete the temporary files. Errors are ignored.
    pub fn remove_files(&self) {
        for path in &self.files {
            let _ = std::fs::remove_file(path);
        }
    }
}

/// Scalar entries of `environmentVariables`, stringified.
pub fn environment_variables(properties: &NamedProperties) -> BTreeMap<String, ProjectedValue> {
    project(properties, ENVIRONMENT_VARIABLES_KEY)
}

/// Scalar entries of `files`, stringified.
pub fn temporary_files(properties: &NamedProperties) -> BTreeMap<String, ProjectedValue> {
    project(properties, FILES_KEY)
}

/// Build the variable and file projections of an opened environment.
///
/// Variables come first, then one variable per file holding its path. If a
/// file cannot be written, the files already written are removed.
pub fn prepare_environment(properties: &NamedProperties, options: PrepareOptions) -> Result<PreparedEnvironment> {
    let mut prepared = PreparedEnvironment::default();

    for (name, projected) in environment_variables(properties) {
        let text = if projected.secret {
            prepared.secrets.push(projected.value.clone());
            if options.redact {
                REDACTED.to_string()
            } else {
                projected.value
            }
        } else {
            projected.value
        };
        prepared.environ.push(pair(&name, text, options.quote));
    }

    for (name, projected) in temporary_files(properties) {
        let path = if options.pretend {
            UNKNOWN_PATH.to_string()
        } else {
            match write_temporary_file(&projected.value) {
                Ok(path) => {
                    let text = path.display().to_string();
                    prepared.files.push(path);
                    text
                }
                Err(err) => {
                    prepared.remove_files();
                    return Err(err);
                }
            }
        };
        if projected.secret {
            prepared.secrets.push(projected.value);
        }
        prepared.environ.push(pair(&name, path, options.quote));
    }

    Ok(prepared)
}

fn pair(name: &str, text: String, quote: bool) -> String {
    if quote {
        format!("{}={}", name, JsonValue::String(text))
    } else {
        format!("{}={}", name, text)
    }
}

fn write_temporary_file(content: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new().prefix("esc-").tempfile()?;
    file.write_all(content.as_bytes())?;
    let (_, path) = file.keep().map_err(|e| e.error)?;
    debug!(path = %path.display(), "wrote temporary file");
    Ok(path)
}

fn project(properties: &NamedProperties, key: &str) -> BTreeMap<String, ProjectedValue> {
    let mut out = BTreeMap::new();
    let Some(record) = properties.get(key) else {
        return out;
    };

    let (section, section_secret) = record.value.unwrap_envelopes();
    let TypedProperty::Mapping(entries) = section else {
        return out;
    };

    let inherited = record.is_secret() || section_secret;
    for (name, entry) in entries {
        let (leaf, secret) = entry.unwrap_envelopes();
        if let Some(value) = scalar_text(leaf) {
            out.insert(
                name.clone(),
                ProjectedValue {
                    value,
                    secret: inherited || secret,
                },
            );
        }
    }
    out
}

fn scalar_text(property: &TypedProperty) -> Option<String> {
    match property {
        TypedProperty::Null => Some(String::new()),
        TypedProperty::Bool(b) => Some(b.to_string()),
        TypedProperty::Number(n) => Some(n.to_string()),
        TypedProperty::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props() -> NamedProperties {
        serde_json::from_value(json!({
            "environmentVariables": {
                "value": {
                    "FOO": {"value": "bar"},
                    "PORT": {"value": 8080},
                    "DEBUG": {"value": true},
                    "EMPTY": {"value": null},
                    "TOKEN": {"value": "s3cr3t", "secret": true},
                    "NESTED": {"value": {"a": {"value": 1}}},
                    "LIST": {"value": [1, 2]}
                }
            },
            "files": {
                "value": {
                    "KUBECONFIG": {"value": "apiVersion: v1\n", "secret": true}
                }
            },
            "other": {"value": "ignored"}
        }))
        .unwrap()
    }

    #[test]
    fn test_environment_variables_keeps_scalars() {
        let vars = environment_variables(&props());
        let names: Vec<&str> = vars.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["DEBUG", "EMPTY", "FOO", "PORT", "TOKEN"]);
        assert_eq!(vars["PORT"].value, "8080");
        assert_eq!(vars["DEBUG"].value, "true");
        assert_eq!(vars["EMPTY"].value, "");
        assert!(vars["TOKEN"].secret);
        assert!(!vars["FOO"].secret);
    }

    #[test]
    fn test_temporary_files() {
        let files = temporary_files(&props());
        assert_eq!(files.len(), 1);
        assert_eq!(files["KUBECONFIG"].value, "apiVersion: v1\n");
        assert!(files["KUBECONFIG"].secret);
    }

    #[test]
    fn test_missing_or_non_mapping_section_is_empty() {
        assert!(environment_variables(&NamedProperties::new()).is_empty());
        let props: NamedProperties = serde_json::from_value(json!({"environmentVariables": {"value": "x"}})).unwrap();
        assert!(environment_variables(&props).is_empty());
    }

    #[test]
    fn test_secret_section_marks_every_entry() {
        let props: NamedProperties = serde_json::from_value(json!({
            "environmentVariables": {"value": {"A": {"value": "1"}}, "secret": true}
        }))
        .unwrap();
        assert!(environment_variables(&props)["A"].secret);
    }

    #[test]
    fn test_prepare_pretend_plain() {
        let prepared = prepare_environment(
            &props(),
            PrepareOptions {
                pretend: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            prepared.environ,
            vec!["DEBUG=true", "EMPTY=", "FOO=bar", "PORT=8080", "TOKEN=s3cr3t", "KUBECONFIG=[unknown]"]
        );
        assert!(prepared.files.is_empty());
        assert_eq!(prepared.secrets, vec!["s3cr3t", "apiVersion: v1\n"]);
    }

    #[test]
    fn test_prepare_quoted_redacted_shell() {
        let options = PrepareOptions {
            quote: true,
            redact: true,
            pretend: true,
        };
        let out = prepare_environment(&props(), options).unwrap().render(true);
        assert_eq!(
            out,
            "export DEBUG=\"true\"\nexport EMPTY=\"\"\nexport FOO=\"bar\"\nexport PORT=\"8080\"\nexport TOKEN=\"[secret]\"\nexport KUBECONFIG=\"[unknown]\"\n"
        );
    }

    #[test]
    fn test_prepare_quotes_escapes() {
        let props: NamedProperties = serde_json::from_value(json!({
            "environmentVariables": {"value": {"MSG": {"value": "say \"hi\"\n"}}}
        }))
        .unwrap();
        let prepared = prepare_environment(
            &props,
            PrepareOptions {
                quote: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(prepared.render(false), "MSG=\"say \\\"hi\\\"\\n\"\n");
    }

    #[test]
    fn test_prepare_writes_files() {
        let prepared = prepare_environment(&props(), PrepareOptions::default()).unwrap();
        assert_eq!(prepared.files.len(), 1);

        let path = &prepared.files[0];
        assert_eq!(std::fs::read_to_string(path).unwrap(), "apiVersion: v1\n");
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("esc-"));
        assert_eq!(
            prepared.environ.last().unwrap(),
            &format!("KUBECONFIG={}", path.display())
        );

        prepared.remove_files();
        assert!(!path.exists());
    }

    #[test]
    fn test_prepare_empty_environment() {
        let prepared = prepare_environment(&NamedProperties::new(), PrepareOptions::default()).unwrap();
        assert_eq!(prepared, PreparedEnvironment::default());
        assert_eq!(prepared.render(true), "");
    }
}
