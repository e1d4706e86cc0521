//! Rendering of command results.

use std::io::{Read, Write};
use std::path::Path;

use esc_sdk::environ::{prepare_environment, PrepareOptions};
use esc_sdk::models::{EnvironmentDiagnostic, NamedProperties};
use esc_sdk::resolve::{redact_named_properties, resolve_named_properties};
use serde_json::Value as JsonValue;

use crate::cli::OpenFormat;

/// How an environment's values are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueOptions {
    pub format: OpenFormat,
    pub show_secrets: bool,
    /// Skip writing `files` entries; their paths print as `[unknown]`.
    pub pretend: bool,
}

/// dotenv and shell output only covers whole environments.
pub fn check_property_format(format: OpenFormat, property: Option<&str>) -> anyhow::Result<()> {
    if property.is_some() {
        anyhow::ensure!(
            matches!(format, OpenFormat::Json | OpenFormat::Yaml),
            "--format {} cannot be combined with --property",
            format
        );
    }
    Ok(())
}

/// Read a definition from `path`, or from `stdin` when `path` is `-`.
pub fn read_input(path: &Path, mut stdin: impl Read) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        stdin.read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path).map_err(|e| anyhow::anyhow!("failed to read {}: {}", path.display(), e))
}

/// Print one diagnostic per line. Returns whether there were any.
pub fn write_diagnostics(out: &mut impl Write, diagnostics: &[EnvironmentDiagnostic]) -> std::io::Result<bool> {
    for diag in diagnostics {
        match diag.path {
            Some(ref path) => writeln!(out, "{}: {}", path, diag.summary)?,
            None => writeln!(out, "{}", diag.summary)?,
        }
    }
    Ok(!diagnostics.is_empty())
}

/// Write a single resolved value as JSON or YAML.
pub fn write_value(out: &mut impl Write, format: OpenFormat, value: &JsonValue) -> anyhow::Result<()> {
    match format {
        OpenFormat::Yaml => serde_yaml::to_writer(&mut *out, value)?,
        _ => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Write every top-level property of an environment.
///
/// Secrets are redacted unless `show_secrets` is set. dotenv and shell
/// output project `environmentVariables` and `files`.
pub fn write_environment(
    out: &mut impl Write,
    properties: Option<&NamedProperties>,
    options: ValueOptions,
) -> anyhow::Result<()> {
    match options.format {
        OpenFormat::Json | OpenFormat::Yaml => {
            let values = if options.show_secrets {
                resolve_named_properties(properties)
            } else {
                redact_named_properties(properties)
            };
            write_value(out, options.format, &values.map(JsonValue::Object).unwrap_or(JsonValue::Null))
        }
        OpenFormat::Dotenv | OpenFormat::Shell => {
            let empty = NamedProperties::new();
            let prepared = prepare_environment(
                properties.unwrap_or(&empty),
                PrepareOptions {
                    quote: true,
                    redact: !options.show_secrets,
                    pretend: options.pretend,
                },
            )?;
            out.write_all(prepared.render(options.format == OpenFormat::Shell).as_bytes())?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn props() -> NamedProperties {
        serde_json::from_value(json!({
            "foo": {"value": "bar"},
            "password": {"value": "hunter2", "secret": true},
            "environmentVariables": {
                "value": {
                    "FOO": {"value": "bar"},
                    "TOKEN": {"value": "s3cr3t", "secret": true}
                }
            },
            "files": {
                "value": {"CERT": {"value": "-----BEGIN-----\n"}}
            }
        }))
        .unwrap()
    }

    fn render(properties: Option<&NamedProperties>, options: ValueOptions) -> String {
        let mut out = Vec::new();
        write_environment(&mut out, properties, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn options(format: OpenFormat, show_secrets: bool) -> ValueOptions {
        ValueOptions {
            format,
            show_secrets,
            pretend: true,
        }
    }

    #[test]
    fn test_property_rejected_with_dotenv_and_shell() {
        for format in [OpenFormat::Dotenv, OpenFormat::Shell] {
            let err = check_property_format(format, Some("pulumiConfig")).unwrap_err();
            assert!(err.to_string().contains("cannot be combined with --property"));
        }
    }

    #[test]
    fn test_property_allowed_with_json_and_yaml() {
        assert!(check_property_format(OpenFormat::Json, Some("foo")).is_ok());
        assert!(check_property_format(OpenFormat::Yaml, Some("foo")).is_ok());
        assert!(check_property_format(OpenFormat::Shell, None).is_ok());
    }

    #[test]
    fn test_read_input_dash_reads_stdin() {
        let input = read_input(Path::new("-"), "values:\n  a: 1\n".as_bytes()).unwrap();
        assert_eq!(input, "values:\n  a: 1\n");
    }

    #[test]
    fn test_read_input_missing_file() {
        let err = read_input(Path::new("/nonexistent/env.yaml"), std::io::empty()).unwrap_err();
        assert!(err.to_string().starts_with("failed to read /nonexistent/env.yaml"));
    }

    #[test]
    fn test_write_diagnostics() {
        let diags = vec![
            EnvironmentDiagnostic {
                summary: "unknown property \"bad_ref\"".to_string(),
                path: Some("values.pulumiConfig.foo".to_string()),
                range: None,
            },
            EnvironmentDiagnostic {
                summary: "syntax error".to_string(),
                path: None,
                range: None,
            },
        ];
        let mut out = Vec::new();
        assert!(write_diagnostics(&mut out, &diags).unwrap());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "values.pulumiConfig.foo: unknown property \"bad_ref\"\nsyntax error\n"
        );
    }

    #[test]
    fn test_write_diagnostics_empty() {
        let mut out = Vec::new();
        assert!(!write_diagnostics(&mut out, &[]).unwrap());
        assert!(out.is_empty());
    }

    #[test]
    fn test_json_redacts_secrets() {
        let props = props();
        let out: JsonValue = serde_json::from_str(&render(Some(&props), options(OpenFormat::Json, false))).unwrap();
        assert_eq!(out["foo"], json!("bar"));
        assert_eq!(out["password"], json!("[secret]"));
        assert_eq!(out["environmentVariables"], json!({"FOO": "bar", "TOKEN": "[secret]"}));
    }

    #[test]
    fn test_json_shows_secrets() {
        let props = props();
        let out: JsonValue = serde_json::from_str(&render(Some(&props), options(OpenFormat::Json, true))).unwrap();
        assert_eq!(out["password"], json!("hunter2"));
        assert_eq!(out["environmentVariables"]["TOKEN"], json!("s3cr3t"));
    }

    #[test]
    fn test_yaml_output() {
        let props = props();
        let out = render(Some(&props), options(OpenFormat::Yaml, false));
        assert!(out.contains("foo: bar"));
        assert!(out.contains("[secret]"));
        assert!(!out.contains("hunter2"));
    }

    #[test]
    fn test_dotenv_includes_files() {
        let props = props();
        assert_eq!(
            render(Some(&props), options(OpenFormat::Dotenv, false)),
            "FOO=\"bar\"\nTOKEN=\"[secret]\"\nCERT=\"[unknown]\"\n"
        );
    }

    #[test]
    fn test_shell_exports() {
        let props = props();
        assert_eq!(
            render(Some(&props), options(OpenFormat::Shell, true)),
            "export FOO=\"bar\"\nexport TOKEN=\"s3cr3t\"\nexport CERT=\"[unknown]\"\n"
        );
    }

    #[test]
    fn test_absent_properties() {
        assert_eq!(render(None, options(OpenFormat::Json, false)), "null\n");
        assert_eq!(render(None, options(OpenFormat::Dotenv, false)), "");
    }
}
