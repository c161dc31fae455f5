//! Variable resolution for service files.
//!
//! Supports the subset of framework variable syntax needed before parsing:
//! - `${env:VAR}` - environment variable, error if unset
//! - `${env:VAR, fallback}` - use fallback if VAR is unset or empty (quotes optional)
//! - `${opt:name}` / `${opt:name, fallback}` - command-line option (stage, region)
//!
//! Every other `${...}` expression, including `${self:...}` and the
//! `${GetResourceArn: ...}` placeholder, is left untouched.

use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::LazyLock;

static VARIABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?x)
        \$\{\s*
            (env|opt)                       # variable source (1)
            :
            ([A-Za-z_][A-Za-z0-9_.\-]*)     # variable name (2)
            \s*
            (?:
                ,\s*
                (?:
                    '([^']*)'               # single-quoted fallback (3)
                    |"([^"]*)"              # double-quoted fallback (4)
                    |([^}]*?)               # bare fallback (5)
                )
                \s*
            )?
        \}
        "#,
    )
    .expect("Invalid regex pattern")
});

/// Result of resolving variables in a service file.
#[derive(Debug)]
pub struct VariableResolution {
    /// The text with every resolvable variable substituted.
    pub text: String,
    /// Every variable that could not be resolved.
    pub errors: Vec<String>,
}

impl VariableResolution {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Resolve `${env:...}` and `${opt:...}` variables in `input`.
///
/// Errors are accumulated so every unresolved variable is reported at once.
pub fn resolve_variables(input: &str, options: &HashMap<String, String>) -> VariableResolution {
    let mut errors = Vec::new();

    let text = VARIABLE_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let whole = &caps[0];
            let source = &caps[1];
            let name = &caps[2];
            let fallback = caps
                .get(3)
                .or_else(|| caps.get(4))
                .or_else(|| caps.get(5))
                .map(|m| m.as_str().trim());

            let value = match source {
                "env" => env::var(name).ok(),
                _ => options.get(name).cloned(),
            };

            match (value, fallback) {
                (Some(value), _) if value.contains('\n') || value.contains('\r') => {
                    errors.push(format!(
                        "variable '{source}:{name}' contains newlines, which is not allowed"
                    ));
                    whole.to_string()
                }
                (Some(value), Some(fallback)) if value.is_empty() => fallback.to_string(),
                (Some(value), _) => value,
                (None, Some(fallback)) => fallback.to_string(),
                (None, None) => {
                    errors.push(format!("variable '{source}:{name}' is not set"));
                    whole.to_string()
                }
            }
        })
        .into_owned();

    VariableResolution { text, errors }
}
