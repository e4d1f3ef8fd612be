use std::collections::BTreeMap;

use crate::error::{ArtwallError, ArtwallResult};

/// The live variable set: top-level names mapped to JSON values. Nested
/// objects are addressed in templates with dotted paths.
pub type VarSet = BTreeMap<String, serde_json::Value>;

/// Substitute `{name}` / `{name.path}` placeholders in `template`.
///
/// `{{` and `}}` produce literal braces. A placeholder that names a missing
/// variable (or a missing attribute of a present one) is a config error.
pub fn substitute(template: &str, vars: &VarSet) -> ArtwallResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(inner) => name.push(inner),
                        None => {
                            return Err(ArtwallError::config(format!(
                                "unbalanced '{{' in template \"{template}\""
                            )));
                        }
                    }
                }
                out.push_str(&resolve(&name, vars)?);
            }
            '}' => {
                return Err(ArtwallError::config(format!(
                    "unbalanced '}}' in template \"{template}\""
                )));
            }
            other => out.push(other),
        }
    }

    Ok(out)
}

fn resolve(name: &str, vars: &VarSet) -> ArtwallResult<String> {
    let mut parts = name.split('.');
    let head = parts.next().unwrap_or_default();

    let mut value = vars
        .get(head)
        .ok_or_else(|| ArtwallError::config(format!("unknown variable \"{{{name}}}\"")))?;

    for part in parts {
        value = value
            .get(part)
            .ok_or_else(|| ArtwallError::config(format!("unknown variable \"{{{name}}}\"")))?;
    }

    Ok(render_value(value))
}

/// Stringify a variable value the way it appears in substituted arguments.
pub(crate) fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
