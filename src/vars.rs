use serde_json::Value;

use crate::color::{
    color_to_hexstr, colorstr_to_tuple, get_contrasting_accent_colors, invert_color,
    most_frequent_color,
};
use crate::context::Context;
use crate::error::{ArtwallError, ArtwallResult};

/// A variable provider computes a JSON object whose top-level entries are
/// merged into the live variable set.
pub type ProviderFn = Box<dyn Fn(&Context) -> ArtwallResult<Value> + Send + Sync>;

/// Minimum contrast between the accent pair before the inversion fallback.
const ACCENT_MIN_CONTRAST: f64 = 2.0;

/// Accent clusters sampled from the artwork.
const ACCENT_CLUSTERS: usize = 4;

/// Ordered provider registry. Merge order is registration order: built-ins
/// first (in a fixed sequence), external registrations after, later wins on
/// key collisions.
pub struct ProviderRegistry {
    entries: Vec<(String, ProviderFn)>,
}

impl ProviderRegistry {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.entries
            .push(("default_vars".to_string(), Box::new(default_vars)));
        reg.entries.push(("colors".to_string(), Box::new(colors)));
        reg.entries.push(("uuid4".to_string(), Box::new(uuid4)));
        reg
    }

    /// Register an external provider. Names must be unique.
    pub fn register(&mut self, name: impl Into<String>, f: ProviderFn) -> ArtwallResult<()> {
        let name = name.into();
        if self.entries.iter().any(|(n, _)| *n == name) {
            return Err(ArtwallError::config(format!(
                "variable provider '{name}' is already registered"
            )));
        }
        self.entries.push((name, f));
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderFn)> {
        self.entries.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

/// Screen dimensions and track metadata, addressable as `{screen.width}`,
/// `{metadata.title}` and friends.
fn default_vars(ctx: &Context) -> ArtwallResult<Value> {
    Ok(serde_json::json!({
        "screen": ctx.screen,
        "metadata": ctx.metadata,
    }))
}

/// Color variables computed from the current artwork. Every color comes with
/// an `_inverted` partner.
fn colors(ctx: &Context) -> ArtwallResult<Value> {
    let (most_frequent, accent, second_accent) = match &ctx.src_image {
        None => (
            "#ffffff".to_string(),
            "#ffffff".to_string(),
            "#000000".to_string(),
        ),
        Some(img) => {
            let mf = color_to_hexstr(most_frequent_color(img));
            let (bg, fg) = get_contrasting_accent_colors(img, ACCENT_MIN_CONTRAST, ACCENT_CLUSTERS);
            (mf, color_to_hexstr(fg), color_to_hexstr(bg))
        }
    };

    let mut map = serde_json::Map::new();
    let mut push = |name: &str, hex: String| -> ArtwallResult<()> {
        let inverted = color_to_hexstr(invert_color(colorstr_to_tuple(&hex)?));
        map.insert(format!("{name}_inverted"), Value::String(inverted));
        map.insert(name.to_string(), Value::String(hex));
        Ok(())
    };

    push("most_frequent_color", most_frequent)?;
    push("accent_color", accent)?;
    push("second_accent_color", second_accent)?;
    // Kept for template compatibility; never computed from the artwork.
    push("least_frequent_color", "#000000".to_string())?;

    Ok(Value::Object(map))
}

/// A fresh v4 UUID each cycle, handy for unique output file names.
fn uuid4(_ctx: &Context) -> ArtwallResult<Value> {
    Ok(serde_json::json!({
        "uuid4": uuid::Uuid::new_v4().to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registration_order_is_fixed() {
        let reg = ProviderRegistry::with_builtins();
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(names, ["default_vars", "colors", "uuid4"]);
    }

    #[test]
    fn duplicate_provider_names_are_rejected() {
        let mut reg = ProviderRegistry::with_builtins();
        let err = reg
            .register("colors", Box::new(|_| Ok(serde_json::json!({}))))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn external_providers_append_after_builtins() {
        let mut reg = ProviderRegistry::with_builtins();
        reg.register("extra", Box::new(|_| Ok(serde_json::json!({"x": 1}))))
            .unwrap();
        assert_eq!(reg.names().last(), Some("extra"));
    }
}
