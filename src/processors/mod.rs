pub mod basic;
pub mod blur;
pub mod gradient;
pub mod pop;
pub mod text;

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::error::{ArtwallError, ArtwallResult};

/// A processor consumes an image plus string-typed arguments and returns the
/// replacement image. Coercion of arguments is the processor's business.
pub type ProcessorFn = Box<dyn Fn(RgbaImage, &ProcessorArgs) -> ArtwallResult<RgbaImage> + Send + Sync>;

pub struct ProcessorRegistry {
    entries: BTreeMap<String, ProcessorFn>,
}

impl ProcessorRegistry {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// All built-in processors under their config-facing names.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.add("noop", basic::noop);
        reg.add("load_img", basic::load_img);
        reg.add("blank_img", basic::blank_img);
        reg.add("resize", basic::resize);
        reg.add("fit", basic::fit);
        reg.add("circle", basic::circle);
        reg.add("box_blur", blur::box_blur);
        reg.add("gaussian_blur", blur::gaussian_blur);
        reg.add("pop_filter", pop::pop_filter);
        reg.add("img_print", text::img_print);
        reg.add("radial_gradient", gradient::radial_gradient);
        reg
    }

    fn add(&mut self, name: &str, f: fn(RgbaImage, &ProcessorArgs) -> ArtwallResult<RgbaImage>) {
        self.entries.insert(name.to_string(), Box::new(f));
    }

    /// Register an external processor. Names must be unique.
    pub fn register(&mut self, name: impl Into<String>, f: ProcessorFn) -> ArtwallResult<()> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(ArtwallError::config(format!(
                "processor '{name}' is already registered"
            )));
        }
        self.entries.insert(name, f);
        Ok(())
    }

    pub fn get(&self, name: &str) -> ArtwallResult<&ProcessorFn> {
        self.entries
            .get(name)
            .ok_or_else(|| ArtwallError::config(format!("unknown processor '{name}'")))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

/// Resolved (post-substitution) arguments for one processor call. All values
/// are strings; the typed accessors produce argument errors naming the
/// offending argument on coercion failure.
#[derive(Clone, Debug, Default)]
pub struct ProcessorArgs {
    values: BTreeMap<String, String>,
}

impl ProcessorArgs {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_map(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            values: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn opt_u32(&self, name: &str) -> ArtwallResult<Option<u32>> {
        self.parse_opt(name, "a non-negative integer")
    }

    pub fn opt_i64(&self, name: &str) -> ArtwallResult<Option<i64>> {
        self.parse_opt(name, "an integer")
    }

    pub fn opt_f64(&self, name: &str) -> ArtwallResult<Option<f64>> {
        self.parse_opt(name, "a number")
    }

    pub fn require_u32(&self, name: &str) -> ArtwallResult<u32> {
        self.opt_u32(name)?.ok_or_else(|| missing(name))
    }

    pub fn require_str(&self, name: &str) -> ArtwallResult<&str> {
        self.get(name).ok_or_else(|| missing(name))
    }

    pub fn u32_or(&self, name: &str, default: u32) -> ArtwallResult<u32> {
        Ok(self.opt_u32(name)?.unwrap_or(default))
    }

    pub fn i64_or(&self, name: &str, default: i64) -> ArtwallResult<i64> {
        Ok(self.opt_i64(name)?.unwrap_or(default))
    }

    pub fn f64_or(&self, name: &str, default: f64) -> ArtwallResult<f64> {
        Ok(self.opt_f64(name)?.unwrap_or(default))
    }

    fn parse_opt<T: std::str::FromStr>(
        &self,
        name: &str,
        expected: &str,
    ) -> ArtwallResult<Option<T>> {
        match self.values.get(name) {
            None => Ok(None),
            Some(raw) => raw.trim().parse::<T>().map(Some).map_err(|_| {
                ArtwallError::argument(format!(
                    "argument '{name}' must be {expected}, got '{raw}'"
                ))
            }),
        }
    }
}

fn missing(name: &str) -> ArtwallError {
    ArtwallError::argument(format!("missing required argument '{name}'"))
}
