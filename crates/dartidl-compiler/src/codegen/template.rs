//! Output templates.
//!
//! Templates are plain text with `$NAME` or `$(NAME)` placeholders, where
//! `NAME` is upper case. `$$` produces a literal dollar sign, and a `$` not
//! followed by an upper case letter, `_` or `(` is copied as is, so Dart
//! string interpolation in templates needs no escaping.
//!
//! The built-in templates are embedded at compile time. Configured template
//! directories are searched first, which is also how per-interface
//! overrides (`<system>_<Interface>.template`) are supplied.

use std::path::PathBuf;

use crate::diagnostic::GeneratorError;

/// Dart class skeleton of the interface system.
pub const INTERFACE: &str = include_str!("../../templates/interface.template");
/// Dart typedef for callback interfaces.
pub const CALLBACK: &str = include_str!("../../templates/callback.template");
/// Per-system library manifest.
pub const LIBRARY: &str = include_str!("../../templates/library.template");
pub const WRAPPING: &str = include_str!("../../templates/wrapping.template");
pub const NATIVE: &str = include_str!("../../templates/native.template");
pub const JS: &str = include_str!("../../templates/js.template");
/// Native glue header.
pub const CPP_HEADER: &str = include_str!("../../templates/cpp_header.template");
/// Native glue implementation with the per-interface resolver.
pub const CPP_IMPL: &str = include_str!("../../templates/cpp_impl.template");
/// Umbrella source including every generated implementation.
pub const CPP_DERIVED_SOURCES: &str = include_str!("../../templates/cpp_derived_sources.template");
/// Process-wide resolver chaining the per-interface resolvers.
pub const CPP_RESOLVER: &str = include_str!("../../templates/cpp_resolver.template");

/// Returns all built-in templates as (name, content) pairs.
pub fn builtin_templates() -> Vec<(&'static str, &'static str)> {
    vec![
        ("interface.template", INTERFACE),
        ("callback.template", CALLBACK),
        ("library.template", LIBRARY),
        ("wrapping.template", WRAPPING),
        ("native.template", NATIVE),
        ("js.template", JS),
        ("cpp_header.template", CPP_HEADER),
        ("cpp_impl.template", CPP_IMPL),
        ("cpp_derived_sources.template", CPP_DERIVED_SOURCES),
        ("cpp_resolver.template", CPP_RESOLVER),
    ]
}

/// Looks templates up by file name.
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    dirs: Vec<PathBuf>,
}

impl TemplateLoader {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    /// Finds `name` in the search directories, then among the built-ins.
    pub fn try_load(&self, name: &str) -> Result<Option<String>, GeneratorError> {
        for dir in &self.dirs {
            let path = dir.join(name);
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::debug!(template = %name, path = %path.display(), "using template override");
                    return Ok(Some(text));
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(GeneratorError::io(path, e.to_string())),
            }
        }
        Ok(builtin_templates()
            .into_iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| text.to_string()))
    }

    pub fn load(&self, name: &str) -> Result<String, GeneratorError> {
        self.try_load(name)?.ok_or_else(|| GeneratorError::MissingTemplate {
            name: name.to_string(),
            searched: self.dirs.clone(),
        })
    }

    /// Loads and substitutes `name`.
    pub fn render(&self, name: &str, vars: &[(&str, &str)]) -> Result<String, GeneratorError> {
        let text = self.load(name)?;
        substitute(name, &text, vars)
    }

    /// Renders the per-interface override `<system>_<id>.template` when one
    /// exists, `fallback` otherwise.
    pub fn render_for(
        &self,
        system: &str,
        id: &str,
        fallback: &str,
        vars: &[(&str, &str)],
    ) -> Result<String, GeneratorError> {
        let name = format!("{}_{}.template", system, id);
        match self.try_load(&name)? {
            Some(text) => substitute(&name, &text, vars),
            None => self.render(fallback, vars),
        }
    }
}

/// Replaces every placeholder in `text`. `template` only names the source in
/// errors.
pub fn substitute(template: &str, text: &str, vars: &[(&str, &str)]) -> Result<String, GeneratorError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        let (name, tail) = if let Some(inner) = after.strip_prefix('(') {
            match inner.find(')') {
                Some(close) if is_variable_name(&inner[..close]) => (&inner[..close], &inner[close + 1..]),
                _ => {
                    out.push('$');
                    rest = after;
                    continue;
                }
            }
        } else {
            let len = after
                .char_indices()
                .find(|&(i, c)| !is_variable_char(c, i == 0))
                .map(|(i, _)| i)
                .unwrap_or(after.len());
            if len == 0 {
                out.push('$');
                rest = after;
                continue;
            }
            (&after[..len], &after[len..])
        };

        let value = vars
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .ok_or_else(|| GeneratorError::TemplateVariable {
                template: template.to_string(),
                variable: name.to_string(),
            })?;
        out.push_str(value);
        rest = tail;
    }

    out.push_str(rest);
    Ok(out)
}

fn is_variable_char(c: char, first: bool) -> bool {
    c.is_ascii_uppercase() || c == '_' || (!first && c.is_ascii_digit())
}

fn is_variable_name(name: &str) -> bool {
    !name.is_empty() && name.chars().enumerate().all(|(i, c)| is_variable_char(c, i == 0))
}
