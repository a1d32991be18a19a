use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;

/// Verification email, HTML version
pub const VERIFY_HTML: &str = "verify.html";
/// Verification email, text version
pub const VERIFY_TEXT: &str = "verify.txt";
/// Confirmation email, HTML version
pub const VERIFIED_HTML: &str = "verified.html";
/// Confirmation email, text version
pub const VERIFIED_TEXT: &str = "verified.txt";

const TEMPLATE_NAMES: [&str; 4] = [VERIFY_HTML, VERIFY_TEXT, VERIFIED_HTML, VERIFIED_TEXT];

/// Template rendering error type
#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("There is no template named `{0}`")]
    UnknownTemplate(String),
}

/// Email templates with `{{placeholder}}` substitution
#[derive(Clone, Debug)]
pub struct Templates {
    sources: HashMap<String, String>,
}

impl Default for Templates {
    /// Templates embedded at build time from `./templates`
    fn default() -> Self {
        let sources = [
            (VERIFY_HTML, include_str!("../templates/verify.html")),
            (VERIFY_TEXT, include_str!("../templates/verify.txt")),
            (VERIFIED_HTML, include_str!("../templates/verified.html")),
            (VERIFIED_TEXT, include_str!("../templates/verified.txt")),
        ]
        .into_iter()
        .map(|(name, source)| (name.to_owned(), source.to_owned()))
        .collect();

        Self { sources }
    }
}

impl Templates {
    /// Load every template from `dir`, which must contain all of them
    pub fn from_dir(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut sources = HashMap::new();
        for name in TEMPLATE_NAMES {
            let path = dir.join(name);
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            sources.insert(name.to_owned(), source);
        }

        Ok(Self { sources })
    }

    /// Render template `name`, replacing each `{{key}}` with its value
    pub fn render(
        &self,
        name: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<String, TemplateError> {
        let source = self
            .sources
            .get(name)
            .ok_or_else(|| TemplateError::UnknownTemplate(name.to_owned()))?;

        Ok(substitutions
            .iter()
            .fold(source.clone(), |rendered, (key, value)| {
                rendered.replace(&format!("{{{{{key}}}}}"), value)
            }))
    }
}
