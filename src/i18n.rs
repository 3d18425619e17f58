//! Message translation backed by the ERP's Translation records.

use std::collections::HashMap;

pub const DEFAULT_LANGUAGE: &str = "en";

#[derive(Clone, Debug, Default)]
pub struct Translator {
    language: String,
    catalog: HashMap<String, String>,
}

impl Translator {
    pub fn new(language: impl Into<String>, catalog: HashMap<String, String>) -> Self {
        Self { language: language.into(), catalog }
    }

    pub fn language(&self) -> &str { &self.language }

    /// Translated text, or the source text when the catalog has no entry.
    pub fn t(&self, msgid: &str) -> String {
        self.catalog.get(msgid).cloned().unwrap_or_else(|| msgid.to_string())
    }

    /// Translates `msgid` and substitutes `{0}`.
    pub fn format(&self, msgid: &str, arg: impl std::fmt::Display) -> String {
        self.t(msgid).replace("{0}", &arg.to_string())
    }
}
