use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::typescript;

/// Source language of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Plain JavaScript, executed as-is.
    #[default]
    JavaScript,
    /// TypeScript, erased to JavaScript before execution.
    TypeScript,
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::JavaScript => write!(f, "JavaScript"),
            Language::TypeScript => write!(f, "TypeScript"),
        }
    }
}

/// A unit of source text tagged with its language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceUnit {
    /// The raw source text.
    text:     String,
    /// Language the text is written in.
    language: Language,
}

impl SourceUnit {
    /// Creates a unit with an explicit language tag.
    pub fn new(text: impl Into<String>, language: Language) -> Self {
        Self {
            text: text.into(),
            language,
        }
    }

    /// Creates a unit, tagging it TypeScript when it carries any type syntax.
    pub fn detect(text: impl Into<String>) -> Self {
        let text = text.into();
        let language = if typescript::looks_typed(&text) {
            Language::TypeScript
        } else {
            Language::JavaScript
        };
        Self { text, language }
    }

    /// Returns the raw source text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the language tag.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Returns the executable JavaScript for this unit, erasing types when it
    /// is tagged TypeScript.
    pub fn to_javascript(&self) -> String {
        match self.language {
            Language::JavaScript => self.text.clone(),
            Language::TypeScript => typescript::erase(&self.text),
        }
    }
}
