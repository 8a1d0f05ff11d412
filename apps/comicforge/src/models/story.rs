use serde::{Deserialize, Serialize};

/// Themes offered by the authoring UI. Free text outside this set is accepted.
pub const SUGGESTED_THEMES: &[&str] = &["Adventure", "Sci-Fi", "Fantasy", "Slice of Life"];

/// Drawing styles offered by the authoring UI. Free text outside this set is accepted.
pub const SUGGESTED_STYLES: &[&str] = &["Manga", "Western", "Cartoon", "Minimalist"];

/// Story-level metadata, rebuilt from the current form state for every generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryContext {
    pub header: String,
    pub theme: String,
    #[serde(default)]
    pub background: String,
    pub style: String,
    #[serde(default)]
    pub plot: Option<String>,
}

impl StoryContext {
    /// The plot, if it carries any non-whitespace text.
    pub fn plot_text(&self) -> Option<&str> {
        present(&self.plot)
    }
}

/// A user-edited character description. Duplicate names are allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Character {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: Option<String>,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub skin_tone: Option<String>,
    #[serde(default)]
    pub traits: Option<String>,
}

impl Character {
    #[cfg(test)]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Optional attributes in prompt order, each paired with its label.
    /// Blank values are skipped.
    pub fn populated_attributes(&self) -> Vec<(&'static str, &str)> {
        [
            ("Age", &self.age),
            ("Height", &self.height),
            ("Skin Tone", &self.skin_tone),
            ("Key traits", &self.traits),
        ]
        .into_iter()
        .filter_map(|(label, value)| present(value).map(|v| (label, v)))
        .collect()
    }
}

/// The instruction for the panel currently being generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub description: String,
}

/// Presence test shared by every optional field: set AND non-blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
