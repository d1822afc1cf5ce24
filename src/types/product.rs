//! Catalog records the batch runner works through.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A product as exported from the shop catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    /// Current full description (may be empty).
    #[serde(default)]
    pub description: String,
    /// Current short description / excerpt (may be empty).
    #[serde(default)]
    pub short_description: String,
    /// Free-form attributes, e.g. `("Material", "Oak")`.
    #[serde(default)]
    pub attributes: Vec<(String, String)>,
}

impl Product {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn short_description(mut self, short: impl Into<String>) -> Self {
        self.short_description = short.into();
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }
}

/// Which description of a product is being generated or saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionField {
    #[serde(rename = "full_description")]
    Full,
    #[serde(rename = "short_description")]
    Short,
}

impl DescriptionField {
    pub fn as_str(&self) -> &'static str {
        match self {
            DescriptionField::Full => "full_description",
            DescriptionField::Short => "short_description",
        }
    }

    /// Response length bound used when generating this field.
    pub fn max_tokens(&self) -> u32 {
        match self {
            DescriptionField::Full => 500,
            DescriptionField::Short => 200,
        }
    }
}

impl fmt::Display for DescriptionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
