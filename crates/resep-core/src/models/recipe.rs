use serde::{Deserialize, Serialize};

/// A recipe summary, as listed in a user's favorites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Recipe {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Recipe {
    pub fn category_display(&self) -> &str {
        self.category.as_deref().unwrap_or("Uncategorized")
    }
}
