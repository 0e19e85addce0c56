use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    Fullscreen,
    Standalone,
    MinimalUi,
    Browser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Any,
    Natural,
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl ManifestIcon {
    fn png(src: &str, sizes: &str) -> Self {
        Self {
            src: src.to_string(),
            sizes: sizes.to_string(),
            mime_type: "image/png".to_string(),
            purpose: None,
        }
    }
}

/// The web app manifest, serialized with the field names browsers expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebManifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub theme_color: String,
    pub background_color: String,
    pub display: DisplayMode,
    pub scope: String,
    pub start_url: String,
    pub orientation: Orientation,
    #[serde(default)]
    pub icons: Vec<ManifestIcon>,
}

impl Default for WebManifest {
    fn default() -> Self {
        Self {
            name: "Resep Nusantara".to_string(),
            short_name: "Resep Nusantara".to_string(),
            description: "Aplikasi Resep Makanan dan Minuman Khas Indonesia".to_string(),
            theme_color: "#2563eb".to_string(),
            background_color: "#ffffff".to_string(),
            display: DisplayMode::Standalone,
            scope: "/".to_string(),
            start_url: "/".to_string(),
            orientation: Orientation::Portrait,
            // Generated from the logo by the asset generator's minimal preset
            icons: vec![
                ManifestIcon::png("pwa-64x64.png", "64x64"),
                ManifestIcon::png("pwa-192x192.png", "192x192"),
                ManifestIcon::png("pwa-512x512.png", "512x512"),
                ManifestIcon {
                    purpose: Some("maskable".to_string()),
                    ..ManifestIcon::png("maskable-icon-512x512.png", "512x512")
                },
            ],
        }
    }
}

/// `#rgb` or `#rrggbb`
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}
