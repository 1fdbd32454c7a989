use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Codes that are multiples of this value are chapters; anything else is a line item.
pub const CHAPTER_STEP: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Unit {
    #[serde(rename = "m2")]
    SquareMeter,
    #[serde(rename = "m3")]
    CubicMeter,
    #[serde(rename = "ml")]
    LinearMeter,
    #[default]
    #[serde(rename = "u")]
    Each,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SquareMeter => "m2",
            Self::CubicMeter => "m3",
            Self::LinearMeter => "ml",
            Self::Each => "u",
        }
    }

    /// Symbol used on screen and in exports.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::SquareMeter => "m²",
            Self::CubicMeter => "m³",
            Self::LinearMeter => "ml",
            Self::Each => "u",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m2" | "m²" => Self::SquareMeter,
            "m3" | "m³" => Self::CubicMeter,
            "ml" => Self::LinearMeter,
            _ => Self::Each,
        }
    }

    pub fn all() -> &'static [Unit] {
        &[
            Self::SquareMeter,
            Self::CubicMeter,
            Self::LinearMeter,
            Self::Each,
        ]
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub code: i64,
    /// Chapter label, e.g. "Contrapisos".
    pub chapter: String,
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    /// Resolved parent chapter label. Filled in by grouping; empty for raw feed rows.
    #[serde(default)]
    pub parent_name: String,
    pub unit_price_materials: Decimal,
    pub unit_price_labor: Decimal,
}

impl CatalogItem {
    pub fn new(
        id: impl Into<String>,
        code: i64,
        chapter: impl Into<String>,
        name: impl Into<String>,
        unit: Unit,
        unit_price_materials: Decimal,
        unit_price_labor: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            code,
            chapter: chapter.into(),
            name: name.into(),
            unit,
            parent_name: String::new(),
            unit_price_materials,
            unit_price_labor,
        }
    }

    pub fn is_chapter(&self) -> bool {
        self.code.rem_euclid(CHAPTER_STEP) == 0
    }

    /// Code of the chapter this entry belongs to (its own code for chapters).
    pub fn chapter_code(&self) -> i64 {
        self.code.div_euclid(CHAPTER_STEP) * CHAPTER_STEP
    }

    /// Sort items ascending by code, in place.
    pub fn sort_by_code(items: &mut [CatalogItem]) {
        items.sort_by_key(|i| i.code);
    }
}

impl std::fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.name)
    }
}
