use rust_decimal::Decimal;

use crate::models::{CatalogItem, Unit};

// (id, code, chapter, name, unit, materials, labor)
const ENTRIES: &[(&str, i64, &str, &str, Unit, i64, i64)] = &[
    ("1200-contrapisos", 1200, "Contrapisos", "Contrapisos", Unit::Each, 0, 0),
    (
        "12-contrapiso-10",
        1201,
        "Contrapisos",
        "Contrapiso 10 cm (cascotes)",
        Unit::SquareMeter,
        20000,
        28000,
    ),
    ("1600-carpetas", 1600, "Carpetas", "Carpetas", Unit::Each, 0, 0),
    (
        "16-carpeta-hidro",
        1601,
        "Carpetas",
        "Carpeta hidrófuga (alisado)",
        Unit::SquareMeter,
        15000,
        22000,
    ),
    ("1900-revestimientos", 1900, "Revestimientos", "Revestimientos", Unit::Each, 0, 0),
    (
        "19-ceramico-40",
        1901,
        "Revestimientos",
        "Colocación cerámico 40x40",
        Unit::SquareMeter,
        8000,
        26000,
    ),
    ("2200-zocalos", 2200, "Zócalos", "Zócalos", Unit::Each, 0, 0),
    (
        "22-zocalo-madera",
        2201,
        "Zócalos",
        "Zócalo de madera",
        Unit::LinearMeter,
        4000,
        7200,
    ),
];

/// Built-in catalog used when no feed is configured or the feed fails.
pub fn fallback_items() -> Vec<CatalogItem> {
    ENTRIES
        .iter()
        .map(|&(id, code, chapter, name, unit, mat, labor)| {
            CatalogItem::new(
                id,
                code,
                chapter,
                name,
                unit,
                Decimal::from(mat),
                Decimal::from(labor),
            )
        })
        .collect()
}
