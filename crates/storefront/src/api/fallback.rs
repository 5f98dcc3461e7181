//! Built-in category list used when the remote host cannot be reached.

use aether_core::CategoryId;

use super::types::Category;

const FALLBACK: [(i64, &str, &str, i64); 4] = [
    (
        14,
        "Aether Tools",
        "Field tools for surveying, salvaging and repairing Aether tech.",
        4,
    ),
    (
        15,
        "Aetherium",
        "Raw Aetherium crystals that raise your current weapons to Tier I, II or III.",
        2,
    ),
    (
        17,
        "Ammo Mods",
        "Simple ammunition upgrades. Only one Ammo Mod can be fitted to a weapon at a time.",
        5,
    ),
    (
        19,
        "Classified Schematics",
        "High-tier acquisition schematics. Hard to come by, but worth the hunt.",
        8,
    ),
];

/// Categories shown when the live list is unavailable.
#[must_use]
pub fn categories() -> Vec<Category> {
    FALLBACK
        .iter()
        .map(|&(id, name, description, total_products)| Category {
            id: CategoryId::new(id),
            name: name.to_string(),
            description: description.to_string(),
            total_products,
        })
        .collect()
}
