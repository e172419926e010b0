//! Fixture content, terms and filter configurations.

#![allow(dead_code)]

use facet_index::terms::{StaticTermStore, Term};
use facet_index::types::{FieldValue, GeoPoint, Location, StaticItem};

/// Filter configuration of the `place` content type.
pub fn place_filters() -> &'static str {
    r#"[
        {"type": "keywords", "key": "q", "sources": ["title", "cuisine", "menu.name"]},
        {"type": "location", "key": "near", "source": "address"},
        {"type": "range", "key": "price", "source": "pricing"},
        {"type": "terms", "key": "cuisine", "taxonomy": "cuisine"},
        {"type": "switcher", "key": "open", "source": {"field": "open_now"}},
        {"type": "stepper", "key": "rating", "source": {"field": "rating"}, "step": 0.5},
        {"type": "following", "key": "following",
         "conditions": [[{"filter": "open", "operator": "!=empty"}]]}
    ]"#
}

/// Cuisine taxonomy: food > italian > pizza, food > thai.
pub fn term_store() -> StaticTermStore {
    let store = StaticTermStore::new();
    store.set_terms(
        "cuisine",
        vec![
            Term::new(1, "food", "Food"),
            Term::new(2, "italian", "Italian").with_parent(1),
            Term::new(3, "pizza", "Pizza").with_parent(2),
            Term::new(4, "thai", "Thai").with_parent(1),
        ],
    );
    store
}

/// A pizzeria in Paris.
pub fn pizzeria() -> StaticItem {
    let mut menu = std::collections::BTreeMap::new();
    menu.insert("name".to_string(), FieldValue::Text("Quattro Formaggi".to_string()));

    StaticItem::new(101)
        .with_author(7)
        .with_priority(3)
        .with_field("title", FieldValue::Text("<b>Luigi's</b> Pizzeria".to_string()))
        .with_field(
            "cuisine",
            FieldValue::Terms {
                taxonomy: "cuisine".to_string(),
                ids: vec![3],
            },
        )
        .with_field("menu", FieldValue::Rows(vec![menu]))
        .with_field(
            "address",
            FieldValue::Location(Location {
                address: "Rue de Rivoli, Paris".to_string(),
                point: Some(GeoPoint::new(48.8566, 2.3522)),
            }),
        )
        .with_field("open_now", FieldValue::Bool(true))
        .with_field("rating", FieldValue::Number(4.5))
}
