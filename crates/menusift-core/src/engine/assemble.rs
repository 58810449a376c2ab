//! Response assembly
//!
//! Renders selected items as text blocks for answer generation. Every schema
//! attribute appears in every block, in schema order, so that whatever the
//! filter and scorer looked at is also visible to the generator.

use super::select::ResultSet;
use crate::corpus::{AttributeValue, Item};
use crate::schema::AttributeSchema;
use std::fmt::Write;

/// Placeholder for attributes an item does not carry
pub const MISSING_VALUE: &str = "desconocido";

/// Render one item as a structured text block
pub fn render_item(item: &Item, schema: &AttributeSchema) -> String {
    let mut block = String::new();
    let _ = writeln!(block, "{} (id {})", item.name, item.id);

    let description = item.description.trim();
    if !description.is_empty() {
        block.push_str(description);
        block.push('\n');
    }
    block.push('\n');

    for spec in schema.iter() {
        let value = match item.get(&spec.name) {
            Some(AttributeValue::Boolean(true)) => "sí".to_string(),
            Some(AttributeValue::Boolean(false)) => "no".to_string(),
            Some(value) => match &spec.unit {
                Some(unit) => format!("{} {}", value, unit),
                None => value.to_string(),
            },
            None => MISSING_VALUE.to_string(),
        };
        let _ = writeln!(block, "- {}: {}", spec.display_label(), value);
    }

    block.truncate(block.trim_end().len());
    block
}

/// One block per selected item, in result order
pub fn assemble(result: &ResultSet<'_>, schema: &AttributeSchema) -> Vec<String> {
    let blocks: Vec<String> = result
        .items()
        .map(|item| render_item(item, schema))
        .collect();
    tracing::debug!("Assembled {} context blocks", blocks.len());
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::select::{Caps, Selector};
    use crate::schema::AttributeSpec;

    fn schema() -> AttributeSchema {
        AttributeSchema::new(vec![
            AttributeSpec::number("kcal").with_label("Kcal"),
            AttributeSpec::number("precio")
                .with_label("Precio")
                .with_unit("euros"),
            AttributeSpec::category("cocina").with_label("Cocina"),
            AttributeSpec::boolean("is_vegano").with_label("Vegano"),
        ])
        .unwrap()
    }

    #[test]
    fn test_render_every_attribute_in_order() {
        let item = Item::new("7", "Dal de lentejas")
            .with_description("Lentejas rojas, leche de coco")
            .with_number("kcal", 420.0)
            .with_number("precio", 5.5)
            .with_categories("cocina", ["India"])
            .with_bool("is_vegano", true);

        let block = render_item(&item, &schema());
        assert_eq!(
            block,
            "Dal de lentejas (id 7)\nLentejas rojas, leche de coco\n\n\
             - Kcal: 420\n- Precio: 5.5 euros\n- Cocina: india\n- Vegano: sí"
        );
    }

    #[test]
    fn test_missing_attributes_are_visible() {
        let item = Item::new("1", "Ensalada").with_bool("is_vegano", false);
        let block = render_item(&item, &schema());
        assert!(block.contains(&format!("- Kcal: {}", MISSING_VALUE)));
        assert!(block.contains(&format!("- Cocina: {}", MISSING_VALUE)));
        assert!(block.contains("- Vegano: no"));
        assert!(!block.contains("\n\n\n"));
    }

    #[test]
    fn test_assemble_follows_result_order() {
        let items = vec![Item::new("1", "A"), Item::new("2", "B")];
        let exact: Vec<&Item> = vec![&items[1], &items[0]];
        let set = Selector::new(Caps::new(5, 2).unwrap())
            .select(&exact, &[], &[], false)
            .unwrap();

        let blocks = assemble(&set, &schema());
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].starts_with("B (id 2)"));
        assert!(blocks[1].starts_with("A (id 1)"));
    }
}
