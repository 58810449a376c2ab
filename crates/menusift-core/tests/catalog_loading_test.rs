//! Loading a scraped catalog export and querying it offline

use menusift_core::corpus::load_path;
use menusift_core::{
    run_query, AttributeSchema, Config, ConstraintSet, MenuSiftError, NumericOp, ResultMode,
};
use std::io::Write;
use tempfile::NamedTempFile;

const CATALOG: &str = "\
nombre_plato,ingredientes,alergenos,kcal,proteinas,precio,is_vegano,sin_gluten,cocina,url
Dal de lentejas,\"Lentejas rojas, leche de coco\",,420,18,\"5,90 €\",sí,true,india,https://example.test/dal
Pollo tikka masala,\"Pollo, yogur, especias\",Lácteos,560,38,\"6,50 €\",no,true,india,https://example.test/tikka
Lasaña de verduras,\"Pasta, calabacín, bechamel\",\"Gluten, Lácteos\",510,17,\"6,20 €\",no,false,italiana,https://example.test/lasagna
Crema de calabaza,\"Calabaza, cebolla\",,180,4,\"4,90 €\",1,1,,https://example.test/crema
Brownie,\"Chocolate, nueces\",Frutos secos,quizás,6,\"3,50 €\",no,no,postres,https://example.test/brownie
";

fn write_fixture(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(suffix).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn csv_export_loads_with_flagged_cells() {
    let file = write_fixture(".csv", CATALOG);
    let (corpus, report) = load_path(file.path(), &AttributeSchema::default_catalog()).unwrap();

    assert_eq!(corpus.len(), 5);
    let dal = corpus.get("1").unwrap();
    assert_eq!(dal.name, "Dal de lentejas");
    assert_eq!(dal.number("precio"), Some(5.9));
    assert_eq!(dal.boolean("is_vegano"), Some(true));
    assert_eq!(dal.categories("cocina"), Some(&["india".to_string()][..]));

    let tikka = corpus.get("2").unwrap();
    assert!(tikka.description.ends_with("Alérgenos: Lácteos"));

    // empty cell means absent, not flagged
    assert_eq!(corpus.get("4").unwrap().categories("cocina"), None);

    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].attribute, "kcal");
    assert_eq!(report.flagged[0].item_id.as_deref(), Some("5"));
    assert_eq!(corpus.get("5").unwrap().number("kcal"), None);
}

#[test]
fn loaded_catalog_answers_constrained_query() {
    let file = write_fixture(".csv", CATALOG);
    let config = Config::default();
    let (corpus, _) = load_path(file.path(), &config.attribute_schema().unwrap()).unwrap();

    let constraints = ConstraintSet::new()
        .with_boolean("sin_gluten", true)
        .with_categories("cocina", ["India"])
        .with_numeric("precio", NumericOp::Le, 6.0);

    let run = run_query(&corpus, &config, "algo indio sin gluten", &constraints, &[]).unwrap();
    assert_eq!(run.result.mode(), ResultMode::Exact);
    assert_eq!(run.result.ids(), vec!["1"]);
    assert!(run.fallback_triggered);

    let blocks = run.blocks(&config.attribute_schema().unwrap());
    assert!(blocks[0].contains("- Precio: 5.9 euros"));
    assert!(blocks[0].contains("- Sin gluten: sí"));
}

#[test]
fn json_catalog_loads_through_same_entry_point() {
    let file = write_fixture(
        ".json",
        r#"[
            {"id": 10, "name": "Poke de salmón", "attributes": {"kcal": 520, "is_keto": false}},
            {"id": "11", "name": "Ensalada keto", "attributes": {"kcal": "310", "is_keto": "true", "sabor": "umami"}}
        ]"#,
    );
    let (corpus, report) = load_path(file.path(), &AttributeSchema::default_catalog()).unwrap();

    assert_eq!(corpus.len(), 2);
    assert_eq!(corpus.get("10").unwrap().number("kcal"), Some(520.0));
    assert_eq!(corpus.get("11").unwrap().boolean("is_keto"), Some(true));
    assert_eq!(report.flagged.len(), 1);
    assert_eq!(report.flagged[0].attribute, "sabor");
}

#[test]
fn empty_catalog_is_fatal() {
    let file = write_fixture(".json", "[]");
    let err = load_path(file.path(), &AttributeSchema::default_catalog()).unwrap_err();
    assert!(matches!(err, MenuSiftError::EmptyCorpus));
    assert!(err.is_startup_fatal());
}
