mod common;

use common::*;
use std::collections::HashSet;
use std::sync::Arc;
use strata::memory::MemoryDatabase;
use strata::{Dao, Descriptor, DescriptorBuilder, Operator, SqlFunction, Where};

fn names(ingredients: &[Ingredient]) -> HashSet<String> {
    ingredients
        .iter()
        .filter_map(|i| i.name.clone())
        .collect()
}

#[test]
fn children_are_saved_and_loaded_with_their_parent() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let mut chili = recipe(
        "Chili",
        vec![
            ingredient("beans", 2),
            ingredient("beef", 1),
            ingredient("chiles", 5),
        ],
    );
    let id = dao.insert(&mut conn, &mut chili).unwrap();

    let loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    assert_eq!(
        names(&loaded.ingredients),
        HashSet::from(["beans".to_owned(), "beef".to_owned(), "chiles".to_owned()])
    );
    for ingredient in &loaded.ingredients {
        assert!(ingredient.id.is_some());
        assert_eq!(ingredient.recipe_id, Some(id));
    }
}

#[test]
fn orphaned_children_are_deleted_on_update() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());
    let ingredients = Dao::new(&ingredient_descriptor());

    let mut soup = recipe("Soup", vec![ingredient("water", 1), ingredient("bones", 2)]);
    let id = dao.insert(&mut conn, &mut soup).unwrap();

    let mut loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    loaded.ingredients.retain(|i| i.name.as_deref() != Some("water"));
    loaded.ingredients.push(ingredient("salt", 1));
    dao.update(&mut conn, &mut loaded).unwrap();

    let reloaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    assert_eq!(
        names(&reloaded.ingredients),
        HashSet::from(["bones".to_owned(), "salt".to_owned()])
    );

    let rows = ingredients
        .run_long_function(
            &mut conn,
            SqlFunction::Count,
            "id",
            &Where::new("recipe_id", Operator::Equal, id),
        )
        .unwrap();
    assert_eq!(rows, Some(2));
}

#[test]
fn unchanged_children_keep_their_identity() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let mut bread = recipe("Bread", vec![ingredient("flour", 3), ingredient("water", 1)]);
    let id = dao.insert(&mut conn, &mut bread).unwrap();

    let mut loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    let ids_before: HashSet<Option<i64>> = loaded.ingredients.iter().map(|i| i.id).collect();
    dao.update(&mut conn, &mut loaded).unwrap();

    let reloaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    let ids_after: HashSet<Option<i64>> = reloaded.ingredients.iter().map(|i| i.id).collect();
    assert_eq!(ids_before, ids_after);
    assert_eq!(reloaded.ingredients.len(), 2);
    for ingredient in &reloaded.ingredients {
        assert_eq!(ingredient.recipe_id, Some(id));
    }
}

#[test]
fn grandchildren_cascade_through_both_levels() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let mut stock = ingredient("stock", 1);
    stock.substitutions.push(Substitution {
        id: None,
        ingredient_id: None,
        name: Some("bouillon".to_owned()),
    });
    let mut risotto = recipe("Risotto", vec![stock]);
    let id = dao.insert(&mut conn, &mut risotto).unwrap();

    let loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    let stock = &loaded.ingredients[0];
    assert_eq!(stock.substitutions.len(), 1);
    assert_eq!(stock.substitutions[0].name.as_deref(), Some("bouillon"));
    assert_eq!(stock.substitutions[0].ingredient_id, stock.id);
}

#[test]
fn orphan_deletion_reaches_grandchildren() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());
    let substitutions = Dao::new(&substitution_descriptor());

    let mut saffron = ingredient("saffron", 1);
    saffron.substitutions.push(Substitution {
        id: None,
        ingredient_id: None,
        name: Some("turmeric".to_owned()),
    });
    let mut paella = recipe("Paella", vec![saffron, ingredient("rice", 2)]);
    let id = dao.insert(&mut conn, &mut paella).unwrap();

    let mut loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    loaded
        .ingredients
        .retain(|i| i.name.as_deref() != Some("saffron"));
    dao.update(&mut conn, &mut loaded).unwrap();

    let remaining = substitutions.select_all(&mut conn).unwrap();
    assert!(remaining.is_empty());
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Imprint {
    id: Option<i64>,
    publisher_id: Option<i64>,
    name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Publisher {
    id: Option<i64>,
    name: Option<String>,
    imprints: Vec<Imprint>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Book {
    id: Option<i64>,
    title: Option<String>,
    publisher: Option<Publisher>,
}

fn imprint_descriptor() -> Arc<Descriptor<Imprint>> {
    DescriptorBuilder::new("imprint", Imprint::default)
        .with_primary_key("id", "imprint_seq", |i| i.id, |i, v| i.id = Some(v))
        .with_parent_column(
            "publisher_id",
            |i| i.publisher_id,
            |i, v| i.publisher_id = Some(v),
        )
        .with_string_column("name", |i| i.name.clone(), |i, v| i.name = v)
        .build()
        .unwrap()
}

fn publisher_descriptor() -> Arc<Descriptor<Publisher>> {
    DescriptorBuilder::new("publisher", Publisher::default)
        .with_primary_key("id", "publisher_seq", |p| p.id, |p, v| p.id = Some(v))
        .with_string_column("name", |p| p.name.clone(), |p, v| p.name = v)
        .with_children(&imprint_descriptor(), |p: &mut Publisher| &mut p.imprints)
        .build()
        .unwrap()
}

fn book_descriptor() -> Arc<Descriptor<Book>> {
    DescriptorBuilder::new("book", Book::default)
        .with_primary_key("id", "book_seq", |b| b.id, |b, v| b.id = Some(v))
        .with_string_column("title", |b| b.title.clone(), |b, v| b.title = v)
        .with_join_column(
            "publisher_id",
            &publisher_descriptor(),
            |b: &Book| b.publisher.as_ref(),
            |b, p| b.publisher = Some(p),
        )
        .build()
        .unwrap()
}

#[test]
fn joined_entities_bring_their_own_children() {
    init_logging();
    let db = MemoryDatabase::new();
    db.define_table("publisher", &["id", "name"]);
    db.define_table("imprint", &["id", "publisher_id", "name"]);
    db.define_table("book", &["id", "title", "publisher_id"]);
    db.define_sequence("publisher_seq");
    db.define_sequence("imprint_seq");
    db.define_sequence("book_seq");
    let mut conn = db.connect();

    let publishers = Dao::new(&publisher_descriptor());
    let books = Dao::new(&book_descriptor());

    let mut house = Publisher {
        name: Some("Torchlight".to_owned()),
        imprints: vec![
            Imprint {
                name: Some("Ember".to_owned()),
                ..Imprint::default()
            },
            Imprint {
                name: Some("Lantern".to_owned()),
                ..Imprint::default()
            },
        ],
        ..Publisher::default()
    };
    publishers.insert(&mut conn, &mut house).unwrap();

    let mut book = Book {
        title: Some("Night Work".to_owned()),
        publisher: Some(house),
        ..Book::default()
    };
    let id = books.insert(&mut conn, &mut book).unwrap();

    let loaded = books.select_one(&mut conn, id).unwrap().unwrap();
    let publisher = loaded.publisher.unwrap();
    assert_eq!(publisher.name.as_deref(), Some("Torchlight"));
    let imprints: HashSet<String> = publisher
        .imprints
        .iter()
        .filter_map(|i| i.name.clone())
        .collect();
    assert_eq!(
        imprints,
        HashSet::from(["Ember".to_owned(), "Lantern".to_owned()])
    );
    for imprint in &publisher.imprints {
        assert!(imprint.id.is_some());
        assert_eq!(imprint.publisher_id, publisher.id);
    }
}

#[test]
fn delete_removes_the_whole_graph() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());
    let ingredients = Dao::new(&ingredient_descriptor());
    let substitutions = Dao::new(&substitution_descriptor());

    let mut basil = ingredient("basil", 1);
    basil.substitutions.push(Substitution {
        id: None,
        ingredient_id: None,
        name: Some("oregano".to_owned()),
    });
    let mut pesto = recipe("Pesto", vec![basil]);
    let id = dao.insert(&mut conn, &mut pesto).unwrap();

    let loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    dao.delete(&mut conn, &loaded).unwrap();

    assert!(dao.select_one(&mut conn, id).unwrap().is_none());
    assert!(ingredients.select_all(&mut conn).unwrap().is_empty());
    assert!(substitutions.select_all(&mut conn).unwrap().is_empty());
}
