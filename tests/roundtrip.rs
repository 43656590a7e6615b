mod common;

use common::*;
use strata::{Connection, Dao, Error, Operator, SqlFunction, Where};

#[test]
fn data_columns_round_trip() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let mut beer_can = recipe("Beer Can Chicken", Vec::new());
    let id = dao.insert(&mut conn, &mut beer_can).unwrap();
    assert_eq!(beer_can.id, Some(id));

    let loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    assert_eq!(loaded.name.as_deref(), Some("Beer Can Chicken"));
    assert_eq!(loaded.id, Some(id));
    assert!(loaded.author.is_none());
    assert!(loaded.ingredients.is_empty());
}

#[test]
fn update_rewrites_the_row_in_place() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let mut dish = recipe("Toast", Vec::new());
    let id = dao.insert(&mut conn, &mut dish).unwrap();

    dish.name = Some("French Toast".to_owned());
    dao.update(&mut conn, &mut dish).unwrap();

    let loaded = dao.select_one(&mut conn, id).unwrap().unwrap();
    assert_eq!(loaded.name.as_deref(), Some("French Toast"));
    assert_eq!(loaded.id, Some(id));
    assert_eq!(dao.select_all(&mut conn).unwrap().len(), 1);
}

#[test]
fn joined_references_are_read_back() {
    let db = database();
    let mut conn = db.connect();
    let authors = Dao::new(&author_descriptor());
    let recipes = Dao::new(&recipe_descriptor());

    let mut julia = Author {
        id: None,
        name: Some("Julia".to_owned()),
    };
    authors.insert(&mut conn, &mut julia).unwrap();

    let mut coq = recipe("Coq au Vin", Vec::new());
    coq.author = Some(julia.clone());
    let id = recipes.insert(&mut conn, &mut coq).unwrap();

    let loaded = recipes.select_one(&mut conn, id).unwrap().unwrap();
    assert_eq!(loaded.author, Some(julia));
}

#[test]
fn keyless_entities_append_and_select_only() {
    let db = database();
    let mut conn = db.connect();
    let logs = Dao::new(&log_descriptor());

    logs.append(
        &mut conn,
        &LogEntry {
            message: Some("started".to_owned()),
            severity: Some(0),
        },
    )
    .unwrap();
    logs.append(
        &mut conn,
        &LogEntry {
            message: Some("broke".to_owned()),
            severity: Some(2),
        },
    )
    .unwrap();

    assert_eq!(logs.select_all(&mut conn).unwrap().len(), 2);
    let severe = logs
        .select_where(&mut conn, &Where::new("severity", Operator::GreaterEqual, 1i64))
        .unwrap();
    assert_eq!(severe.len(), 1);
    assert_eq!(severe[0].message.as_deref(), Some("broke"));

    let mut entry = LogEntry::default();
    assert!(matches!(
        logs.insert(&mut conn, &mut entry),
        Err(Error::Configuration(..))
    ));

    let recipes = Dao::new(&recipe_descriptor());
    let mut dish = recipe("Stew", Vec::new());
    dish.id = Some(1);
    assert!(matches!(
        recipes.append(&mut conn, &dish),
        Err(Error::Configuration(..))
    ));
}

#[test]
fn singletons_reject_multiple_matches() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    dao.insert(&mut conn, &mut recipe("Chili", Vec::new())).unwrap();
    dao.insert(&mut conn, &mut recipe("Chili", Vec::new())).unwrap();

    let template = recipe("Chili", Vec::new());
    let result = dao.select_one_by_columns(&mut conn, &template, &["name"]);
    assert!(matches!(result, Err(Error::Configuration(..))));
}

#[test]
fn aggregates_over_nothing_have_no_answer() {
    let db = database();
    let mut conn = db.connect();
    let dao = Dao::new(&recipe_descriptor());

    let count = dao
        .run_long_function(&mut conn, SqlFunction::Count, "id", &Where::empty())
        .unwrap();
    assert_eq!(count, None);

    dao.insert(&mut conn, &mut recipe("Pho", Vec::new())).unwrap();
    let count = dao
        .run_long_function(&mut conn, SqlFunction::Count, "id", &Where::empty())
        .unwrap();
    assert_eq!(count, Some(1));

    let ingredients = Dao::new(&ingredient_descriptor());
    let total = ingredients
        .run_long_function(
            &mut conn,
            SqlFunction::Sum,
            "amount",
            &Where::new("recipe_id", Operator::Equal, 999i64),
        )
        .unwrap();
    assert_eq!(total, None);
}

#[test]
fn not_null_columns_fail_before_the_statement_runs() {
    let db = database();
    let mut conn = db.connect();
    let ingredients = Dao::new(&ingredient_descriptor());

    let mut nameless = ingredient("x", 1);
    nameless.name = None;
    nameless.recipe_id = Some(1);
    match ingredients.insert(&mut conn, &mut nameless) {
        Err(Error::NullBinding { column }) => assert_eq!(column, "name"),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn transactions_commit_or_roll_back_whole_graphs() {
    let db = database();
    let dao = Dao::new(&recipe_descriptor());

    let mut conn = db.connect();
    let mut good = recipe("Salad", vec![ingredient("lettuce", 1)]);
    dao.atomic_insert(&mut conn, &mut good).unwrap();
    assert!(!conn.is_closed());

    let mut bad = recipe("Mystery", vec![ingredient("lettuce", 1)]);
    bad.ingredients[0].name = None;
    let mut conn2 = db.connect();
    assert!(matches!(
        dao.atomic_insert(&mut conn2, &mut bad),
        Err(Error::NullBinding { .. })
    ));
    assert!(conn2.is_closed());
    assert!(matches!(
        dao.select_all(&mut conn2),
        Err(Error::ClosedConnection)
    ));

    let mut verify = db.connect();
    let names: Vec<_> = dao
        .select_all(&mut verify)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(names, vec![Some("Salad".to_owned())]);
}
