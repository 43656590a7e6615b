#![allow(dead_code)]

use std::sync::Arc;
use strata::memory::MemoryDatabase;
use strata::{Descriptor, DescriptorBuilder};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Author {
    pub id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitution {
    pub id: Option<i64>,
    pub ingredient_id: Option<i64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ingredient {
    pub id: Option<i64>,
    pub recipe_id: Option<i64>,
    pub name: Option<String>,
    pub amount: Option<i64>,
    pub substitutions: Vec<Substitution>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Recipe {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub author: Option<Author>,
    pub ingredients: Vec<Ingredient>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogEntry {
    pub message: Option<String>,
    pub severity: Option<i64>,
}

pub fn author_descriptor() -> Arc<Descriptor<Author>> {
    DescriptorBuilder::new("author", Author::default)
        .with_primary_key("id", "author_seq", |a| a.id, |a, v| a.id = Some(v))
        .with_string_column("name", |a| a.name.clone(), |a, v| a.name = v)
        .build()
        .unwrap()
}

pub fn substitution_descriptor() -> Arc<Descriptor<Substitution>> {
    DescriptorBuilder::new("substitution", Substitution::default)
        .with_primary_key("id", "substitution_seq", |s| s.id, |s, v| s.id = Some(v))
        .with_parent_column(
            "ingredient_id",
            |s| s.ingredient_id,
            |s, v| s.ingredient_id = Some(v),
        )
        .with_string_column("name", |s| s.name.clone(), |s, v| s.name = v)
        .build()
        .unwrap()
}

pub fn ingredient_descriptor() -> Arc<Descriptor<Ingredient>> {
    DescriptorBuilder::new("ingredient", Ingredient::default)
        .with_primary_key("id", "ingredient_seq", |i| i.id, |i, v| i.id = Some(v))
        .with_parent_column("recipe_id", |i| i.recipe_id, |i, v| i.recipe_id = Some(v))
        .with_string_column("name", |i| i.name.clone(), |i, v| i.name = v)
        .not_null()
        .with_long_column("amount", |i| i.amount, |i, v| i.amount = v)
        .with_children(&substitution_descriptor(), |i: &mut Ingredient| {
            &mut i.substitutions
        })
        .build()
        .unwrap()
}

pub fn recipe_descriptor() -> Arc<Descriptor<Recipe>> {
    DescriptorBuilder::new("recipe", Recipe::default)
        .with_primary_key("id", "recipe_seq", |r| r.id, |r, v| r.id = Some(v))
        .with_string_column("name", |r| r.name.clone(), |r, v| r.name = v)
        .with_join_column(
            "author_id",
            &author_descriptor(),
            |r: &Recipe| r.author.as_ref(),
            |r, a| r.author = Some(a),
        )
        .with_children(&ingredient_descriptor(), |r: &mut Recipe| {
            &mut r.ingredients
        })
        .build()
        .unwrap()
}

pub fn log_descriptor() -> Arc<Descriptor<LogEntry>> {
    DescriptorBuilder::new("audit_log", LogEntry::default)
        .with_string_column("message", |l| l.message.clone(), |l, v| l.message = v)
        .with_long_column("severity", |l| l.severity, |l, v| l.severity = v)
        .build()
        .unwrap()
}

pub fn database() -> MemoryDatabase {
    init_logging();
    let db = MemoryDatabase::new();
    db.define_table("author", &["id", "name"]);
    db.define_table("recipe", &["id", "name", "author_id"]);
    db.define_table("ingredient", &["id", "recipe_id", "name", "amount"]);
    db.define_table("substitution", &["id", "ingredient_id", "name"]);
    db.define_table("audit_log", &["message", "severity"]);
    db.define_sequence("author_seq");
    db.define_sequence("recipe_seq");
    db.define_sequence("ingredient_seq");
    db.define_sequence("substitution_seq");
    db
}

pub fn ingredient(name: &str, amount: i64) -> Ingredient {
    Ingredient {
        name: Some(name.to_owned()),
        amount: Some(amount),
        ..Ingredient::default()
    }
}

pub fn recipe(name: &str, ingredients: Vec<Ingredient>) -> Recipe {
    Recipe {
        name: Some(name.to_owned()),
        ingredients,
        ..Recipe::default()
    }
}
