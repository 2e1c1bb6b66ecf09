//! # Built-in Catalog
//!
//! The type registry the inspector resolves streams against, plus the
//! demonstration graph written by `driftgraph sample`.
//!
//! Two generations of the same small library model exist:
//!
//! | Type       | legacy                      | current                     |
//! |------------|-----------------------------|-----------------------------|
//! | `Book`     | `isbn: string`              | `pages: u32`                |
//! | `Magazine` | registered                  | removed                     |
//!
//! A sample written with the legacy catalog and inspected with the current
//! one therefore shows a removed property, an added property and a missing
//! type.

use driftgraph_core::{
    Collection, DriftError, EnumValue, Instance, ObjectGraph, PrimitiveKind, TypeDefinition,
    TypeDescriptor, TypeRegistry, Value,
};

/// Assembly of every catalog type.
pub const CATALOG_ASSEMBLY: &str = "library";

pub fn library() -> TypeDescriptor {
    TypeDescriptor::new(CATALOG_ASSEMBLY, "Library")
}

pub fn book() -> TypeDescriptor {
    TypeDescriptor::new(CATALOG_ASSEMBLY, "Book")
}

pub fn author() -> TypeDescriptor {
    TypeDescriptor::new(CATALOG_ASSEMBLY, "Author")
}

pub fn magazine() -> TypeDescriptor {
    TypeDescriptor::new(CATALOG_ASSEMBLY, "Magazine")
}

/// `Genre : u8`.
pub fn genre() -> Result<TypeDescriptor, DriftError> {
    TypeDescriptor::enumeration(
        CATALOG_ASSEMBLY,
        "Genre",
        Some(PrimitiveKind::U8.descriptor()),
    )
}

fn string_array() -> TypeDescriptor {
    TypeDescriptor::array_of(PrimitiveKind::String.descriptor())
}

fn library_definition() -> TypeDefinition {
    TypeDefinition::new(library())
        .with_primitive("name", PrimitiveKind::String)
        .with_property("books", TypeDescriptor::list_of(book()))
        .with_property("featured", book())
        .with_property("shelf", TypeDescriptor::array_of(TypeDescriptor::any()))
}

fn author_definition() -> TypeDefinition {
    TypeDefinition::new(author())
        .with_primitive("name", PrimitiveKind::String)
        .with_property("mentor", author())
}

fn book_definition(legacy: bool) -> Result<TypeDefinition, DriftError> {
    let definition = TypeDefinition::new(book())
        .with_primitive("title", PrimitiveKind::String)
        .with_property("author", author())
        .with_property("genre", genre()?)
        .with_property("tags", string_array());
    Ok(if legacy {
        definition.with_primitive("isbn", PrimitiveKind::String)
    } else {
        definition.with_primitive("pages", PrimitiveKind::U32)
    })
}

fn magazine_definition() -> TypeDefinition {
    TypeDefinition::new(magazine())
        .with_primitive("title", PrimitiveKind::String)
        .with_primitive("issue", PrimitiveKind::U32)
}

/// The registry the inspector resolves against.
pub fn registry() -> Result<TypeRegistry, DriftError> {
    let mut registry = TypeRegistry::new();
    registry.register_enum(genre()?)?;
    registry.register(library_definition())?;
    registry.register(author_definition())?;
    registry.register(book_definition(false)?)?;
    Ok(registry)
}

/// The previous generation of the catalog.
pub fn legacy_registry() -> Result<TypeRegistry, DriftError> {
    let mut registry = TypeRegistry::new();
    registry.register_enum(genre()?)?;
    registry.register(library_definition())?;
    registry.register(author_definition())?;
    registry.register(book_definition(true)?)?;
    registry.register(magazine_definition())?;
    Ok(registry)
}

/// Demonstration graph: two authors mentoring each other (cycle), a book
/// listed and featured at once (shared reference), and an untyped shelf
/// mixing objects, primitives and nulls.
///
/// The legacy graph also shelves a `Magazine`.
pub fn sample_graph(legacy: bool) -> Result<ObjectGraph, DriftError> {
    let mut graph = ObjectGraph::new();

    let le_guin = graph.alloc(Instance::new(author()).with("name", "Ursula K. Le Guin"));
    let delany = graph.alloc(Instance::new(author()).with("name", "Samuel R. Delany"));
    graph.set_property(le_guin, "mentor", delany)?;
    graph.set_property(delany, "mentor", le_guin)?;

    let dispossessed = graph.alloc(
        Instance::new(book())
            .with("title", "The Dispossessed")
            .with("author", le_guin)
            .with("genre", EnumValue::new(genre()?, 1))
            .with("tags", vec!["anarchism".to_string(), "physics".to_string()])
            .with("isbn", "978-0-06-051275-0")
            .with("pages", 387u32),
    );
    let dhalgren = graph.alloc(
        Instance::new(book())
            .with("title", "Dhalgren")
            .with("author", delany)
            .with("genre", EnumValue::new(genre()?, 2))
            .with("tags", Vec::<String>::new())
            .with("isbn", "978-0-375-70668-2")
            .with("pages", 801u32),
    );

    let mut shelf = vec![
        Value::from(dhalgren),
        Value::from("bookmark"),
        Value::from(vec![3i32, 1, 4]),
        Value::Null,
    ];
    if legacy {
        let issue = graph.alloc(
            Instance::new(magazine())
                .with("title", "Galaxy")
                .with("issue", 42u32),
        );
        shelf.push(Value::from(issue));
    }

    let root = graph.alloc(
        Instance::new(library())
            .with("name", "Anarres Public Library")
            .with(
                "books",
                Collection::list(book(), vec![Value::from(dispossessed), Value::from(dhalgren)]),
            )
            .with("featured", dispossessed)
            .with(
                "shelf",
                Collection::array(TypeDescriptor::any(), shelf),
            ),
    );
    graph.set_root(root);
    Ok(graph)
}
