//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    category::{Category, CategoryId, CategoryName},
};

/// Create a category and return it with its generated ID.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCategoryName] if a category with the same name exists,
/// - [Error::InvalidCategory] if `parent_id` does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_category(
    name: CategoryName,
    parent_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "INSERT INTO category (name, parent_id) VALUES (?1, ?2)
             RETURNING id, name, parent_id",
        )?
        .query_row((name.as_ref(), parent_id), map_category_row)
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(name.to_string()),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(parent_id),
            error => error.into(),
        })
}

/// Retrieve a single category by ID.
pub fn get_category(category_id: CategoryId, connection: &Connection) -> Result<Category, Error> {
    connection
        .prepare("SELECT id, name, parent_id FROM category WHERE id = :id;")?
        .query_row(&[(":id", &category_id)], map_category_row)
        .map_err(|error| error.into())
}

/// Retrieve all categories ordered alphabetically by name.
pub fn get_all_categories(connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare("SELECT id, name, parent_id FROM category ORDER BY name ASC;")?
        .query_map([], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Update a category's name and parent.
///
/// # Errors
/// This function will return a:
/// - [Error::CategoryCycle] if `parent_id` would make the category its own ancestor,
/// - [Error::UpdateMissingCategory] if `category_id` does not exist,
/// - [Error::DuplicateCategoryName] if the new name is already taken,
/// - [Error::InvalidCategory] if `parent_id` does not refer to a real category,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_category(
    category_id: CategoryId,
    new_name: CategoryName,
    new_parent_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<(), Error> {
    if would_create_cycle(category_id, new_parent_id, connection)? {
        return Err(Error::CategoryCycle);
    }

    let rows_affected = connection
        .execute(
            "UPDATE category SET name = ?1, parent_id = ?2 WHERE id = ?3",
            (new_name.as_ref(), new_parent_id, category_id),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateCategoryName(new_name.to_string()),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidCategory(new_parent_id),
            error => error.into(),
        })?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingCategory);
    }

    Ok(())
}

/// Delete a category by ID.
///
/// Transactions and child categories referencing the deleted category are
/// detached (their references become NULL), not deleted.
pub fn delete_category(category_id: CategoryId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM category WHERE id = ?1", [category_id])?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingCategory);
    }

    Ok(())
}

/// Walk the parent chain starting at `parent_id` and report whether it ever
/// reaches `category_id`.
///
/// The walk terminates because existing chains are cycle-free: this check is
/// applied before every parent assignment.
fn would_create_cycle(
    category_id: CategoryId,
    mut parent_id: Option<CategoryId>,
    connection: &Connection,
) -> Result<bool, Error> {
    while let Some(ancestor_id) = parent_id {
        if ancestor_id == category_id {
            return Ok(true);
        }

        parent_id = connection
            .prepare("SELECT parent_id FROM category WHERE id = :id")?
            .query_row(&[(":id", &ancestor_id)], |row| row.get(0))
            .optional()?
            .flatten();
    }

    Ok(false)
}

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            parent_id INTEGER REFERENCES category(id) ON DELETE SET NULL
        );

        CREATE INDEX IF NOT EXISTS idx_category_name ON category(name);",
    )?;

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let raw_name: String = row.get(1)?;
    let name = CategoryName::new_unchecked(&raw_name);
    let parent_id = row.get(2)?;

    Ok(Category {
        id,
        name,
        parent_id,
    })
}
