//! Core data models for Riffle
//!
//! The engine only sees `Record`s: an id plus named text fields. `Book` is the
//! catalog's own shape and converts into a `Record` for indexing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A searchable document: a stable id and a set of named text fields.
///
/// Field semantics are opaque to the engine; only fields named in the
/// `SearchConfig` are scored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Text of a field, or `None` when the record doesn't carry it
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CATALOG BOOK
// ─────────────────────────────────────────────────────────────────────────────

/// A catalog book as stored by the CRUD layer.
/// Only `title`, `author` and `genre` are searchable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub isbn: String,
    #[serde(default)]
    pub stock_count: u32,
}

impl Book {
    /// Project the searchable text of this book into a `Record`
    pub fn to_record(&self, id: impl Into<String>) -> Record {
        Record::new(id)
            .with_field("title", self.title.as_str())
            .with_field("author", self.author.as_str())
            .with_field("genre", self.genre.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_fields() {
        let record = Record::new("1")
            .with_field("title", "The Hobbit")
            .with_field("author", "J.R.R. Tolkien");
        assert_eq!(record.field("title"), Some("The Hobbit"));
        assert_eq!(record.field("genre"), None);
    }

    #[test]
    fn test_record_json_without_fields() {
        let record: Record = serde_json::from_str(r#"{"id": "7"}"#).unwrap();
        assert_eq!(record, Record::new("7"));
    }

    #[test]
    fn test_book_to_record() {
        let book = Book {
            title: "The Hobbit".to_string(),
            author: "J.R.R. Tolkien".to_string(),
            genre: "Fantasy".to_string(),
            published_year: 1937,
            isbn: "978-0-618-00221-4".to_string(),
            stock_count: 10,
        };
        let record = book.to_record("2");
        assert_eq!(record.id, "2");
        assert_eq!(record.fields.len(), 3);
        assert_eq!(record.field("genre"), Some("Fantasy"));
        assert_eq!(record.field("isbn"), None);
    }

    #[test]
    fn test_book_camel_case_json() {
        let book: Book = serde_json::from_str(
            r#"{"title": "1984", "author": "George Orwell", "genre": "Dystopian",
                "publishedYear": 1949, "isbn": "978-0-452-28423-4"}"#,
        )
        .unwrap();
        assert_eq!(book.published_year, 1949);
        assert_eq!(book.stock_count, 0);
    }
}
