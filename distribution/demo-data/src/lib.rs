//! Seed book catalog shared by tests, benchmarks and the CLI.
//!
//! Parsed once from the embedded CSV on first access.

use once_cell::sync::Lazy;
use riffle::{Book, Record};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DemoBook {
    pub id: String,
    pub title: String,
    pub author: String,
    pub genre: String,
    pub published_year: i32,
    pub isbn: String,
    pub stock_count: u32,
}

impl DemoBook {
    /// The catalog's own shape, without the id
    pub fn to_book(&self) -> Book {
        Book {
            title: self.title.clone(),
            author: self.author.clone(),
            genre: self.genre.clone(),
            published_year: self.published_year,
            isbn: self.isbn.clone(),
            stock_count: self.stock_count,
        }
    }

    pub fn to_record(&self) -> Record {
        self.to_book().to_record(self.id.as_str())
    }
}

const BOOKS_CSV: &str = include_str!("../data/books.csv");

static BOOKS: Lazy<Vec<DemoBook>> = Lazy::new(|| {
    parse_books(BOOKS_CSV).unwrap_or_else(|e| {
        eprintln!("Warning: Failed to parse demo books CSV: {}", e);
        Vec::new()
    })
});

fn parse_books(data: &str) -> Result<Vec<DemoBook>, csv::Error> {
    csv::Reader::from_reader(data.as_bytes())
        .deserialize()
        .collect()
}

/// The seed catalog, in catalog order
pub fn books() -> &'static [DemoBook] {
    &BOOKS
}

/// The seed catalog as searchable records, in catalog order
pub fn records() -> Vec<Record> {
    books().iter().map(DemoBook::to_record).collect()
}

/// Words used to synthesise titles for generated catalogs
pub const TITLE_WORDS: &[&str] = &[
    "Shadow", "River", "Garden", "Winter", "Empire", "Silent", "Crown", "Harbor", "Ember", "Glass",
    "Hollow", "Iron", "Lantern", "Meadow", "North", "Orchard", "Raven", "Salt", "Tide", "Willow",
];

/// Genres used for generated catalogs
pub const GENRES: &[&str] = &[
    "Fantasy", "Fiction", "Dystopian", "Romance", "Mystery", "Science Fiction", "History", "Poetry",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_catalog_parses() {
        let books = books();
        assert_eq!(books.len(), 10);
        assert_eq!(books[0].title, "Harry Potter and the Philosopher's Stone");
        assert_eq!(books[6].author, "J.R.R. Tolkien");
        assert_eq!(books[9].stock_count, 12);
    }

    #[test]
    fn test_seed_records() {
        let records = records();
        assert_eq!(records.len(), 10);
        assert_eq!(records[0].id, "1");
        assert_eq!(records[0].field("author"), Some("J.K. Rowling"));
        assert_eq!(records[6].field("title"), Some("The Hobbit"));
        // Only the searchable text is projected
        assert_eq!(records[0].field("isbn"), None);
        assert_eq!(books()[0].to_book().isbn, "978-0-7475-3269-9");
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<&str> = books().iter().map(|b| b.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), books().len());
    }
}
