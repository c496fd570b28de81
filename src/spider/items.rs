//! Records extracted from listing and comment pages

/// Metadata of one book, taken from a tag listing page
#[derive(Debug, Clone, PartialEq)]
pub struct BookRecord {
    /// Numeric id from the book's detail URL
    pub id: i64,

    pub title: String,

    /// First "/"-separated field of the publication line
    pub author: String,

    /// Average rating shown on the listing (0.0 - 10.0)
    pub rating: f64,
}

/// One user comment on a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub book_id: i64,
    pub user: String,

    /// Star rating, 1 to 5
    pub rating: u8,

    /// "Useful" votes the comment received
    pub vote: u32,
}

/// Any record the spider emits
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Book(BookRecord),
    Comment(CommentRecord),
}

impl From<BookRecord> for Record {
    fn from(book: BookRecord) -> Self {
        Self::Book(book)
    }
}

impl From<CommentRecord> for Record {
    fn from(comment: CommentRecord) -> Self {
        Self::Comment(comment)
    }
}
