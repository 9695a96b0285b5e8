/// A highlighted range within a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub id: String,
    pub book_id: String,
    /// EPUB canonical fragment identifier range; opaque to this crate.
    pub cfi_range: String,
    pub highlighted_text: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAnnotation {
    pub book_id: String,
    pub cfi_range: String,
    pub highlighted_text: String,
    pub color: Option<String>,
}

#[derive(sqlx::FromRow)]
pub(crate) struct AnnotationRow {
    id: String,
    book_id: String,
    cfi_range: String,
    highlighted_text: String,
    color: Option<String>,
}
impl From<AnnotationRow> for Annotation {
    fn from(row: AnnotationRow) -> Self {
        Self {
            id: row.id,
            book_id: row.book_id,
            cfi_range: row.cfi_range,
            highlighted_text: row.highlighted_text,
            color: row.color,
        }
    }
}
