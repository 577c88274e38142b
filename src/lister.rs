//! Cursor-based pagination over a remote inventory.
//!
//! A `PagedLister` fetches one page at a time; `Pages` strings those calls
//! together into a lazy iterator that only asks for the next page once the
//! current one is used up.

use std::vec;

use crate::error::Result;

/// One page of records and the cursor of the page after it.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// A source of records delivered in pages.
pub trait PagedLister {
    type Record;

    /// Fetch the page at `cursor`, or the first page when `cursor` is `None`.
    fn list(&self, cursor: Option<&str>) -> Result<Page<Self::Record>>;

    /// Every record across all pages, fetched lazily.
    fn items(&self) -> Pages<'_, Self>
    where
        Self: Sized,
    {
        Pages::new(self)
    }
}

/// Lazy iterator over every record of a `PagedLister`.
///
/// An error ends the iteration after it has been yielded.
pub struct Pages<'a, L: PagedLister> {
    lister: &'a L,
    buffer: vec::IntoIter<L::Record>,
    cursor: Option<String>,
    started: bool,
    finished: bool,
}

impl<'a, L: PagedLister> Pages<'a, L> {
    pub fn new(lister: &'a L) -> Self {
        Self {
            lister,
            buffer: Vec::new().into_iter(),
            cursor: None,
            started: false,
            finished: false,
        }
    }
}

impl<L: PagedLister> Iterator for Pages<'_, L> {
    type Item = Result<L::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.buffer.next() {
                return Some(Ok(record));
            }
            if self.finished || (self.started && self.cursor.is_none()) {
                return None;
            }

            self.started = true;
            let cursor = self.cursor.take();
            match self.lister.list(cursor.as_deref()) {
                Ok(page) => {
                    self.buffer = page.items.into_iter();
                    self.cursor = page.next;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
