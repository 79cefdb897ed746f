/// Pagination strategies for task listings
///
/// Two interchangeable strategies:
///
/// - **Cursor** ([`Cursor`], [`CursorPage`]): keyset pagination over the
///   indexed `(created_at, id)` pair. Never runs COUNT(*) on the table, so
///   page cost stays flat on large datasets. Clients get opaque `next` /
///   `previous` cursors instead of page numbers.
/// - **Page-number** ([`NumberedPage`]): classic `?page=N` navigation with
///   total count and page count. Requires a full matching-row count, so it
///   is the slow path on large collections; offered for callers that need
///   absolute page numbers.
///
/// The `id` tie-break is mandatory: `created_at` is not unique, and without
/// the tie-break a cursor landing on a timestamp shared by several rows
/// would skip or repeat rows between pages.
///
/// # Cursor format
///
/// A cursor is `"{timestamp_micros}:{uuid}:{f|r}"` encoded with URL-safe
/// unpadded base64. The trailing flag records whether the cursor walks
/// forward (`f`, "rows after this position") or in reverse (`r`, a
/// `previous` link). The encoding is an implementation detail; clients must
/// treat cursors as opaque.
///
/// # Example
///
/// ```
/// use taskforge_shared::pagination::Cursor;
/// use chrono::Utc;
/// use uuid::Uuid;
///
/// let cursor = Cursor {
///     created_at: Utc::now(),
///     id: Uuid::new_v4(),
///     reverse: false,
/// };
///
/// let encoded = cursor.encode();
/// let decoded = Cursor::decode(&encoded).unwrap();
/// assert_eq!(decoded.id, cursor.id);
/// ```

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Default number of items per page
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Maximum client-requestable page size
pub const MAX_PAGE_SIZE: i64 = 100;

/// Error type for cursor decoding
///
/// A malformed cursor is a client error (400), never a silent reset to the
/// start of the collection.
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    /// Cursor is not valid base64 or does not match the expected layout
    #[error("Malformed cursor")]
    Malformed,
}

/// Position within the ordered task collection
///
/// Identifies a row by its ordering-field value plus the primary key as a
/// deterministic tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Ordering field value (creation time) of the boundary row
    pub created_at: DateTime<Utc>,

    /// Primary key of the boundary row (tie-break)
    pub id: Uuid,

    /// Whether this cursor walks toward earlier pages (a `previous` link)
    pub reverse: bool,
}

impl Cursor {
    /// Encodes the cursor into its opaque wire form
    pub fn encode(&self) -> String {
        let direction = if self.reverse { 'r' } else { 'f' };
        let raw = format!(
            "{}:{}:{}",
            self.created_at.timestamp_micros(),
            self.id,
            direction
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decodes an opaque cursor string
    ///
    /// # Errors
    ///
    /// Returns [`CursorError::Malformed`] if the string is not valid base64,
    /// the layout doesn't match, the timestamp is out of range, or the id is
    /// not a UUID.
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded.as_bytes())
            .map_err(|_| CursorError::Malformed)?;
        let raw = String::from_utf8(raw).map_err(|_| CursorError::Malformed)?;

        let mut parts = raw.split(':');
        let micros: i64 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or(CursorError::Malformed)?;
        let id: Uuid = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or(CursorError::Malformed)?;
        let reverse = match parts.next() {
            Some("f") => false,
            Some("r") => true,
            _ => return Err(CursorError::Malformed),
        };
        if parts.next().is_some() {
            return Err(CursorError::Malformed);
        }

        let created_at = Utc
            .timestamp_micros(micros)
            .single()
            .ok_or(CursorError::Malformed)?;

        Ok(Self {
            created_at,
            id,
            reverse,
        })
    }
}

/// Rows that can anchor a cursor
///
/// Implemented by any row type that carries the `(created_at, id)` ordering
/// pair the cursor strategy keys on.
pub trait CursorIdentify {
    /// The row's position in the ordered collection
    fn cursor_position(&self) -> (DateTime<Utc>, Uuid);
}

/// One page of cursor-paginated results
///
/// Mirrors the `{next, previous, results}` response shape. No total count
/// is included; computing one would defeat the point of the strategy.
#[derive(Debug, Serialize)]
pub struct CursorPage<T> {
    /// Opaque cursor for the next page (None at the end)
    pub next: Option<String>,

    /// Opaque cursor for the previous page (None at the start)
    pub previous: Option<String>,

    /// Page items in display order
    pub results: Vec<T>,
}

impl<T: CursorIdentify> CursorPage<T> {
    /// Builds a page from a fetched window of rows
    ///
    /// `window` must contain up to `page_size + 1` rows fetched in *query
    /// order*: display order for a forward cursor, reversed for a reverse
    /// cursor (the caller's SQL flips ORDER BY when walking backward). The
    /// extra row, if present, only signals that more rows exist in the walk
    /// direction and is dropped from the output.
    ///
    /// `current` is the cursor the client supplied (None for the first
    /// page).
    pub fn build(mut window: Vec<T>, page_size: usize, current: Option<&Cursor>) -> Self {
        let walking_back = current.map(|c| c.reverse).unwrap_or(false);
        let has_more = window.len() > page_size;
        window.truncate(page_size);

        if walking_back {
            // Restore display order; the backward query returned rows
            // closest to the boundary first.
            window.reverse();
        }

        let next = if walking_back || has_more {
            window.last().map(|row| {
                let (created_at, id) = row.cursor_position();
                Cursor {
                    created_at,
                    id,
                    reverse: false,
                }
                .encode()
            })
        } else {
            None
        };

        // Forward from the very start means there is nothing before the
        // first row; any other request may have rows behind it.
        let previous = if (walking_back && has_more) || (!walking_back && current.is_some()) {
            window.first().map(|row| {
                let (created_at, id) = row.cursor_position();
                Cursor {
                    created_at,
                    id,
                    reverse: true,
                }
                .encode()
            })
        } else {
            None
        };

        Self {
            next,
            previous,
            results: window,
        }
    }
}

/// One page of page-number-paginated results
///
/// Includes the total matching-row count and derived page count, which
/// requires a COUNT(*) over the filtered set.
#[derive(Debug, Serialize)]
pub struct NumberedPage<T> {
    /// Total matching rows
    pub count: i64,

    /// Next page number (None on the last page)
    pub next: Option<i64>,

    /// Previous page number (None on the first page)
    pub previous: Option<i64>,

    /// Page items in display order
    pub results: Vec<T>,

    /// Current page number (1-based)
    pub page: i64,

    /// Total number of pages
    pub pages: i64,
}

impl<T> NumberedPage<T> {
    /// Builds a page from a fetched slice and the total count
    pub fn build(results: Vec<T>, count: i64, page: i64, page_size: i64) -> Self {
        let pages = if count == 0 {
            1
        } else {
            (count + page_size - 1) / page_size
        };

        Self {
            count,
            next: (page < pages).then_some(page + 1),
            previous: (page > 1).then_some(page - 1),
            results,
            page,
            pages,
        }
    }
}

/// Clamps a client-requested page size to the allowed range
pub fn clamp_page_size(requested: Option<i64>) -> i64 {
    match requested {
        Some(size) if size >= 1 => size.min(MAX_PAGE_SIZE),
        _ => DEFAULT_PAGE_SIZE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        created_at: DateTime<Utc>,
        id: Uuid,
    }

    impl CursorIdentify for Row {
        fn cursor_position(&self) -> (DateTime<Utc>, Uuid) {
            (self.created_at, self.id)
        }
    }

    /// Builds `n` rows newest-first, with the middle rows sharing one
    /// timestamp so the tie-break is actually exercised.
    fn make_rows(n: usize) -> Vec<Row> {
        let base = Utc.timestamp_micros(1_700_000_000_000_000).unwrap();
        let mut rows: Vec<Row> = (0..n)
            .map(|i| {
                let ts = if n >= 6 && (2..5).contains(&i) {
                    base + Duration::seconds(500)
                } else {
                    base + Duration::seconds((n - i) as i64)
                };
                Row {
                    created_at: ts,
                    id: Uuid::new_v4(),
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows
    }

    /// Simulates the keyset SQL over an in-memory collection.
    fn fetch_window(all: &[Row], cursor: Option<&Cursor>, limit: usize) -> Vec<Row> {
        match cursor {
            None => all.iter().take(limit).cloned().collect(),
            Some(c) if !c.reverse => all
                .iter()
                .filter(|r| (r.created_at, r.id) < (c.created_at, c.id))
                .take(limit)
                .cloned()
                .collect(),
            Some(c) => {
                // Backward walk: rows after the boundary in ascending
                // order, i.e. reversed display order.
                let mut rows: Vec<Row> = all
                    .iter()
                    .filter(|r| (r.created_at, r.id) > (c.created_at, c.id))
                    .cloned()
                    .collect();
                rows.reverse();
                rows.truncate(limit);
                rows
            }
        }
    }

    #[test]
    fn test_cursor_roundtrip() {
        let cursor = Cursor {
            created_at: Utc.timestamp_micros(1_700_000_123_456_789).unwrap(),
            id: Uuid::new_v4(),
            reverse: true,
        };

        let decoded = Cursor::decode(&cursor.encode()).unwrap();
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn test_cursor_decode_malformed() {
        assert!(Cursor::decode("not base64 at all!!").is_err());
        assert!(Cursor::decode("").is_err());

        // Valid base64, wrong layout
        let bogus = URL_SAFE_NO_PAD.encode(b"hello world");
        assert!(matches!(
            Cursor::decode(&bogus),
            Err(CursorError::Malformed)
        ));

        // Right shape, bad direction flag
        let bad_flag = URL_SAFE_NO_PAD.encode(
            format!("1700000000000000:{}:x", Uuid::new_v4()).as_bytes(),
        );
        assert!(Cursor::decode(&bad_flag).is_err());

        // Trailing garbage
        let extra = URL_SAFE_NO_PAD.encode(
            format!("1700000000000000:{}:f:junk", Uuid::new_v4()).as_bytes(),
        );
        assert!(Cursor::decode(&extra).is_err());
    }

    #[test]
    fn test_first_page_has_no_previous() {
        let all = make_rows(5);
        let window = fetch_window(&all, None, 3);
        let page = CursorPage::build(window, 2, None);

        assert_eq!(page.results.len(), 2);
        assert!(page.next.is_some());
        assert!(page.previous.is_none());
    }

    #[test]
    fn test_last_page_has_no_next() {
        let all = make_rows(5);

        let first = CursorPage::build(fetch_window(&all, None, 4), 3, None);
        let cursor = Cursor::decode(first.next.as_deref().unwrap()).unwrap();
        let last = CursorPage::build(fetch_window(&all, Some(&cursor), 4), 3, Some(&cursor));

        assert_eq!(last.results.len(), 2);
        assert!(last.next.is_none());
        assert!(last.previous.is_some());
    }

    #[test]
    fn test_forward_walk_covers_collection_exactly() {
        // Concatenating all pages yields the full ordered collection with
        // no duplicates and no omissions, ties included.
        let all = make_rows(10);
        let page_size = 3usize;

        let mut seen: Vec<Row> = Vec::new();
        let mut cursor: Option<Cursor> = None;

        loop {
            let window = fetch_window(&all, cursor.as_ref(), page_size + 1);
            let page = CursorPage::build(window, page_size, cursor.as_ref());
            seen.extend(page.results);

            match page.next {
                Some(encoded) => cursor = Some(Cursor::decode(&encoded).unwrap()),
                None => break,
            }
        }

        assert_eq!(seen, all);
    }

    #[test]
    fn test_previous_cursor_returns_to_prior_page() {
        let all = make_rows(9);
        let page_size = 3usize;

        let first = CursorPage::build(fetch_window(&all, None, page_size + 1), page_size, None);
        let next = Cursor::decode(first.next.as_deref().unwrap()).unwrap();
        let second = CursorPage::build(
            fetch_window(&all, Some(&next), page_size + 1),
            page_size,
            Some(&next),
        );

        // Walk back from page two; we should see page one again.
        let prev = Cursor::decode(second.previous.as_deref().unwrap()).unwrap();
        assert!(prev.reverse);
        let back = CursorPage::build(
            fetch_window(&all, Some(&prev), page_size + 1),
            page_size,
            Some(&prev),
        );

        assert_eq!(back.results, first.results);
        assert!(back.previous.is_none());
        assert!(back.next.is_some());
    }

    #[test]
    fn test_same_cursor_yields_same_page() {
        let all = make_rows(8);
        let page_size = 3usize;

        let first = CursorPage::build(fetch_window(&all, None, page_size + 1), page_size, None);
        let cursor = Cursor::decode(first.next.as_deref().unwrap()).unwrap();

        let a = CursorPage::build(
            fetch_window(&all, Some(&cursor), page_size + 1),
            page_size,
            Some(&cursor),
        );
        let b = CursorPage::build(
            fetch_window(&all, Some(&cursor), page_size + 1),
            page_size,
            Some(&cursor),
        );

        assert_eq!(a.results, b.results);
    }

    #[test]
    fn test_numbered_page_math() {
        let page = NumberedPage::build(vec![1, 2, 3], 10, 1, 3);
        assert_eq!(page.pages, 4);
        assert_eq!(page.next, Some(2));
        assert_eq!(page.previous, None);

        let page = NumberedPage::build(vec![10], 10, 4, 3);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, Some(3));

        let page: NumberedPage<i32> = NumberedPage::build(vec![], 0, 1, 20);
        assert_eq!(page.pages, 1);
        assert_eq!(page.next, None);
        assert_eq!(page.previous, None);
    }

    #[test]
    fn test_clamp_page_size() {
        assert_eq!(clamp_page_size(None), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(Some(50)), 50);
        assert_eq!(clamp_page_size(Some(500)), MAX_PAGE_SIZE);
        assert_eq!(clamp_page_size(Some(0)), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(Some(-3)), DEFAULT_PAGE_SIZE);
    }
}
