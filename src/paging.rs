use crate::error::FeedbackError;
use crate::response::Response;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Score,
    Date,
    Location,
    Id,
}

impl FromStr for SortKey {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "score" => Ok(SortKey::Score),
            "date" | "timestamp" => Ok(SortKey::Date),
            "location" => Ok(SortKey::Location),
            "id" => Ok(SortKey::Id),
            _ => Err(FeedbackError::UnknownOption {
                option: "sort key",
                value: s.to_string(),
            }),
        }
    }
}

/// Sort direction, passed in by the caller on every call. The engine keeps
/// no toggle state of its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// The direction a "sort" button switches to on its next press.
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

fn compare(a: &Response, b: &Response, key: SortKey) -> Ordering {
    match key {
        SortKey::Score => a.score().cmp(&b.score()),
        // `None < Some(_)`: undated responses come first when ascending.
        SortKey::Date => a.timestamp().cmp(&b.timestamp()),
        SortKey::Location => a
            .location()
            .to_lowercase()
            .cmp(&b.location().to_lowercase()),
        SortKey::Id => compare_ids(a.id().as_str(), b.id().as_str()),
    }
}

// Numeric ids compare by value and come before all other ids, which
// compare as strings.
fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

/// Returns a sorted copy. Equal keys keep their input order in both
/// directions.
pub fn sort(responses: &[Response], key: SortKey, direction: SortDirection) -> Vec<Response> {
    let mut sorted = responses.to_vec();
    match direction {
        SortDirection::Ascending => sorted.sort_by(|a, b| compare(a, b, key)),
        SortDirection::Descending => sorted.sort_by(|a, b| compare(b, a, key)),
    }
    sorted
}

/// One page of a larger result set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based.
    pub page_number: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    /// Page to show after a "next" press: one further, but never past the
    /// last page (page 1 when there are no pages at all).
    pub fn next_number(&self) -> usize {
        (self.page_number + 1).min(self.total_pages.max(1))
    }
}

/// Slices `items` into pages of `page_size` and returns page `page_number`
/// (1-based). Pages past the end, page 0 and a zero page size all yield an
/// empty `items` list.
pub fn paginate<T: Clone>(items: &[T], page_size: usize, page_number: usize) -> Page<T> {
    let total_items = items.len();
    if page_size == 0 {
        log::warn!("page size 0 requested; returning no pages");
        return Page {
            items: Vec::new(),
            page_number,
            page_size,
            total_pages: 0,
            total_items,
        };
    }

    let total_pages = total_items.div_ceil(page_size);
    let slice = if page_number == 0 || page_number > total_pages {
        &[][..]
    } else {
        let start = (page_number - 1) * page_size;
        let end = (start + page_size).min(total_items);
        &items[start..end]
    };

    Page {
        items: slice.to_vec(),
        page_number,
        page_size,
        total_pages,
        total_items,
    }
}
