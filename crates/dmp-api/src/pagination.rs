//! # Pagination
//!
//! Page selection and `links` for list endpoints. Links are absolute,
//! built from the configured base URL, and carry the caller's other query
//! arguments.

use std::collections::BTreeMap;

use crate::error::AppError;

/// One page of a list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    /// Cut page `page` (1-based) of `per_page` items out of `all`.
    ///
    /// Page 1 of an empty list is an empty page; any other page past the
    /// end is not found.
    pub fn of(all: Vec<T>, page: usize, per_page: usize) -> Result<Self, AppError> {
        let per_page = per_page.max(1);
        let pages = all.len().div_ceil(per_page);
        if page == 0 || (page > pages && page != 1) {
            return Err(AppError::NotFound(format!("page {page} does not exist")));
        }
        let items = all
            .into_iter()
            .skip((page - 1) * per_page)
            .take(per_page)
            .collect();
        Ok(Self { items, page, pages })
    }

    /// Whether a previous page exists.
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Whether a next page exists.
    pub fn has_next(&self) -> bool {
        self.page < self.pages
    }

    /// `prev`, `next` and `last` links for this page.
    pub fn links(&self, base: &str, args: &[(&str, String)]) -> BTreeMap<&'static str, String> {
        let mut links = BTreeMap::new();
        if self.has_prev() {
            links.insert("prev", page_url(base, args, self.page - 1));
        }
        if self.has_next() {
            links.insert("next", page_url(base, args, self.page + 1));
            links.insert("last", page_url(base, args, self.pages));
        }
        links
    }
}

/// Parse the `page` query argument, defaulting to 1.
pub fn page_number(raw: Option<&str>) -> Result<usize, AppError> {
    match raw {
        None => Ok(1),
        Some(s) => s
            .parse::<usize>()
            .map_err(|_| AppError::BadRequest("Invalid page argument".to_string())),
    }
}

fn page_url(base: &str, args: &[(&str, String)], page: usize) -> String {
    let mut query: Vec<String> = args.iter().map(|(k, v)| format!("{k}={v}")).collect();
    query.push(format!("page={page}"));
    format!("{base}?{}", query.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_of_three_pages() {
        let page = Page::of((1..=25).collect::<Vec<_>>(), 1, 10).unwrap();
        assert_eq!(page.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(page.pages, 3);
        let links = page.links("http://localhost/suppliers", &[]);
        assert!(!links.contains_key("prev"));
        assert_eq!(links["next"], "http://localhost/suppliers?page=2");
        assert_eq!(links["last"], "http://localhost/suppliers?page=3");
    }

    #[test]
    fn last_page_links_back_only() {
        let page = Page::of((1..=25).collect::<Vec<_>>(), 3, 10).unwrap();
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        let links = page.links("http://x/s", &[("prefix", "a".to_string())]);
        assert_eq!(links["prev"], "http://x/s?prefix=a&page=2");
        assert!(!links.contains_key("next"));
        assert!(!links.contains_key("last"));
    }

    #[test]
    fn empty_list_has_one_empty_page() {
        let page = Page::of(Vec::<i32>::new(), 1, 10).unwrap();
        assert!(page.items.is_empty());
        assert!(page.links("http://x", &[]).is_empty());
    }

    #[test]
    fn pages_past_the_end_are_not_found() {
        assert!(matches!(
            Page::of(vec![1, 2], 2, 10),
            Err(AppError::NotFound(_))
        ));
        assert!(Page::of(vec![1], 0, 10).is_err());
    }

    #[test]
    fn page_argument_parsing() {
        assert_eq!(page_number(None).unwrap(), 1);
        assert_eq!(page_number(Some("4")).unwrap(), 4);
        assert!(matches!(page_number(Some("four")), Err(AppError::BadRequest(_))));
    }
}
