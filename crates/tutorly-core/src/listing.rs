// Client-side filtering and pagination of fetched lists

use serde::Serialize;

use crate::models::{ClassRecord, ClassStatus};

/// Default number of rows per page
pub const DEFAULT_PER_PAGE: usize = 10;

/// One page of an already-fetched list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually shown
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Slice `items` into a page
///
/// Pages are 1-based. A page past the end shows the last page, page 0
/// shows the first, and `per_page` is at least 1.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total,
        total_pages,
    }
}

/// Filter for class listings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassQuery {
    /// Case-insensitive match on title or teacher name
    pub search: Option<String>,
    pub status: Option<ClassStatus>,
    pub teacher_email: Option<String>,
}

impl ClassQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.search = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn status(mut self, status: ClassStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn teacher(mut self, email: impl Into<String>) -> Self {
        self.teacher_email = Some(email.into());
        self
    }

    pub fn matches(&self, class: &ClassRecord) -> bool {
        if let Some(status) = self.status {
            if class.status != status {
                return false;
            }
        }
        if let Some(email) = &self.teacher_email {
            if !class.teacher_email.eq_ignore_ascii_case(email) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !class.title.to_lowercase().contains(&needle)
                && !class.teacher_name.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }

    /// Keep matching classes, preserving order
    pub fn apply(&self, classes: Vec<ClassRecord>) -> Vec<ClassRecord> {
        classes.into_iter().filter(|c| self.matches(c)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: &str, title: &str, teacher: &str, status: ClassStatus) -> ClassRecord {
        ClassRecord {
            id: id.to_string(),
            title: title.to_string(),
            teacher_name: teacher.to_string(),
            teacher_email: format!("{}@example.com", teacher.to_lowercase()),
            price: 10.0,
            description: String::new(),
            image: None,
            status,
            total_enrollment: 0,
        }
    }

    #[test]
    fn test_paginate_middle_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 2, 10);
        assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
        assert!(page.has_previous());
    }

    #[test]
    fn test_paginate_clamps_page() {
        let page = paginate((1..=25).collect::<Vec<_>>(), 9, 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert!(!page.has_next());

        let page = paginate((1..=5).collect::<Vec<_>>(), 0, 0);
        assert_eq!(page.page, 1);
        assert_eq!(page.per_page, 1);
        assert_eq!(page.items, vec![1]);
    }

    #[test]
    fn test_paginate_empty() {
        let page = paginate(Vec::<u32>::new(), 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn test_class_query() {
        let classes = vec![
            class("1", "Intro to Rust", "Ferris", ClassStatus::Approved),
            class("2", "Advanced Rust", "Ada", ClassStatus::Pending),
            class("3", "Watercolor", "Bob", ClassStatus::Approved),
        ];

        let found = ClassQuery::new().search("rust").apply(classes.clone());
        assert_eq!(found.len(), 2);

        let found = ClassQuery::new()
            .search("RUST")
            .status(ClassStatus::Approved)
            .apply(classes.clone());
        assert_eq!(found.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), vec!["1"]);

        let found = ClassQuery::new().search("bob").apply(classes.clone());
        assert_eq!(found[0].id, "3");

        let found = ClassQuery::new().teacher("ADA@example.com").apply(classes.clone());
        assert_eq!(found[0].id, "2");

        let found = ClassQuery::new().search("   ").apply(classes);
        assert_eq!(found.len(), 3);
    }
}
