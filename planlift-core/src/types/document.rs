//! Page classification for one plan set.

use serde::{Deserialize, Serialize};

use crate::types::building::Confidence;

/// What a page image shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    /// Window, door, construction, or equipment schedules.
    Schedule,
    /// Title 24 compliance forms (CF1R and friends).
    Compliance,
    /// Floor plans, elevations, site plans, sections.
    Drawing,
    Other,
}

/// Classification of a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// 1-indexed page number.
    pub page: usize,
    pub page_type: PageType,
    pub confidence: Confidence,
    pub description: Option<String>,
}

/// Classification of every page in the input document set, produced once
/// per evaluation by the discovery worker and cached thereafter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DocumentMap {
    pub total_pages: usize,
    pub pages: Vec<PageInfo>,
}

impl DocumentMap {
    /// Page numbers of a given type, in ascending order.
    pub fn pages_of_type(&self, page_type: PageType) -> Vec<usize> {
        let mut pages: Vec<usize> = self
            .pages
            .iter()
            .filter(|p| p.page_type == page_type)
            .map(|p| p.page)
            .collect();
        pages.sort_unstable();
        pages
    }

    pub fn schedule_pages(&self) -> Vec<usize> {
        self.pages_of_type(PageType::Schedule)
    }

    pub fn compliance_pages(&self) -> Vec<usize> {
        self.pages_of_type(PageType::Compliance)
    }

    pub fn drawing_pages(&self) -> Vec<usize> {
        self.pages_of_type(PageType::Drawing)
    }

    /// Structural sanity check against the page-image manifest.
    pub fn is_consistent_with(&self, total_pages: usize) -> bool {
        self.total_pages == total_pages
            && self.pages.len() == total_pages
            && self.pages.iter().all(|p| p.page >= 1 && p.page <= total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> DocumentMap {
        DocumentMap {
            total_pages: 4,
            pages: vec![
                PageInfo {
                    page: 3,
                    page_type: PageType::Drawing,
                    confidence: Confidence::High,
                    description: None,
                },
                PageInfo {
                    page: 1,
                    page_type: PageType::Schedule,
                    confidence: Confidence::High,
                    description: Some("window schedule".to_string()),
                },
                PageInfo {
                    page: 2,
                    page_type: PageType::Compliance,
                    confidence: Confidence::Medium,
                    description: None,
                },
                PageInfo {
                    page: 4,
                    page_type: PageType::Drawing,
                    confidence: Confidence::Low,
                    description: None,
                },
            ],
        }
    }

    #[test]
    fn selectors_return_sorted_page_numbers() {
        assert_eq!(map().drawing_pages(), vec![3, 4]);
        assert_eq!(map().schedule_pages(), vec![1]);
        assert_eq!(map().compliance_pages(), vec![2]);
    }

    #[test]
    fn consistency_check_catches_out_of_range_pages() {
        let mut m = map();
        assert!(m.is_consistent_with(4));
        m.pages[0].page = 9;
        assert!(!m.is_consistent_with(4));
    }
}
