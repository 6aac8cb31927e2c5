//! Deterministic per-domain page routing.
//!
//! Policy:
//! - project, hvac, dhw: schedule and compliance pages
//! - zones: schedule, compliance, and drawing pages
//! - windows: schedule, compliance, and the first 5 drawing pages
//!
//! Results are ascending and capped at 20 pages per worker.

use planlift_core::constants::MAX_PAGES_PER_WORKER;
use planlift_core::types::document::DocumentMap;
use planlift_core::types::fragments::Domain;
use tracing::debug;

/// Drawing pages the windows extractor may see.
const WINDOWS_DRAWING_PAGES: usize = 5;

/// The page subset one extractor should see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedPages {
    pub domain: Domain,
    /// 1-indexed page numbers, ascending, deduplicated.
    pub pages: Vec<usize>,
    /// Set when the 20-page cap truncated the tail.
    pub truncation_note: Option<String>,
}

/// Select the pages for one domain from the document map.
pub fn route(domain: Domain, map: &DocumentMap) -> RoutedPages {
    let mut pages = match domain {
        Domain::Project | Domain::Hvac | Domain::Dhw => {
            merge_sorted(&[map.schedule_pages(), map.compliance_pages()])
        }
        Domain::Zones => merge_sorted(&[
            map.schedule_pages(),
            map.compliance_pages(),
            map.drawing_pages(),
        ]),
        Domain::Windows => {
            let mut drawings = map.drawing_pages();
            drawings.truncate(WINDOWS_DRAWING_PAGES);
            merge_sorted(&[map.schedule_pages(), map.compliance_pages(), drawings])
        }
        Domain::Orientation => {
            // Orientation reads site plans and elevations, all drawings.
            merge_sorted(&[map.drawing_pages()])
        }
    };

    let truncation_note = if pages.len() > MAX_PAGES_PER_WORKER {
        let dropped = pages.len() - MAX_PAGES_PER_WORKER;
        pages.truncate(MAX_PAGES_PER_WORKER);
        let note = format!(
            "page routing for {domain} truncated to {MAX_PAGES_PER_WORKER} pages ({dropped} dropped)"
        );
        debug!(%domain, dropped, "routing truncated");
        Some(note)
    } else {
        None
    };

    RoutedPages {
        domain,
        pages,
        truncation_note,
    }
}

/// Union of already-sorted page lists, ascending and deduplicated.
fn merge_sorted(lists: &[Vec<usize>]) -> Vec<usize> {
    let mut all: Vec<usize> = lists.iter().flatten().copied().collect();
    all.sort_unstable();
    all.dedup();
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use planlift_core::types::building::Confidence;
    use planlift_core::types::document::{PageInfo, PageType};

    fn map_with(types: &[(usize, PageType)]) -> DocumentMap {
        DocumentMap {
            total_pages: types.len(),
            pages: types
                .iter()
                .map(|&(page, page_type)| PageInfo {
                    page,
                    page_type,
                    confidence: Confidence::High,
                    description: None,
                })
                .collect(),
        }
    }

    #[test]
    fn project_sees_schedules_and_compliance_only() {
        let map = map_with(&[
            (1, PageType::Schedule),
            (2, PageType::Drawing),
            (3, PageType::Compliance),
            (4, PageType::Other),
        ]);
        let routed = route(Domain::Project, &map);
        assert_eq!(routed.pages, vec![1, 3]);
        assert!(routed.truncation_note.is_none());
    }

    #[test]
    fn windows_sees_first_five_drawings() {
        let types: Vec<(usize, PageType)> = (1..=10)
            .map(|n| {
                let t = if n <= 2 { PageType::Schedule } else { PageType::Drawing };
                (n, t)
            })
            .collect();
        let routed = route(Domain::Windows, &map_with(&types));
        // 2 schedules + drawings 3..=7.
        assert_eq!(routed.pages, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn forty_drawing_pages_truncate_to_twenty_with_note() {
        let types: Vec<(usize, PageType)> = (1..=40).map(|n| (n, PageType::Drawing)).collect();
        let routed = route(Domain::Zones, &map_with(&types));
        assert_eq!(routed.pages.len(), 20);
        assert_eq!(routed.pages.last(), Some(&20));
        assert!(routed
            .truncation_note
            .as_deref()
            .unwrap()
            .contains("20 dropped"));
    }

    #[test]
    fn routing_is_ascending_regardless_of_map_order() {
        let map = map_with(&[
            (4, PageType::Compliance),
            (1, PageType::Schedule),
            (3, PageType::Schedule),
        ]);
        let routed = route(Domain::Hvac, &map);
        assert_eq!(routed.pages, vec![1, 3, 4]);
    }
}
