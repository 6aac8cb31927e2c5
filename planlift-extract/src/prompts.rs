//! Prompt templates for the extraction workers.
//!
//! Each template states the worker's role, the instruction documents it
//! must follow, and a literal output schema. Builders append the page
//! assignments for the evaluation at hand.

use std::fmt::Write;
use std::path::Path;

use planlift_core::types::document::DocumentMap;
use planlift_core::types::fragments::Domain;

use crate::router::RoutedPages;

/// System prompt for the page-discovery worker.
pub const DISCOVERY_PROMPT: &str = r#"You are the document-discovery worker for a Title 24 plan-set extraction pipeline.

You receive the full list of rasterised page images for one plan set. Classify every page.

## Page types

- "schedule": window, door, construction, or equipment schedules (tabular data).
- "compliance": Title 24 compliance forms (CF1R and related).
- "drawing": floor plans, elevations, site plans, sections, details.
- "other": cover sheets, general notes, anything else.

## Output schema

Return a single JSON object and nothing else:

{
  "total_pages": <integer>,
  "pages": [
    {
      "page": <1-indexed integer>,
      "page_type": "schedule" | "compliance" | "drawing" | "other",
      "confidence": "high" | "medium" | "low",
      "description": <short string or null>
    }
  ]
}

Every page in the input must appear exactly once. Do not skip pages you
cannot read; classify them "other" with confidence "low".
"#;

/// Per-domain extractor role preambles.
fn domain_preamble(domain: Domain) -> &'static str {
    match domain {
        Domain::Project => {
            "Extract scalar project metadata and envelope aggregates: title, address, city, \
             climate zone, fuel type, house type, dwelling units, stories, bedrooms, \
             construction flags, conditioned floor area, window area, window-to-floor ratio, \
             exterior wall area, door area, roof/ceiling area, average ceiling height."
        }
        Domain::Zones => {
            "Extract every thermal zone and every exterior wall segment. Walls carry a zone \
             back-reference, facing azimuth, gross and net areas, and the assembly name from \
             the construction schedule."
        }
        Domain::Windows => {
            "Extract every fenestration entry from the window schedule, cross-checked against \
             the drawings: wall back-reference, height, width, multiplier, area, U-factor, \
             SHGC, and overhang depth."
        }
        Domain::Hvac => {
            "Extract every HVAC system with its heating, cooling, and distribution sub-records \
             including rated efficiency metrics and duct properties."
        }
        Domain::Dhw => {
            "Extract every water-heating system and its heater units: heater type, fuel, \
             uniform energy factor, tank volume, and unit count."
        }
        Domain::Orientation => unreachable!("orientation has dedicated pass prompts"),
    }
}

/// Literal output schema fragments embedded per domain.
fn domain_schema(domain: Domain) -> &'static str {
    match domain {
        Domain::Project => {
            r#"{
  "project": {
    "title": <string|null>, "address": <string|null>, "city": <string|null>,
    "climate_zone": <integer 1-16|null>, "fuel_type": "electric"|"gas"|"mixed"|null,
    "house_type": <string|null>, "dwelling_units": <integer|null>,
    "stories": <integer|null>, "bedrooms": <integer|null>,
    "front_orientation": null, "orientation_confidence": null,
    "flags": {"new_construction": <bool|null>, "addition": <bool|null>, "alteration": <bool|null>}
  },
  "envelope": {
    "conditioned_floor_area": <number|null>, "window_area": <number|null>,
    "window_to_floor_ratio": <number|null>, "exterior_wall_area": <number|null>,
    "door_area": <number|null>, "roof_ceiling_area": <number|null>,
    "avg_ceiling_height": <number|null>
  }
}"#
        }
        Domain::Zones => {
            r#"{
  "zones": [{"name": <string>, "zone_type": <string|null>, "floor_area": <number|null>, "volume": <number|null>}],
  "walls": [{"name": <string>, "zone": <string|null>, "azimuth": <number|null>,
             "gross_area": <number|null>, "net_area": <number|null>,
             "construction": <string|null>, "tilt_degrees": <number|null>}]
}"#
        }
        Domain::Windows => {
            r#"{
  "windows": [{"name": <string>, "wall": <string|null>, "height": <number|null>,
               "width": <number|null>, "multiplier": <integer|null>, "area": <number|null>,
               "u_factor": <number|null>, "shgc": <number|null>, "overhang_depth": <number|null>}]
}"#
        }
        Domain::Hvac => {
            r#"{
  "hvac_systems": [{"name": <string>, "system_type": <string|null>,
                    "heating": <object|null>, "cooling": <object|null>, "distribution": <object|null>}]
}"#
        }
        Domain::Dhw => {
            r#"{
  "water_heating_systems": [{"name": <string>, "system_type": <string|null>, "heaters": [<object>]}]
}"#
        }
        Domain::Orientation => unreachable!("orientation has dedicated pass prompts"),
    }
}

/// Build a full extractor prompt for one domain.
pub fn extractor_prompt(
    domain: Domain,
    instruction_doc: &Path,
    map: &DocumentMap,
    routed: &RoutedPages,
    page_paths: &[std::path::PathBuf],
) -> String {
    let mut prompt = String::with_capacity(4096);
    writeln!(
        prompt,
        "You are the {domain} extraction worker for a Title 24 plan-set pipeline."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "{}", domain_preamble(domain)).unwrap();
    writeln!(prompt).unwrap();
    writeln!(
        prompt,
        "Follow the current extraction instructions in `{}` (relative to your \
         working directory). They override anything else in this prompt.",
        instruction_doc.display()
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Document map").unwrap();
    writeln!(
        prompt,
        "The plan set has {} pages: {} schedule, {} compliance, {} drawing.",
        map.total_pages,
        map.schedule_pages().len(),
        map.compliance_pages().len(),
        map.drawing_pages().len()
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Assigned pages").unwrap();
    for &page in &routed.pages {
        if let Some(path) = page_paths.get(page - 1) {
            writeln!(prompt, "- page {page}: {}", path.display()).unwrap();
        }
    }
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Output schema").unwrap();
    writeln!(prompt).unwrap();
    writeln!(
        prompt,
        "Return a single JSON object and nothing else. Use explicit null for \
         anything the pages do not show; never omit a key, never guess."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "{}", domain_schema(domain)).unwrap();
    prompt
}

/// Prompt for orientation pass 1: north arrow plus entry direction.
pub fn orientation_pass1_prompt(page_paths: &[std::path::PathBuf]) -> String {
    orientation_prompt(
        "Estimate the drawn north-arrow angle on the site plan, then the direction the \
         building front faces on the page. Compute (front_drawing_angle - north_arrow_angle) \
         mod 360.",
        page_paths,
    )
}

/// Prompt for orientation pass 2: entry elevation plus wall normal.
pub fn orientation_pass2_prompt(page_paths: &[std::path::PathBuf]) -> String {
    orientation_prompt(
        "Identify the entry elevation, locate the entry wall on the site plan, and measure \
         its outward normal on the page. Compute (front_drawing_angle - north_arrow_angle) \
         mod 360 with the normal as the front drawing angle.",
        page_paths,
    )
}

fn orientation_prompt(method: &str, page_paths: &[std::path::PathBuf]) -> String {
    let mut prompt = String::with_capacity(2048);
    writeln!(
        prompt,
        "You are an orientation worker for a Title 24 plan-set pipeline. Determine the \
         building's front azimuth in degrees clockwise from true north, [0, 360)."
    )
    .unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Method").unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "{method}").unwrap();
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Pages").unwrap();
    for (index, path) in page_paths.iter().enumerate() {
        writeln!(prompt, "- page {}: {}", index + 1, path.display()).unwrap();
    }
    writeln!(prompt).unwrap();
    writeln!(prompt, "## Output schema").unwrap();
    writeln!(prompt).unwrap();
    writeln!(
        prompt,
        r#"{{
  "front_orientation": <number in [0, 360)>,
  "confidence": "high" | "medium" | "low",
  "intermediate": {{
    "north_arrow_angle": <number|null>,
    "front_drawing_angle": <number|null>,
    "formula": <string|null>
  }}
}}"#
    )
    .unwrap();
    prompt
}

/// Build the discovery prompt with the page manifest appended.
pub fn discovery_prompt(page_paths: &[std::path::PathBuf]) -> String {
    let mut prompt = String::with_capacity(2048);
    prompt.push_str(DISCOVERY_PROMPT);
    prompt.push_str("\n## Pages\n\n");
    for (index, path) in page_paths.iter().enumerate() {
        writeln!(prompt, "- page {}: {}", index + 1, path.display()).unwrap();
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use planlift_core::types::building::Confidence;
    use planlift_core::types::document::{PageInfo, PageType};
    use std::path::PathBuf;

    #[test]
    fn extractor_prompt_lists_only_routed_pages() {
        let map = DocumentMap {
            total_pages: 3,
            pages: vec![
                PageInfo {
                    page: 1,
                    page_type: PageType::Schedule,
                    confidence: Confidence::High,
                    description: None,
                },
                PageInfo {
                    page: 2,
                    page_type: PageType::Drawing,
                    confidence: Confidence::High,
                    description: None,
                },
                PageInfo {
                    page: 3,
                    page_type: PageType::Compliance,
                    confidence: Confidence::High,
                    description: None,
                },
            ],
        };
        let paths: Vec<PathBuf> = (1..=3).map(|n| PathBuf::from(format!("page-{n:03}.png"))).collect();
        let routed = crate::router::route(Domain::Project, &map);
        let prompt = extractor_prompt(
            Domain::Project,
            Path::new("instructions/project-extractor/instructions.md"),
            &map,
            &routed,
            &paths,
        );
        assert!(prompt.contains("page-001.png"));
        assert!(prompt.contains("page-003.png"));
        assert!(!prompt.contains("page-002.png"));
        assert!(prompt.contains("instructions/project-extractor/instructions.md"));
    }
}
