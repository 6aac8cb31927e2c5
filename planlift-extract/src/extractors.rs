//! Domain extractor definitions: worker names, instruction documents,
//! and fragment parsing with validation.

use std::path::PathBuf;

use planlift_core::errors::WorkerError;
use planlift_core::types::fragments::{
    DhwFragment, Domain, Fragment, HvacFragment, ProjectFragment, WindowsFragment, ZonesFragment,
};

/// Worker identifier for one extraction domain.
pub fn worker_name(domain: Domain) -> &'static str {
    match domain {
        Domain::Project => "project-extractor",
        Domain::Zones => "zones-extractor",
        Domain::Windows => "windows-extractor",
        Domain::Hvac => "hvac-extractor",
        Domain::Dhw => "dhw-extractor",
        Domain::Orientation => "orientation",
    }
}

/// Instruction document for one domain, relative to the repository root.
pub fn instruction_doc(domain: Domain) -> PathBuf {
    PathBuf::from("instructions")
        .join(worker_name(domain))
        .join("instructions.md")
}

/// Deserialise and validate one extractor's JSON into its fragment.
///
/// Validation failures are schema errors and therefore transient: the
/// orchestrator retries once, then marks the domain failed.
pub fn parse_fragment(domain: Domain, value: serde_json::Value) -> Result<Fragment, WorkerError> {
    let worker = worker_name(domain);
    let fragment = match domain {
        Domain::Project => {
            let fragment: ProjectFragment = from_value(worker, value)?;
            Fragment::Project(fragment)
        }
        Domain::Zones => {
            let fragment: ZonesFragment = from_value(worker, value)?;
            require_names(worker, "zones", fragment.zones.iter().map(|z| &z.name))?;
            require_names(worker, "walls", fragment.walls.iter().map(|w| &w.name))?;
            Fragment::Zones(fragment)
        }
        Domain::Windows => {
            let fragment: WindowsFragment = from_value(worker, value)?;
            require_names(worker, "windows", fragment.windows.iter().map(|w| &w.name))?;
            Fragment::Windows(fragment)
        }
        Domain::Hvac => {
            let fragment: HvacFragment = from_value(worker, value)?;
            require_names(
                worker,
                "hvac_systems",
                fragment.hvac_systems.iter().map(|h| &h.name),
            )?;
            Fragment::Hvac(fragment)
        }
        Domain::Dhw => {
            let fragment: DhwFragment = from_value(worker, value)?;
            require_names(
                worker,
                "water_heating_systems",
                fragment.water_heating_systems.iter().map(|w| &w.name),
            )?;
            Fragment::Dhw(fragment)
        }
        Domain::Orientation => {
            return Err(WorkerError::FragmentInvalid {
                worker: worker.to_string(),
                message: "orientation is not a fragment domain".to_string(),
            })
        }
    };
    Ok(fragment)
}

fn from_value<T: serde::de::DeserializeOwned>(
    worker: &str,
    value: serde_json::Value,
) -> Result<T, WorkerError> {
    serde_json::from_value(value).map_err(|e| WorkerError::FragmentInvalid {
        worker: worker.to_string(),
        message: e.to_string(),
    })
}

/// Every list item must carry a non-empty name; the merge keys on it.
fn require_names<'a>(
    worker: &str,
    list: &str,
    names: impl Iterator<Item = &'a String>,
) -> Result<(), WorkerError> {
    for (index, name) in names.enumerate() {
        if name.trim().is_empty() {
            return Err(WorkerError::FragmentInvalid {
                worker: worker.to_string(),
                message: format!("{list}[{index}] has an empty name"),
            });
        }
    }
    Ok(())
}
