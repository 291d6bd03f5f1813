//! Image rendition selection

use crate::model::Rendition;

/// Picks the rendition maximizing width x height
///
/// Ties resolve to the first-encountered candidate, so selection is stable
/// for a given server response. Returns `None` for an empty candidate list,
/// which callers report as a per-child classification error.
pub fn select_best(candidates: &[Rendition]) -> Option<&Rendition> {
    let mut best: Option<(&Rendition, u64)> = None;
    for candidate in candidates {
        let area = u64::from(candidate.width) * u64::from(candidate.height);
        match best {
            Some((_, best_area)) if best_area >= area => {}
            _ => best = Some((candidate, area)),
        }
    }
    best.map(|(rendition, _)| rendition)
}
