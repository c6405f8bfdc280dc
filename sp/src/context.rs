//! Context assembly
//!
//! Builds the bounded context block that goes into each prompt: ranked
//! chunks first, in the order the store returned them, then prior task
//! outputs in execution order.

use contextstore::RankedChunk;
use tracing::debug;

use crate::domain::PriorOutput;

/// Separator placed between context units
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Concatenate context units without exceeding `char_budget` characters
///
/// Stops at the first unit that would not fit; that unit and everything
/// after it are dropped.
pub fn assemble(ranked: &[RankedChunk], prior: &[PriorOutput], char_budget: usize) -> String {
    debug!(ranked = %ranked.len(), prior = %prior.len(), %char_budget, "assemble: called");
    let separator_len = CONTEXT_SEPARATOR.chars().count();

    let units = ranked
        .iter()
        .map(|c| c.text.clone())
        .chain(prior.iter().map(PriorOutput::render));

    let mut out = String::new();
    let mut used = 0;
    let mut included = 0;

    for unit in units {
        let unit_len = unit.chars().count();
        let needed = if included == 0 { unit_len } else { separator_len + unit_len };
        if used + needed > char_budget {
            debug!(%included, %used, "assemble: budget reached, dropping remaining units");
            break;
        }
        if included > 0 {
            out.push_str(CONTEXT_SEPARATOR);
        }
        out.push_str(&unit);
        used += needed;
        included += 1;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ranked(texts: &[&str]) -> Vec<RankedChunk> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| RankedChunk {
                chunk_id: format!("{:04}", i + 1),
                source: "spec.md".to_string(),
                text: t.to_string(),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect()
    }

    #[test]
    fn test_chunks_then_prior_outputs() {
        let prior = vec![PriorOutput::new("1", "Scope done")];
        let out = assemble(&ranked(&["alpha", "beta"]), &prior, 1000);
        assert_eq!(out, "alpha\n\n---\n\nbeta\n\n---\n\n[Task 1]\nScope done");
    }

    #[test]
    fn test_stops_at_first_unit_that_does_not_fit() {
        // "aaaa" (4) + sep (7) + "bbbb" (4) = 15; a third unit does not fit in 20
        let out = assemble(&ranked(&["aaaa", "bbbb", "cccc", "d"]), &[], 20);
        assert_eq!(out, "aaaa\n\n---\n\nbbbb");
    }

    #[test]
    fn test_exact_budget_fits() {
        let out = assemble(&ranked(&["aaaa", "bbbb"]), &[], 15);
        assert_eq!(out.chars().count(), 15);
    }

    #[test]
    fn test_oversized_first_unit_yields_empty() {
        assert_eq!(assemble(&ranked(&["too long for budget"]), &[], 5), "");
        assert_eq!(assemble(&[], &[], 100), "");
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_budget(
            chunks in prop::collection::vec("\\PC{0,60}", 0..8),
            outputs in prop::collection::vec("\\PC{0,80}", 0..5),
            budget in 0usize..400,
        ) {
            let refs: Vec<&str> = chunks.iter().map(String::as_str).collect();
            let prior: Vec<PriorOutput> = outputs
                .iter()
                .enumerate()
                .map(|(i, c)| PriorOutput::new(i.to_string(), c.clone()))
                .collect();
            let out = assemble(&ranked(&refs), &prior, budget);
            prop_assert!(out.chars().count() <= budget);
        }
    }
}
