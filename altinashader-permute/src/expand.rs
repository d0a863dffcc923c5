use crate::error::ExpandError;
use crate::layout::{DimensionDomain, DimensionKind, PermutationLayout, PermutationValues};

/// Default bound on the number of expanded permutations.
pub const DEFAULT_EXPANSION_CAP: usize = 1024;

/// Enumerates the cross product of every multi-attributed dimension's full
/// value domain, holding feature dimensions at their defaults.
///
/// Enumeration is lexicographic in declaration order: the first declared
/// multi dimension varies slowest. Exceeding `cap` is an error rather than
/// a truncation so runaway combinatorics surface immediately.
pub fn expand_multi_values(
    layout: &PermutationLayout,
    cap: usize,
) -> Result<Vec<PermutationValues>, ExpandError> {
    if cap == 0 {
        return Err(ExpandError::CapExceeded(0));
    }

    let mut out = vec![layout.default_values()];
    for (dim_index, dim) in layout.dimensions.iter().enumerate() {
        if dim.domain == DimensionDomain::Feature {
            continue;
        }
        // A domain longer than the cap always overflows it, so there is no
        // point materializing more than cap + 1 values of a huge int range.
        let allowed: Vec<i64> = match &dim.kind {
            DimensionKind::Bool => vec![0, 1],
            DimensionKind::Enum(values) => values.clone(),
            DimensionKind::Int { min, max } => {
                (*min..=*max).take(cap.saturating_add(1)).collect()
            }
        };
        if allowed.is_empty() {
            return Err(ExpandError::EmptyDomain(dim.name.clone()));
        }

        let hint = out.len().saturating_mul(allowed.len());
        let mut expanded = Vec::with_capacity(hint.min(cap));
        for entry in &out {
            for &value in &allowed {
                if expanded.len() == cap {
                    return Err(ExpandError::CapExceeded(cap));
                }
                let mut copy = entry.clone();
                copy.set(dim_index, value);
                expanded.push(copy);
            }
        }
        out = expanded;
    }
    Ok(out)
}
