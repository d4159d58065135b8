//! Proportional split of per-cycle search limits across servers.

use crate::detection::DetectionResults;

use super::{SearchCategory, SearchLimits};

/// Items picked for one server in one cycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerAllocation {
    /// Index into `DetectionResults::results`.
    pub server_index: usize,
    pub missing: Vec<i64>,
    pub cutoff: Vec<i64>,
}

impl ServerAllocation {
    pub fn ids(&self, category: SearchCategory) -> &[i64] {
        match category {
            SearchCategory::Missing => &self.missing,
            SearchCategory::Cutoff => &self.cutoff,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.cutoff.is_empty()
    }

    pub fn len(&self) -> usize {
        self.missing.len() + self.cutoff.len()
    }
}

/// Split `limit` across `counts` with the largest-remainder method.
///
/// The result sums to `min(limit, sum(counts))` and never exceeds a count.
/// When there is at least one unit per participant, every participant gets
/// at least one.
pub fn largest_remainder(counts: &[usize], limit: usize) -> Vec<usize> {
    let total: usize = counts.iter().sum();
    if total == 0 || limit == 0 {
        return vec![0; counts.len()];
    }
    if limit >= total {
        return counts.to_vec();
    }

    let n = counts.len();
    let limit_wide = limit as u128;
    let total_wide = total as u128;

    let mut alloc = Vec::with_capacity(n);
    let mut remainders = Vec::with_capacity(n);
    for &count in counts {
        let scaled = limit_wide * count as u128;
        alloc.push((scaled / total_wide) as usize);
        remainders.push(scaled % total_wide);
    }

    let mut raised = vec![false; n];
    if limit >= n {
        for i in 0..n {
            if alloc[i] == 0 && counts[i] > 0 {
                alloc[i] = 1;
                raised[i] = true;
            }
        }
    }

    let assigned: usize = alloc.iter().sum();
    if assigned < limit {
        let mut order: Vec<usize> = (0..n).filter(|&i| !raised[i]).collect();
        // Stable sort keeps first-encountered order on equal remainders.
        order.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]));
        for &i in order.iter().take(limit - assigned) {
            alloc[i] += 1;
        }
    } else if assigned > limit {
        let mut excess = assigned - limit;
        while excess > 0 {
            let mut pick: Option<usize> = None;
            for i in 0..n {
                if alloc[i] <= 1 {
                    continue;
                }
                pick = match pick {
                    None => Some(i),
                    Some(p) if alloc[i] > alloc[p] => Some(i),
                    Some(p) if alloc[i] == alloc[p] && counts[i] <= counts[p] => Some(i),
                    keep => keep,
                };
            }
            match pick {
                Some(i) => {
                    alloc[i] -= 1;
                    excess -= 1;
                }
                None => break,
            }
        }
    }

    for (a, &count) in alloc.iter_mut().zip(counts) {
        *a = (*a).min(count);
    }
    alloc
}

/// Plan which ids each successful server searches this cycle.
///
/// Per category the pooled limit (movies plus episodes) is split across
/// servers whose family has a non-zero sub-limit for that category. Each
/// server contributes its first N ids in detection order. Servers with
/// nothing allocated are left out.
pub fn plan_allocations(
    detection: &DetectionResults,
    limits: &SearchLimits,
) -> Vec<ServerAllocation> {
    let mut plan: Vec<ServerAllocation> = detection
        .results
        .iter()
        .enumerate()
        .map(|(server_index, _)| ServerAllocation {
            server_index,
            ..Default::default()
        })
        .collect();

    for category in SearchCategory::ALL {
        let limit = limits.for_category(category) as usize;
        if limit == 0 {
            continue;
        }

        let participants: Vec<usize> = detection
            .results
            .iter()
            .enumerate()
            .filter(|(_, r)| {
                r.is_success()
                    && !r.ids(category).is_empty()
                    && limits.sub_limit(category, r.server.kind.media_kind()) > 0
            })
            .map(|(i, _)| i)
            .collect();
        if participants.is_empty() {
            continue;
        }

        let counts: Vec<usize> = participants
            .iter()
            .map(|&i| detection.results[i].ids(category).len())
            .collect();
        let shares = largest_remainder(&counts, limit);

        for (&i, &share) in participants.iter().zip(&shares) {
            let ids = detection.results[i].ids(category)[..share].to_vec();
            match category {
                SearchCategory::Missing => plan[i].missing = ids,
                SearchCategory::Cutoff => plan[i].cutoff = ids,
            }
        }
    }

    plan.retain(|a| !a.is_empty());
    plan
}
