//! Bucket quota planning.
//!
//! Quotas are proportional to each bucket's score mass, bounded below by the
//! diversity floor and above by the number of eligible candidates (and any
//! configured override cap). The real-valued shares come from solving
//! `Σ clamp(λ·mass_i, lower_i, capacity_i) = target` for `λ`; they are turned
//! into integers with the largest-remainder method, ties going to the bucket
//! declared first.

use serde::Serialize;

/// What one bucket brings to the allocation
#[derive(Debug, Clone, PartialEq)]
pub struct BucketDemand {
    pub name: String,
    /// Aggregate score mass (sum of the bucket's top-K scores)
    pub mass: f64,
    /// Number of eligible candidates in the bucket
    pub eligible: usize,
    /// Optional override ceiling for this bucket's quota
    pub cap: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketQuota {
    pub bucket: String,
    pub quota: usize,
    pub eligible: usize,
    /// Guaranteed minimum this bucket was planned with
    pub guaranteed: usize,
}

/// Slot quotas per bucket, in bucket priority order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationPlan {
    pub requested_size: usize,
    pub target_size: usize,
    pub floor_quota: usize,
    pub quotas: Vec<BucketQuota>,
}

impl AllocationPlan {
    pub fn quota(&self, bucket: &str) -> usize {
        self.quotas
            .iter()
            .find(|entry| entry.bucket == bucket)
            .map_or(0, |entry| entry.quota)
    }

    pub fn total(&self) -> usize {
        self.quotas.iter().map(|entry| entry.quota).sum()
    }
}

pub struct AllocationPlanner;

impl AllocationPlanner {
    /// Sum of the `top_k` highest scores; `scores` must be ranked descending
    pub fn bucket_mass(ranked_scores: &[f64], top_k: usize) -> f64 {
        ranked_scores
            .iter()
            .take(top_k)
            .filter(|score| score.is_finite() && **score > 0.0)
            .sum()
    }

    /// Build the plan for `playlist_size` slots; `demands` are in priority order
    pub fn plan(demands: &[BucketDemand], playlist_size: usize, floor_quota: usize) -> AllocationPlan {
        let weights: Vec<f64> = demands.iter().map(|demand| demand.mass).collect();
        let capacities: Vec<usize> = demands
            .iter()
            .map(|demand| demand.cap.map_or(demand.eligible, |cap| cap.min(demand.eligible)))
            .collect();

        let (lower, quotas) = Self::apportion_with_bounds(&weights, &capacities, floor_quota, playlist_size);
        let target_size = quotas.iter().sum();

        AllocationPlan {
            requested_size: playlist_size,
            target_size,
            floor_quota,
            quotas: demands
                .iter()
                .zip(quotas)
                .zip(lower)
                .map(|((demand, quota), guaranteed)| BucketQuota {
                    bucket: demand.name.clone(),
                    quota,
                    eligible: demand.eligible,
                    guaranteed,
                })
                .collect(),
        }
    }

    /// Integer quotas for `size` slots given proportional `weights`, a per-bucket
    /// `floor` and per-bucket `capacities`. Buckets are in priority order.
    pub fn apportion(weights: &[f64], capacities: &[usize], floor: usize, size: usize) -> Vec<usize> {
        Self::apportion_with_bounds(weights, capacities, floor, size).1
    }

    fn apportion_with_bounds(
        weights: &[f64],
        capacities: &[usize],
        floor: usize,
        size: usize,
    ) -> (Vec<usize>, Vec<usize>) {
        debug_assert_eq!(weights.len(), capacities.len());
        let count = capacities.len();
        let target = size.min(capacities.iter().sum());
        if target == 0 {
            return (vec![0; count], vec![0; count]);
        }

        // floors are granted in priority order when they cannot all fit
        let mut lower = vec![0usize; count];
        let mut budget = target;
        for (bound, &capacity) in lower.iter_mut().zip(capacities) {
            let granted = floor.min(capacity).min(budget);
            *bound = granted;
            budget -= granted;
        }

        let mut effective: Vec<f64> = weights
            .iter()
            .zip(capacities)
            .map(|(&weight, &capacity)| {
                if capacity > 0 && weight.is_finite() && weight > 0.0 {
                    weight
                } else {
                    0.0
                }
            })
            .collect();
        if effective.iter().all(|&weight| weight == 0.0) {
            effective = capacities.iter().map(|&capacity| capacity as f64).collect();
        }

        let lambda = Self::solve_scale(&effective, &lower, capacities, target);
        let shares: Vec<f64> = (0..count)
            .map(|i| (lambda * effective[i]).clamp(lower[i] as f64, capacities[i] as f64))
            .collect();

        let mut quotas: Vec<usize> = (0..count)
            .map(|i| (shares[i].floor() as usize).clamp(lower[i], capacities[i]))
            .collect();
        let mut assigned: usize = quotas.iter().sum();

        // largest remainder first, earlier bucket on ties
        let mut by_remainder: Vec<usize> = (0..count).collect();
        by_remainder.sort_by(|&a, &b| {
            let remainder_a = shares[a] - shares[a].floor();
            let remainder_b = shares[b] - shares[b].floor();
            remainder_b.total_cmp(&remainder_a).then(a.cmp(&b))
        });
        for &i in &by_remainder {
            if assigned == target {
                break;
            }
            if quotas[i] < capacities[i] {
                quotas[i] += 1;
                assigned += 1;
            }
        }

        // whatever is left belongs to zero-weight buckets with spare capacity
        for i in 0..count {
            while assigned < target && quotas[i] < capacities[i] {
                quotas[i] += 1;
                assigned += 1;
            }
        }

        debug_assert_eq!(assigned, target);
        (lower, quotas)
    }

    /// Smallest `λ` with `Σ clamp(λ·w_i, lower_i, cap_i) ≥ target`. The sum is
    /// piecewise linear in `λ`, so the root is found exactly between breakpoints.
    fn solve_scale(weights: &[f64], lower: &[usize], capacities: &[usize], target: usize) -> f64 {
        let target = target as f64;
        let total_at = |lambda: f64| -> f64 {
            weights
                .iter()
                .zip(lower.iter().zip(capacities))
                .map(|(&weight, (&lo, &hi))| (lambda * weight).clamp(lo as f64, hi as f64))
                .sum()
        };

        let mut breakpoints: Vec<f64> = weights
            .iter()
            .zip(lower.iter().zip(capacities))
            .filter(|(weight, _)| **weight > 0.0)
            .flat_map(|(&weight, (&lo, &hi))| [lo as f64 / weight, hi as f64 / weight])
            .collect();
        breakpoints.sort_by(f64::total_cmp);
        breakpoints.dedup();

        let mut previous = 0.0;
        let mut previous_total = total_at(0.0);
        if previous_total >= target {
            return 0.0;
        }

        for point in breakpoints {
            let total = total_at(point);
            if total >= target {
                if total <= previous_total {
                    return point;
                }
                return previous + (target - previous_total) * (point - previous) / (total - previous_total);
            }
            previous = point;
            previous_total = total;
        }
        previous
    }
}
