//! Tier resolution from cumulative spend.
//!
//! Everything here is pure: callers pass the active tier set in, nothing is
//! fetched. Both the single-customer path ([`super::CustomerService`]) and the
//! bulk path ([`super::TierSyncService`]) go through these functions so that
//! tier choice and tier level can never disagree between them.

use std::cmp::Reverse;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Tier, TierKind, UNATTAINABLE_SPEND};

/// Outcome of re-evaluating a customer's tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment<'a> {
    /// Spend-based resolution applies.
    Resolved(&'a Tier),
    /// The customer holds a manually assigned tier that resolution must not touch.
    ManualOverride(&'a Tier),
}

impl<'a> Assignment<'a> {
    pub fn tier(&self) -> &'a Tier {
        match self {
            Assignment::Resolved(t) | Assignment::ManualOverride(t) => t,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self, Assignment::ManualOverride(_))
    }
}

/// Threshold tiers in ascending rank order.
///
/// Ties on `min_spend` are ordered so the lexicographically smaller id ranks
/// higher, which makes it the one a downward scan reaches first.
fn ladder(tiers: &[Tier]) -> Vec<(&Tier, Decimal)> {
    let mut ladder: Vec<(&Tier, Decimal)> = tiers
        .iter()
        .filter_map(|t| t.min_spend().map(|min| (t, min)))
        .collect();
    ladder.sort_by_key(|(t, min)| (*min, Reverse(t.id)));
    ladder
}

/// Checks that a tier set can be used for resolution.
///
/// Bands are `[min_spend, max_spend)`. A bounded tier must end exactly where
/// the next higher threshold starts, and the top tier must be unbounded.
pub fn validate_tiers(tiers: &[Tier]) -> AppResult<()> {
    let manual_only = tiers.iter().filter(|t| t.is_manual_only()).count();
    if manual_only > 1 {
        return Err(AppError::Configuration(format!(
            "At most one invite-only tier is allowed, found {manual_only}"
        )));
    }

    for tier in tiers {
        if let TierKind::Threshold {
            min_spend,
            max_spend,
        } = tier.kind
        {
            if min_spend < Decimal::ZERO {
                return Err(AppError::Configuration(format!(
                    "Tier {} has a negative min_spend",
                    tier.name
                )));
            }
            if min_spend >= UNATTAINABLE_SPEND {
                return Err(AppError::Configuration(format!(
                    "Tier {} uses the legacy invite-only spend {min_spend}; make it manual_only",
                    tier.name
                )));
            }
            if max_spend.is_some_and(|max| max <= min_spend) {
                return Err(AppError::Configuration(format!(
                    "Tier {} has max_spend not above min_spend",
                    tier.name
                )));
            }
        }
    }

    let ladder = ladder(tiers);
    if !ladder.iter().any(|(_, min)| min.is_zero()) {
        return Err(AppError::Configuration(
            "No floor tier with min_spend 0 is configured".into(),
        ));
    }

    for (tier, min) in &ladder {
        let TierKind::Threshold {
            max_spend: Some(max),
            ..
        } = tier.kind
        else {
            continue;
        };
        let next = ladder.iter().find(|(_, m)| m > min);
        match next {
            None => {
                return Err(AppError::Configuration(format!(
                    "Top tier {} must not have a max_spend (got {max})",
                    tier.name
                )));
            }
            Some((upper, upper_min)) if max > *upper_min => {
                return Err(AppError::Configuration(format!(
                    "Tier {} (up to {max}) overlaps tier {} (from {upper_min})",
                    tier.name, upper.name
                )));
            }
            Some((upper, upper_min)) if max < *upper_min => {
                return Err(AppError::Configuration(format!(
                    "Spend from {max} to {upper_min} falls between tier {} and tier {}",
                    tier.name, upper.name
                )));
            }
            Some(_) => {}
        }
    }

    Ok(())
}

/// Logs a data-integrity warning for every pair of tiers sharing a
/// `min_spend`, and returns how many such pairs there are.
///
/// Resolution still works on such sets: the smaller id wins.
pub fn warn_duplicate_thresholds(tiers: &[Tier]) -> usize {
    let ladder = ladder(tiers);
    let mut duplicates = 0;
    for pair in ladder.windows(2) {
        let (lower, lower_min) = pair[0];
        let (upper, upper_min) = pair[1];
        if lower_min == upper_min {
            duplicates += 1;
            log::warn!(
                "Tiers {} ({}) and {} ({}) share min_spend {lower_min}; resolution prefers {}",
                lower.name,
                lower.id,
                upper.name,
                upper.id,
                upper.name
            );
        }
    }
    duplicates
}

/// Returns the tier `total_spend` qualifies for.
///
/// `tiers` must be the active tier set. Invite-only tiers are never returned.
pub fn resolve_tier(tiers: &[Tier], total_spend: Decimal) -> AppResult<&Tier> {
    if total_spend < Decimal::ZERO {
        return Err(AppError::Validation(format!(
            "Spend must be non-negative, got {total_spend}"
        )));
    }
    validate_tiers(tiers)?;

    ladder(tiers)
        .into_iter()
        .rev()
        .find(|(_, min)| *min <= total_spend)
        .map(|(tier, _)| tier)
        .ok_or_else(|| {
            AppError::Configuration("No floor tier with min_spend 0 is configured".into())
        })
}

/// 1-based rank of a tier among the threshold tiers of `tiers`.
///
/// An invite-only tier ranks one above the highest threshold tier.
pub fn tier_level(tiers: &[Tier], tier_id: Uuid) -> Option<u32> {
    let ladder = ladder(tiers);
    let tier = tiers.iter().find(|t| t.id == tier_id)?;
    if tier.is_manual_only() {
        return Some(ladder.len() as u32 + 1);
    }
    ladder
        .iter()
        .position(|(t, _)| t.id == tier_id)
        .map(|idx| idx as u32 + 1)
}

/// Decides which tier a customer should hold, honouring manual assignments.
///
/// A customer whose current tier is invite-only, or was pinned by an
/// administrator, keeps it even when spend would select a different tier.
/// A pinned tier that is no longer in `tiers` is dropped in favour of
/// spend-based resolution.
pub fn apply_resolution(
    tiers: &[Tier],
    current_tier_id: Option<Uuid>,
    tier_manual: bool,
    total_spend: Decimal,
) -> AppResult<Assignment<'_>> {
    let resolved = resolve_tier(tiers, total_spend)?;

    if let Some(current_id) = current_tier_id {
        match tiers.iter().find(|t| t.id == current_id) {
            Some(current) if current.is_manual_only() || tier_manual => {
                if current.id != resolved.id {
                    log::debug!(
                        "Keeping manually assigned tier {} over resolved tier {}",
                        current.name,
                        resolved.name
                    );
                }
                return Ok(Assignment::ManualOverride(current));
            }
            None if tier_manual => {
                log::warn!(
                    "Manually assigned tier {current_id} is not active; falling back to {}",
                    resolved.name
                );
            }
            _ => {}
        }
    }

    Ok(Assignment::Resolved(resolved))
}
