//! First-preference and two-candidate swings, at booth and seat level.
//!
//! A swing is `None` whenever there is no valid prior figure to compare with.
//! It is never defaulted to zero.

use std::collections::BTreeMap;

use crate::config::*;

// Bounds applied before the logit transform, to keep it finite.
const MIN_TRANSFORM_PERCENT: f64 = 0.001;
const MAX_TRANSFORM_PERCENT: f64 = 99.999;

// Makes the transform's slope 1 at 50%.
const TRANSFORM_SCALE: f64 = 25.0;

/// Derived first preference figures for one candidate.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct FpSwing {
    pub percent: f64,
    pub swing: Option<f64>,
    pub transformed_swing: Option<f64>,
}

/// Derived two-candidate figures for one affiliation.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct TcpSwing {
    pub percent: f64,
    pub swing: Option<f64>,
}

pub fn percent(part: u64, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(part as f64 * 100.0 / total as f64)
    }
}

/// Logit transform, scaled to behave like a percentage near 50%.
pub fn transform_percent(p: f64) -> f64 {
    let p = p.clamp(MIN_TRANSFORM_PERCENT, MAX_TRANSFORM_PERCENT);
    (p / (100.0 - p)).ln() * TRANSFORM_SCALE
}

/// Swing measured on the transformed scale, capped in absolute value at
/// `cap_multiplier` times the raw swing.
pub fn capped_transformed_swing(previous: f64, current: f64, cap_multiplier: f64) -> f64 {
    let cap = cap_multiplier.max(0.0) * (current - previous).abs();
    let transformed = transform_percent(current) - transform_percent(previous);
    if transformed.abs() > cap {
        cap.copysign(transformed)
    } else {
        transformed
    }
}

/// Weighted average of the defined values. `None` if no value is defined or
/// all of their weights are zero.
pub fn weighted_average<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = (f64, Option<f64>)>,
{
    let mut total_weight = 0.0;
    let mut sum = 0.0;
    for (weight, value) in values {
        if let Some(v) = value {
            total_weight += weight;
            sum += weight * v;
        }
    }
    if total_weight > 0.0 {
        Some(sum / total_weight)
    } else {
        None
    }
}

/// First preference figures for every candidate of a booth.
///
/// `candidate_matches` maps current candidates onto the previous seat's
/// candidates.
pub fn booth_fp_swings(
    booth: &Booth,
    previous_booth: Option<&Booth>,
    candidate_matches: &BTreeMap<i32, Option<i32>>,
    cap_multiplier: f64,
) -> BTreeMap<i32, FpSwing> {
    let total = booth.fp_total();
    let previous_total = previous_booth.map(|b| b.fp_total()).unwrap_or(0);
    let mut res = BTreeMap::new();
    for (&cid, &votes) in booth.fp_votes.iter() {
        let current_pct = match percent(votes, total) {
            Some(p) => p,
            None => continue,
        };
        let previous_pct = previous_booth.and_then(|pb| {
            let pcid = candidate_matches.get(&cid).copied().flatten()?;
            let pvotes = *pb.fp_votes.get(&pcid)?;
            percent(pvotes, previous_total)
        });
        res.insert(
            cid,
            FpSwing {
                percent: current_pct,
                swing: previous_pct.map(|p| current_pct - p),
                transformed_swing: previous_pct
                    .map(|p| capped_transformed_swing(p, current_pct, cap_multiplier)),
            },
        );
    }
    res
}

/// Two-candidate figures for every affiliation of a booth.
///
/// The swing is only defined when both booths report exactly the two matched
/// affiliations with non-zero totals.
pub fn booth_tcp_swings(
    booth: &Booth,
    previous_booth: Option<&Booth>,
    matched_parties: &[(i32, i32)],
) -> BTreeMap<i32, TcpSwing> {
    let total = booth.tcp_total();
    let comparable = previous_booth.filter(|pb| {
        matched_parties.len() == 2
            && booth.tcp_votes.len() == 2
            && pb.tcp_votes.len() == 2
            && pb.tcp_total() > 0
            && matched_parties
                .iter()
                .all(|(c, p)| booth.tcp_votes.contains_key(c) && pb.tcp_votes.contains_key(p))
    });
    let mut res = BTreeMap::new();
    for (&aff, &votes) in booth.tcp_votes.iter() {
        let current_pct = match percent(votes, total) {
            Some(p) => p,
            None => continue,
        };
        let swing = comparable.and_then(|pb| {
            let (_, p) = matched_parties.iter().find(|(c, _)| *c == aff)?;
            percent(pb.tcp_votes[p], pb.tcp_total()).map(|prev| current_pct - prev)
        });
        res.insert(
            aff,
            TcpSwing {
                percent: current_pct,
                swing,
            },
        );
    }
    res
}

/// Seat level first preference figures.
///
/// The percentage covers every vote counted so far. The swing is the average
/// of the booth swings weighted by the booth's current vote, and the
/// transformed swing is taken from the previous seat percentage.
pub fn seat_fp_swings<'b>(
    seat: &Seat,
    previous_seat: Option<&Seat>,
    booths: impl Iterator<Item = (u64, &'b BTreeMap<i32, FpSwing>)> + Clone,
    candidate_matches: &BTreeMap<i32, Option<i32>>,
    cap_multiplier: f64,
) -> BTreeMap<i32, FpSwing> {
    let total = seat.fp_total();
    let previous_total = previous_seat.map(|s| s.fp_total()).unwrap_or(0);
    let mut res = BTreeMap::new();
    for (&cid, counts) in seat.fp_votes.iter() {
        let current_pct = match percent(counts.total(), total) {
            Some(p) => p,
            None => continue,
        };
        let swing = weighted_average(
            booths
                .clone()
                .map(|(w, fp)| (w as f64, fp.get(&cid).and_then(|s| s.swing))),
        );
        let previous_pct = previous_seat.and_then(|ps| {
            let pcid = candidate_matches.get(&cid).copied().flatten()?;
            percent(ps.fp_votes.get(&pcid)?.total(), previous_total)
        });
        let transformed_swing = match (previous_pct, swing) {
            (Some(p), Some(s)) => Some(capped_transformed_swing(
                p,
                (p + s).clamp(0.0, 100.0),
                cap_multiplier,
            )),
            _ => None,
        };
        res.insert(
            cid,
            FpSwing {
                percent: current_pct,
                swing,
                transformed_swing,
            },
        );
    }
    res
}

/// Seat level two-candidate figures. The swing is the booth swings averaged
/// by current two-candidate votes.
pub fn seat_tcp_swings<'b>(
    seat: &Seat,
    booths: impl Iterator<Item = (u64, &'b BTreeMap<i32, TcpSwing>)> + Clone,
) -> BTreeMap<i32, TcpSwing> {
    let total = seat.tcp_total();
    let mut res = BTreeMap::new();
    for (&aff, counts) in seat.tcp_votes.iter() {
        let current_pct = match percent(counts.total(), total) {
            Some(p) => p,
            None => continue,
        };
        let swing = weighted_average(
            booths
                .clone()
                .map(|(w, tcp)| (w as f64, tcp.get(&aff).and_then(|s| s.swing))),
        );
        res.insert(
            aff,
            TcpSwing {
                percent: current_pct,
                swing,
            },
        );
    }
    res
}
