//! Two-party estimates for booths and seats without a usable two-candidate
//! count between the major parties.

use std::collections::BTreeMap;

use log::debug;

use crate::config::*;
use crate::identity::{is_classic_contest, Resolver};
use crate::preference_flow::{prior_flow, PreferenceFlows};
use crate::swing::{weighted_average, TcpSwing};

/// The two-party figures of one booth.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct BoothTpp {
    /// Estimated share of the first major party, from first preferences.
    pub estimate: Option<f64>,
    /// Swing to the first major party: the counted one if the booth reported a
    /// two-party count, the estimated one otherwise.
    pub swing: Option<f64>,
    pub estimated: bool,
}

fn eligible(index: PartyIndex) -> bool {
    matches!(
        index,
        PartyIndex::Resolved(0)
            | PartyIndex::Resolved(1)
            | PartyIndex::CoalitionPartner
            | PartyIndex::Independent
            | PartyIndex::EmergingIndependent
    )
}

/// Picks which member of the major coalition stands for it in the seat.
///
/// A recorded two-candidate pair wins if both of its sides are eligible.
/// Otherwise the coalition partner is chosen only if it has strictly more
/// first preferences than the second major party.
pub fn choose_coalition_main(resolver: &Resolver, seat: &Seat) -> PartyIndex {
    let recorded = resolver.seat_tcp_parties(seat);
    if recorded.len() == 2 && recorded.iter().all(|p| eligible(*p)) {
        if let Some(p) = recorded.iter().find(|p| p.is_coalition()) {
            return *p;
        }
    }
    let mut major_b: u64 = 0;
    let mut partner: u64 = 0;
    for (cid, counts) in seat.fp_votes.iter() {
        match resolver.current_candidate(seat, *cid) {
            PartyIndex::CoalitionPartner => partner += counts.total(),
            p if p == PartyIndex::MAJOR_B => major_b += counts.total(),
            _ => {}
        }
    }
    if partner > major_b {
        debug!(
            "choose_coalition_main: {}: coalition partner leads ({} > {})",
            seat.name, partner, major_b
        );
        PartyIndex::CoalitionPartner
    } else {
        PartyIndex::MAJOR_B
    }
}

/// Percentage of a party's first preferences assumed to reach the first
/// major party.
pub fn candidate_flow(
    index: PartyIndex,
    coalition_main: PartyIndex,
    flows: &PreferenceFlows,
    config: &ProjectConfig,
) -> f64 {
    if index == coalition_main {
        0.0
    } else if index.is_coalition() {
        config.settings.coalition_sibling_flow
    } else if index == PartyIndex::MAJOR_A {
        100.0
    } else {
        flows
            .get(index)
            .unwrap_or_else(|| prior_flow(index, config))
    }
}

/// Estimated two-party share of the first major party in a booth.
pub fn estimate_booth_tpp(
    resolver: &Resolver,
    flows: &PreferenceFlows,
    seat: &Seat,
    booth: &Booth,
    coalition_main: PartyIndex,
) -> Option<f64> {
    let total = booth.fp_total();
    if total == 0 {
        return None;
    }
    let estimate = booth
        .fp_votes
        .iter()
        .map(|(cid, votes)| {
            let index = resolver.current_candidate(seat, *cid);
            let flow = candidate_flow(index, coalition_main, flows, resolver.config);
            *votes as f64 / total as f64 * flow
        })
        .sum::<f64>();
    Some(estimate.clamp(0.0, 100.0))
}

// Share of the first major party in a previous booth, for classic counts
// only.
fn previous_classic_share(resolver: &Resolver, previous_booth: &Booth) -> Option<f64> {
    if !is_classic_contest(&resolver.previous_booth_tcp_parties(previous_booth)) {
        return None;
    }
    let total = previous_booth.tcp_total();
    let major = previous_booth
        .tcp_votes
        .iter()
        .find(|(aff, _)| resolver.previous_affiliation(**aff) == PartyIndex::MAJOR_A)
        .map(|(_, v)| *v)?;
    crate::swing::percent(major, total)
}

/// Two-party figures for a booth.
///
/// `counted` holds the booth's two-candidate figures. When the booth reports
/// a classic count with a defined swing, that swing is used as is.
pub fn booth_tpp(
    resolver: &Resolver,
    flows: &PreferenceFlows,
    seat: &Seat,
    booth: &Booth,
    previous_booth: Option<&Booth>,
    counted: &BTreeMap<i32, TcpSwing>,
    coalition_main: PartyIndex,
) -> BoothTpp {
    let estimate = estimate_booth_tpp(resolver, flows, seat, booth, coalition_main);
    if is_classic_contest(&resolver.booth_tcp_parties(seat, booth)) {
        let real = counted
            .iter()
            .find(|(aff, _)| resolver.current_affiliation(seat, **aff) == PartyIndex::MAJOR_A)
            .and_then(|(_, s)| s.swing);
        if real.is_some() {
            return BoothTpp {
                estimate,
                swing: real,
                estimated: false,
            };
        }
    }
    let previous = previous_booth.and_then(|pb| previous_classic_share(resolver, pb));
    let swing = match (estimate, previous) {
        (Some(e), Some(p)) => Some(e - p),
        _ => None,
    };
    BoothTpp {
        estimate,
        swing,
        estimated: true,
    }
}

/// Seat swing to the first major party, averaged over the booths by their
/// first preference votes.
pub fn seat_major_swing<'b>(booths: impl Iterator<Item = (u64, &'b BoothTpp)>) -> Option<f64> {
    weighted_average(booths.map(|(w, b)| (w as f64, b.swing)))
}

/// True when any booth carrying weight in `seat_major_swing` has an estimated
/// rather than a counted swing.
pub fn seat_major_swing_estimated<'b>(
    mut booths: impl Iterator<Item = (u64, &'b BoothTpp)>,
) -> bool {
    booths.any(|(w, b)| w > 0 && b.swing.is_some() && b.estimated)
}
