//! Pairing of seats, booths, candidates and two-candidate affiliations
//! between the current and the previous election.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::config::*;
use crate::identity::Resolver;

/// Finds the previous incarnation of a current seat.
///
/// Tries, in order: identical external id, identical name, the configured
/// previous name and the configured alternate name.
pub fn find_best_matching_previous_seat<'a>(
    current_seat: &Seat,
    previous: &'a ElectionSnapshot,
    seat_config: Option<&SeatConfig>,
) -> Result<&'a Seat, MatchError> {
    if let Some(s) = previous.seats.get(&current_seat.id) {
        return Ok(s);
    }
    if let Some(s) = previous.seat_by_name(&current_seat.name) {
        return Ok(s);
    }
    let overrides = seat_config
        .into_iter()
        .flat_map(|sc| [sc.previous_name.as_ref(), sc.alternate_name.as_ref()])
        .flatten();
    for name in overrides {
        if let Some(s) = previous.seat_by_name(name) {
            debug!(
                "find_best_matching_previous_seat: {} matched through configured name {}",
                current_seat.name, name
            );
            return Ok(s);
        }
    }
    Err(MatchError::NoMatchingSeat(current_seat.name.clone()))
}

/// Pairs the current seat's reported two-candidate affiliations with the
/// previous seat's, by internal party index.
///
/// Returns `(current affiliation, previous affiliation)` pairs. Fewer than two
/// pairs means there is not enough data for a two-party comparison.
pub fn find_matched_parties(
    previous_seat: &Seat,
    current_seat: &Seat,
    resolver: &Resolver,
) -> Vec<(i32, i32)> {
    let mut used: BTreeSet<i32> = BTreeSet::new();
    let mut pairs: Vec<(i32, i32)> = Vec::new();
    for &current_aff in current_seat.tcp_votes.keys() {
        let index = resolver.current_affiliation(current_seat, current_aff);
        if index == PartyIndex::Unresolved {
            continue;
        }
        let previous_aff = previous_seat
            .tcp_votes
            .keys()
            .copied()
            .find(|p| !used.contains(p) && resolver.previous_affiliation(*p) == index);
        if let Some(p) = previous_aff {
            used.insert(p);
            pairs.push((current_aff, p));
        }
    }
    pairs
}

/// The previous booth with the same id, or with the same name inside the
/// previous seat.
pub fn find_matching_previous_booth<'a>(
    booth: &Booth,
    previous_seat: &Seat,
    previous: &'a ElectionSnapshot,
) -> Option<&'a Booth> {
    if let Some(b) = previous.booths.get(&booth.id) {
        return Some(b);
    }
    previous_seat
        .booths
        .iter()
        .filter_map(|id| previous.booths.get(id))
        .find(|b| b.name == booth.name)
}

/// Finds the previous seat's candidate matching a current candidate.
///
/// Criteria, in priority order: same name for independents, same party
/// short code, same party name, same configured party slot, same internal
/// party index.
pub fn find_matching_previous_candidate(
    candidate_id: i32,
    current_seat: &Seat,
    previous_seat: &Seat,
    resolver: &Resolver,
) -> Option<i32> {
    find_unclaimed_previous_candidate(
        candidate_id,
        current_seat,
        previous_seat,
        resolver,
        &BTreeSet::new(),
    )
}

/// Same as `find_matching_previous_candidate`, ignoring the previous
/// candidates in `claimed`.
fn find_unclaimed_previous_candidate(
    candidate_id: i32,
    current_seat: &Seat,
    previous_seat: &Seat,
    resolver: &Resolver,
    claimed: &BTreeSet<i32>,
) -> Option<i32> {
    let current = resolver.current;
    let previous = resolver.previous;
    let candidate = current.candidates.get(&candidate_id)?;
    let party = current.parties.get(&candidate.party);
    let previous_candidates: Vec<&Candidate> = previous_seat
        .fp_votes
        .keys()
        .filter(|id| !claimed.contains(*id))
        .filter_map(|id| previous.candidates.get(id))
        .collect();

    if candidate.is_independent() {
        if let Some(c) = previous_candidates
            .iter()
            .find(|c| c.is_independent() && c.name == candidate.name)
        {
            return Some(c.id);
        }
    }

    if let Some(party) = party {
        let previous_party = |c: &&&Candidate| previous.parties.get(&c.party);
        if let Some(c) = previous_candidates
            .iter()
            .find(|c| previous_party(c).map(|p| p.short_code == party.short_code) == Some(true))
        {
            return Some(c.id);
        }
        if let Some(c) = previous_candidates
            .iter()
            .find(|c| previous_party(c).map(|p| p.name == party.name) == Some(true))
        {
            return Some(c.id);
        }
        if let Some(slot) = resolver.identity.current.grouping_slot(party.id) {
            if let Some(c) = previous_candidates
                .iter()
                .find(|c| resolver.identity.previous.grouping_slot(c.party) == Some(slot))
            {
                return Some(c.id);
            }
        }
    }

    let index = resolver.current_candidate(current_seat, candidate_id);
    let comparable = matches!(
        index,
        PartyIndex::Resolved(_) | PartyIndex::CoalitionPartner | PartyIndex::Others
    );
    if comparable {
        return previous_candidates
            .iter()
            .find(|c| resolver.previous_candidate(c.id) == index)
            .map(|c| c.id);
    }
    None
}

/// Candidate matches for every first preference candidate of a seat.
///
/// A previous candidate is matched at most once. Current candidates claim
/// their match in id order.
pub(crate) fn match_candidates(
    current_seat: &Seat,
    previous_seat: Option<&Seat>,
    resolver: &Resolver,
) -> BTreeMap<i32, Option<i32>> {
    let mut claimed: BTreeSet<i32> = BTreeSet::new();
    let mut res: BTreeMap<i32, Option<i32>> = BTreeMap::new();
    for &cid in current_seat.fp_votes.keys() {
        let m = previous_seat.and_then(|ps| {
            find_unclaimed_previous_candidate(cid, current_seat, ps, resolver, &claimed)
        });
        if let Some(pid) = m {
            debug!("match_candidates: {} -> {}", cid, pid);
            claimed.insert(pid);
        }
        res.insert(cid, m);
    }
    res
}
