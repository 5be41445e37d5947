//! Resolution of the external party and seat identifiers of both elections
//! onto the internal index space.
//!
//! The mapping is total: every party and seat ends up with an index, the
//! unknown ones with an explicit `Unresolved` tag. It is built once per run
//! and only read afterwards.

use std::collections::{BTreeMap, HashSet};

use log::{debug, info, warn};

use crate::config::*;

/// Party resolution for one election.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct PartyMapping {
    indices: BTreeMap<i32, PartyIndex>,
    // Configured slot matched by the party's code, before the coalition
    // partner redirection.
    groups: BTreeMap<i32, usize>,
}

impl PartyMapping {
    pub fn index(&self, party_id: i32) -> PartyIndex {
        if party_id == INDEPENDENT_PARTY_ID {
            return PartyIndex::Independent;
        }
        self.indices
            .get(&party_id)
            .copied()
            .unwrap_or(PartyIndex::Unresolved)
    }

    pub fn grouping_slot(&self, party_id: i32) -> Option<usize> {
        self.groups.get(&party_id).copied()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct IdentityMap {
    pub current: PartyMapping,
    pub previous: PartyMapping,
    /// Current seat id to internal seat index.
    pub seats: BTreeMap<i32, SeatIndex>,
}

/// Resolves one party against the configured code lists.
///
/// Returns the internal index and the configured slot that matched, if any.
pub fn resolve_party(party: &Party, config: &ProjectConfig) -> (PartyIndex, Option<usize>) {
    if party.id == INDEPENDENT_PARTY_ID {
        return (PartyIndex::Independent, None);
    }
    let code = party.short_code.as_str();
    let slot = config
        .parties
        .iter()
        .position(|p| p.official_codes.iter().any(|c| c == code));
    match slot {
        Some(1) if config.coalition_partner_codes.iter().any(|c| c == code) => {
            (PartyIndex::CoalitionPartner, Some(1))
        }
        Some(s) => (PartyIndex::Resolved(s), Some(s)),
        None if config.others_codes.iter().any(|c| c == code) => (PartyIndex::Others, None),
        None => (PartyIndex::Unresolved, None),
    }
}

fn resolve_parties(snapshot: &ElectionSnapshot, config: &ProjectConfig) -> PartyMapping {
    let mut mapping = PartyMapping::default();
    for party in snapshot.parties.values() {
        let (index, group) = resolve_party(party, config);
        if index == PartyIndex::Unresolved {
            warn!(
                "{}: could not resolve party {} ({}, code {:?})",
                snapshot.name, party.id, party.name, party.short_code
            );
        } else {
            debug!(
                "{}: party {} ({}) -> {}",
                snapshot.name, party.id, party.name, index
            );
        }
        mapping.indices.insert(party.id, index);
        if let Some(g) = group {
            mapping.groups.insert(party.id, g);
        }
    }
    mapping
}

fn resolve_seats(snapshot: &ElectionSnapshot, config: &ProjectConfig) -> BTreeMap<i32, SeatIndex> {
    let mut seats = BTreeMap::new();
    for seat in snapshot.seats.values() {
        let index = match config.seats.iter().position(|s| s.name == seat.name) {
            Some(pos) => SeatIndex::Resolved(pos),
            None => {
                warn!(
                    "{}: seat {} ({}) is not in the configured seat list",
                    snapshot.name, seat.id, seat.name
                );
                SeatIndex::Unresolved
            }
        };
        seats.insert(seat.id, index);
    }
    seats
}

/// Builds the identity mapping for a pair of snapshots.
pub fn resolve_identities(
    current: &ElectionSnapshot,
    previous: &ElectionSnapshot,
    config: &ProjectConfig,
) -> Result<IdentityMap, ProjectionError> {
    if config.parties.len() < 2 {
        return Err(ProjectionError::MissingMajorParties);
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for s in config.seats.iter() {
        if !seen.insert(s.name.as_str()) {
            return Err(ProjectionError::DuplicateSeatName(s.name.clone()));
        }
    }
    let map = IdentityMap {
        current: resolve_parties(current, config),
        previous: resolve_parties(previous, config),
        seats: resolve_seats(current, config),
    };
    info!(
        "resolve_identities: {} current parties, {} previous parties, {} current seats",
        map.current.indices.len(),
        map.previous.indices.len(),
        map.seats.len()
    );
    Ok(map)
}

/// Read-only view of both snapshots together with their resolved identities.
#[derive(Debug, Clone)]
pub struct Resolver<'a> {
    pub current: &'a ElectionSnapshot,
    pub previous: &'a ElectionSnapshot,
    pub config: &'a ProjectConfig,
    pub identity: IdentityMap,
}

impl<'a> Resolver<'a> {
    pub fn new(
        current: &'a ElectionSnapshot,
        previous: &'a ElectionSnapshot,
        config: &'a ProjectConfig,
    ) -> Result<Resolver<'a>, ProjectionError> {
        let identity = resolve_identities(current, previous, config)?;
        Ok(Resolver {
            current,
            previous,
            config,
            identity,
        })
    }

    pub fn seat_config(&self, current_seat: &Seat) -> Option<&'a SeatConfig> {
        self.config.seat_config(&current_seat.name)
    }

    pub fn seat_index(&self, current_seat: &Seat) -> SeatIndex {
        self.identity
            .seats
            .get(&current_seat.id)
            .copied()
            .unwrap_or(SeatIndex::Unresolved)
    }

    fn is_emerging(&self, current_seat: &Seat, candidate: &Candidate) -> bool {
        candidate.is_independent()
            && self
                .seat_config(current_seat)
                .map(|sc| sc.emerging_independents.iter().any(|n| *n == candidate.name))
                .unwrap_or(false)
    }

    pub fn current_candidate(&self, current_seat: &Seat, candidate_id: i32) -> PartyIndex {
        match self.current.candidates.get(&candidate_id) {
            Some(c) if self.is_emerging(current_seat, c) => PartyIndex::EmergingIndependent,
            Some(c) => self.identity.current.index(c.party),
            None => PartyIndex::Unresolved,
        }
    }

    pub fn previous_candidate(&self, candidate_id: i32) -> PartyIndex {
        match self.previous.candidates.get(&candidate_id) {
            Some(c) => self.identity.previous.index(c.party),
            None => PartyIndex::Unresolved,
        }
    }

    pub fn current_affiliation(&self, current_seat: &Seat, affiliation: i32) -> PartyIndex {
        if affiliation == INDEPENDENT_PARTY_ID {
            let emerging = current_seat.fp_votes.keys().any(|cid| {
                self.current
                    .candidates
                    .get(cid)
                    .map(|c| self.is_emerging(current_seat, c))
                    .unwrap_or(false)
            });
            if emerging {
                return PartyIndex::EmergingIndependent;
            }
        }
        self.identity.current.index(affiliation)
    }

    pub fn previous_affiliation(&self, affiliation: i32) -> PartyIndex {
        self.identity.previous.index(affiliation)
    }

    pub fn seat_tcp_parties(&self, current_seat: &Seat) -> Vec<PartyIndex> {
        current_seat
            .tcp_votes
            .keys()
            .map(|&aff| self.current_affiliation(current_seat, aff))
            .collect()
    }

    pub fn booth_tcp_parties(&self, current_seat: &Seat, booth: &Booth) -> Vec<PartyIndex> {
        booth
            .tcp_votes
            .keys()
            .map(|&aff| self.current_affiliation(current_seat, aff))
            .collect()
    }

    pub fn previous_seat_tcp_parties(&self, previous_seat: &Seat) -> Vec<PartyIndex> {
        previous_seat
            .tcp_votes
            .keys()
            .map(|&aff| self.previous_affiliation(aff))
            .collect()
    }

    pub fn previous_booth_tcp_parties(&self, booth: &Booth) -> Vec<PartyIndex> {
        booth
            .tcp_votes
            .keys()
            .map(|&aff| self.previous_affiliation(aff))
            .collect()
    }
}

/// True for a head-to-head between the first major party and the major
/// coalition.
pub fn is_classic_contest(parties: &[PartyIndex]) -> bool {
    parties.len() == 2
        && parties.iter().filter(|p| **p == PartyIndex::MAJOR_A).count() == 1
        && parties.iter().filter(|p| p.is_coalition()).count() == 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn coalition_partner_code_is_redirected() {
        let config = sample_config();
        let nat = Party {
            id: 3,
            name: "The Nationals".to_string(),
            short_code: "NP".to_string(),
        };
        assert_eq!(
            resolve_party(&nat, &config),
            (PartyIndex::CoalitionPartner, Some(1))
        );
        let lib = Party {
            id: 2,
            name: "Liberal".to_string(),
            short_code: "LP".to_string(),
        };
        assert_eq!(resolve_party(&lib, &config), (PartyIndex::MAJOR_B, Some(1)));
    }

    #[test]
    fn unknown_party_is_unresolved_not_zero() {
        let config = sample_config();
        let p = Party {
            id: 42,
            name: "Sausage Party".to_string(),
            short_code: "SAU".to_string(),
        };
        assert_eq!(resolve_party(&p, &config), (PartyIndex::Unresolved, None));
        let mut snapshot = ElectionSnapshot::default();
        snapshot.parties.insert(42, p);
        let mapping = resolve_parties(&snapshot, &config);
        assert_eq!(mapping.index(42), PartyIndex::Unresolved);
        // Never seen at all.
        assert_eq!(mapping.index(77), PartyIndex::Unresolved);
        assert_eq!(mapping.index(INDEPENDENT_PARTY_ID), PartyIndex::Independent);
    }

    #[test]
    fn others_codes_fold_into_others() {
        let config = sample_config();
        let p = Party {
            id: 9,
            name: "Liberal Democrats".to_string(),
            short_code: "LDP".to_string(),
        };
        assert_eq!(resolve_party(&p, &config), (PartyIndex::Others, None));
    }

    #[test]
    fn seats_resolve_by_exact_name() {
        let (current, previous) = sample_snapshots();
        let mut config = sample_config();
        config.seats.retain(|s| s.name != "Wills");
        let r = Resolver::new(&current, &previous, &config).unwrap();
        let aston = current.seat_by_name("Aston").unwrap();
        let wills = current.seat_by_name("Wills").unwrap();
        assert_eq!(r.seat_index(aston), SeatIndex::Resolved(0));
        assert_eq!(r.seat_index(wills), SeatIndex::Unresolved);
    }

    #[test]
    fn emerging_independent_from_seat_config() {
        let (current, previous) = sample_snapshots();
        let mut config = sample_config();
        config.seats[0].emerging_independents = vec!["Ivy Indie".to_string()];
        let r = Resolver::new(&current, &previous, &config).unwrap();
        let aston = current.seat_by_name("Aston").unwrap();
        assert_eq!(
            r.current_candidate(aston, 104),
            PartyIndex::EmergingIndependent
        );
        assert_eq!(
            r.current_affiliation(aston, INDEPENDENT_PARTY_ID),
            PartyIndex::EmergingIndependent
        );
        assert_eq!(r.current_candidate(aston, 101), PartyIndex::MAJOR_A);
    }

    #[test]
    fn classic_contests() {
        use PartyIndex::*;
        let labor = PartyIndex::MAJOR_A;
        let liberal = PartyIndex::MAJOR_B;
        assert!(is_classic_contest(&[labor, liberal]));
        assert!(is_classic_contest(&[CoalitionPartner, labor]));
        assert!(!is_classic_contest(&[liberal, CoalitionPartner]));
        assert!(!is_classic_contest(&[labor, Resolved(2)]));
        assert!(!is_classic_contest(&[labor]));

        let (current, previous) = sample_snapshots();
        let config = sample_config();
        let r = Resolver::new(&current, &previous, &config).unwrap();
        assert!(is_classic_contest(&r.seat_tcp_parties(&current.seats[&10])));
        assert!(!is_classic_contest(&r.seat_tcp_parties(&current.seats[&20])));
    }

    #[test]
    fn rejects_config_without_majors() {
        let (current, previous) = sample_snapshots();
        let mut config = sample_config();
        config.parties.truncate(1);
        assert_eq!(
            resolve_identities(&current, &previous, &config).unwrap_err(),
            ProjectionError::MissingMajorParties
        );
    }

    #[test]
    fn rejects_duplicate_seat_names() {
        let (current, previous) = sample_snapshots();
        let mut config = sample_config();
        let dup = config.seats[0].clone();
        config.seats.push(dup);
        assert!(matches!(
            resolve_identities(&current, &previous, &config),
            Err(ProjectionError::DuplicateSeatName(_))
        ));
    }
}
