pub use crate::config::*;

use std::collections::BTreeMap;

/// A builder for assembling an election snapshot.
///
/// Booth votes are always ordinary votes: recording them also updates the
/// ordinary counts of the seat the booth belongs to, so that the booths of a
/// seat always add up to the seat's ordinary count.
///
/// ```
/// use live_swing::builder::SnapshotBuilder;
/// use live_swing::{BoothKind, ProjectionError, VoteType};
///
/// let mut builder = SnapshotBuilder::new("2022 federal")
///     .party(1, "Australian Labor Party", "ALP")?
///     .candidate(10, "Mary Doyle", 1)?
///     .seat(100, "Aston", 110_000)?
///     .booth(100, 1000, "Boronia", BoothKind::Normal)?;
///
/// builder.add_booth_fp(1000, 10, 412)?;
/// builder.add_seat_fp(100, 10, VoteType::Postal, 37)?;
///
/// let snapshot = builder.build()?;
/// assert_eq!(snapshot.seats[&100].fp_votes[&10].total(), 449);
/// # Ok::<(), ProjectionError>(())
/// ```
pub struct SnapshotBuilder {
    pub(crate) _snapshot: ElectionSnapshot,
    pub(crate) _booth_seats: BTreeMap<i32, i32>,
}

fn inconsistent(msg: String) -> ProjectionError {
    ProjectionError::InconsistentSnapshot(msg)
}

impl SnapshotBuilder {
    pub fn new(name: &str) -> SnapshotBuilder {
        SnapshotBuilder {
            _snapshot: ElectionSnapshot {
                name: name.to_string(),
                ..ElectionSnapshot::default()
            },
            _booth_seats: BTreeMap::new(),
        }
    }

    pub fn party(
        mut self,
        id: i32,
        name: &str,
        short_code: &str,
    ) -> Result<SnapshotBuilder, ProjectionError> {
        if id == INDEPENDENT_PARTY_ID || self._snapshot.parties.contains_key(&id) {
            return Err(inconsistent(format!("party id {} is not available", id)));
        }
        self._snapshot.parties.insert(
            id,
            Party {
                id,
                name: name.to_string(),
                short_code: short_code.to_string(),
            },
        );
        Ok(self)
    }

    /// Declares a candidate. Use `INDEPENDENT_PARTY_ID` for independents.
    pub fn candidate(
        mut self,
        id: i32,
        name: &str,
        party: i32,
    ) -> Result<SnapshotBuilder, ProjectionError> {
        if party != INDEPENDENT_PARTY_ID && !self._snapshot.parties.contains_key(&party) {
            return Err(inconsistent(format!(
                "candidate {} refers to unknown party {}",
                name, party
            )));
        }
        if self._snapshot.candidates.contains_key(&id) {
            return Err(inconsistent(format!("duplicate candidate id {}", id)));
        }
        self._snapshot.candidates.insert(
            id,
            Candidate {
                id,
                name: name.to_string(),
                party,
            },
        );
        Ok(self)
    }

    pub fn seat(
        mut self,
        id: i32,
        name: &str,
        enrolment: u64,
    ) -> Result<SnapshotBuilder, ProjectionError> {
        if self._snapshot.seats.contains_key(&id) {
            return Err(inconsistent(format!("duplicate seat id {}", id)));
        }
        self._snapshot.seats.insert(
            id,
            Seat {
                id,
                name: name.to_string(),
                enrolment,
                fp_votes: BTreeMap::new(),
                tcp_votes: BTreeMap::new(),
                booths: Vec::new(),
            },
        );
        Ok(self)
    }

    pub fn booth(
        mut self,
        seat_id: i32,
        id: i32,
        name: &str,
        kind: BoothKind,
    ) -> Result<SnapshotBuilder, ProjectionError> {
        if self._snapshot.booths.contains_key(&id) {
            return Err(inconsistent(format!("duplicate booth id {}", id)));
        }
        let seat = self
            ._snapshot
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| {
                inconsistent(format!("booth {} refers to unknown seat {}", name, seat_id))
            })?;
        seat.booths.push(id);
        self._snapshot.booths.insert(
            id,
            Booth {
                id,
                name: name.to_string(),
                kind,
                fp_votes: BTreeMap::new(),
                tcp_votes: BTreeMap::new(),
            },
        );
        self._booth_seats.insert(id, seat_id);
        Ok(self)
    }

    /// Adds first preference votes counted outside of any booth.
    pub fn add_seat_fp(
        &mut self,
        seat_id: i32,
        candidate_id: i32,
        vote_type: VoteType,
        count: u64,
    ) -> Result<(), ProjectionError> {
        if !self._snapshot.candidates.contains_key(&candidate_id) {
            return Err(inconsistent(format!("unknown candidate {}", candidate_id)));
        }
        let seat = self
            ._snapshot
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| inconsistent(format!("unknown seat {}", seat_id)))?;
        seat.fp_votes
            .entry(candidate_id)
            .or_insert(VoteCounts::EMPTY)
            .add(vote_type, count);
        Ok(())
    }

    /// Adds two-candidate-preferred votes counted outside of any booth.
    ///
    /// The affiliation is a declared party id, or `INDEPENDENT_PARTY_ID`.
    pub fn add_seat_tcp(
        &mut self,
        seat_id: i32,
        affiliation: i32,
        vote_type: VoteType,
        count: u64,
    ) -> Result<(), ProjectionError> {
        if affiliation != INDEPENDENT_PARTY_ID
            && !self._snapshot.parties.contains_key(&affiliation)
        {
            return Err(inconsistent(format!("unknown affiliation {}", affiliation)));
        }
        let seat = self
            ._snapshot
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| inconsistent(format!("unknown seat {}", seat_id)))?;
        seat.tcp_votes
            .entry(affiliation)
            .or_insert(VoteCounts::EMPTY)
            .add(vote_type, count);
        Ok(())
    }

    pub fn add_booth_fp(
        &mut self,
        booth_id: i32,
        candidate_id: i32,
        count: u64,
    ) -> Result<(), ProjectionError> {
        let seat_id = *self
            ._booth_seats
            .get(&booth_id)
            .ok_or_else(|| inconsistent(format!("unknown booth {}", booth_id)))?;
        self.add_seat_fp(seat_id, candidate_id, VoteType::Ordinary, count)?;
        if let Some(booth) = self._snapshot.booths.get_mut(&booth_id) {
            *booth.fp_votes.entry(candidate_id).or_insert(0) += count;
        }
        Ok(())
    }

    pub fn add_booth_tcp(
        &mut self,
        booth_id: i32,
        affiliation: i32,
        count: u64,
    ) -> Result<(), ProjectionError> {
        let seat_id = *self
            ._booth_seats
            .get(&booth_id)
            .ok_or_else(|| inconsistent(format!("unknown booth {}", booth_id)))?;
        self.add_seat_tcp(seat_id, affiliation, VoteType::Ordinary, count)?;
        if let Some(booth) = self._snapshot.booths.get_mut(&booth_id) {
            *booth.tcp_votes.entry(affiliation).or_insert(0) += count;
        }
        Ok(())
    }

    pub fn build(self) -> Result<ElectionSnapshot, ProjectionError> {
        for seat in self._snapshot.seats.values() {
            for booth_id in seat.booths.iter() {
                if !self._snapshot.booths.contains_key(booth_id) {
                    return Err(inconsistent(format!(
                        "seat {} lists unknown booth {}",
                        seat.name, booth_id
                    )));
                }
            }
        }
        Ok(self._snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booth_votes_roll_up_into_seat_ordinary_votes() {
        let mut b = SnapshotBuilder::new("test")
            .party(1, "Labor", "ALP")
            .unwrap()
            .candidate(10, "A", 1)
            .unwrap()
            .candidate(11, "B", INDEPENDENT_PARTY_ID)
            .unwrap()
            .seat(100, "Aston", 1000)
            .unwrap()
            .booth(100, 1, "One", BoothKind::Normal)
            .unwrap()
            .booth(100, 2, "Two", BoothKind::EarlyVotingCentre)
            .unwrap();
        b.add_booth_fp(1, 10, 120).unwrap();
        b.add_booth_fp(1, 11, 80).unwrap();
        b.add_booth_fp(2, 10, 60).unwrap();
        b.add_seat_fp(100, 10, VoteType::Absent, 15).unwrap();
        let s = b.build().unwrap();

        let seat = &s.seats[&100];
        let booth_sum: u64 = seat.booths.iter().map(|id| s.booths[id].fp_total()).sum();
        assert_eq!(booth_sum, seat.fp_total_of(VoteType::Ordinary));
        assert_eq!(seat.fp_total(), 275);
        assert_eq!(seat.fp_votes[&10].declaration_total(), 15);
    }

    #[test]
    fn rejects_unknown_references() {
        let b = SnapshotBuilder::new("test").candidate(10, "A", 7);
        assert!(matches!(b, Err(ProjectionError::InconsistentSnapshot(_))));

        let b = SnapshotBuilder::new("test").booth(5, 1, "Orphan", BoothKind::Other);
        assert!(b.is_err());

        let mut b = SnapshotBuilder::new("test").seat(1, "Aston", 10).unwrap();
        assert!(b.add_booth_fp(99, 1, 10).is_err());
        assert!(b.add_seat_fp(1, 42, VoteType::Postal, 10).is_err());
    }

    #[test]
    fn two_candidate_votes_need_a_known_affiliation() {
        let mut b = SnapshotBuilder::new("test")
            .party(1, "Labor", "ALP")
            .unwrap()
            .seat(100, "Aston", 1000)
            .unwrap()
            .booth(100, 1, "One", BoothKind::Normal)
            .unwrap();
        assert!(matches!(
            b.add_booth_tcp(1, 7, 300),
            Err(ProjectionError::InconsistentSnapshot(_))
        ));
        assert!(b.add_seat_tcp(100, 7, VoteType::Postal, 30).is_err());
        b.add_booth_tcp(1, 1, 300).unwrap();
        b.add_booth_tcp(1, INDEPENDENT_PARTY_ID, 200).unwrap();
        let s = b.build().unwrap();
        assert_eq!(s.booths[&1].tcp_total(), 500);
        assert_eq!(s.seats[&100].tcp_total(), 500);
        assert!(!s.booths[&1].tcp_votes.contains_key(&7));
    }
}
