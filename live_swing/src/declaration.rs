//! Projection of the declaration votes (absent, provisional, pre-poll, postal
//! and early votes) still to be counted in a seat.

use log::debug;

use crate::config::*;
use crate::swing::{percent, weighted_average};

// Share of an announced volume that ends up as formal, returned votes.
fn override_factor(vote_type: VoteType) -> f64 {
    match vote_type {
        VoteType::Absent => 0.92,
        VoteType::Provisional => 0.45,
        VoteType::PrePoll => 0.96,
        VoteType::Postal => 0.86,
        VoteType::Early | VoteType::Ordinary => 1.0,
    }
}

// Number of counted votes after which the observed swing of a category is
// fully trusted.
fn full_trust_votes(vote_type: VoteType) -> f64 {
    match vote_type {
        VoteType::Absent => 2500.0,
        VoteType::Provisional => 300.0,
        VoteType::PrePoll => 2500.0,
        VoteType::Postal => 4000.0,
        VoteType::Early | VoteType::Ordinary => 4000.0,
    }
}

/// Share of the enrolment counted so far, in percent.
pub fn count_progress(counted: u64, enrolment: u64) -> f64 {
    match percent(counted, enrolment) {
        Some(p) => p.clamp(0.0, 100.0),
        None => 0.0,
    }
}

/// Projection for one declaration vote type.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct CategoryProjection {
    pub vote_type: VoteType,
    pub counted: u64,
    pub expected_volume: f64,
    pub projected_volume: f64,
    /// Weight of the observed swing against the ordinary swing, in [0, 1].
    pub mix: f64,
    pub observed_swing: Option<f64>,
    pub blended_swing: Option<f64>,
    pub projected_percent: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DeclarationProjection {
    pub categories: Vec<CategoryProjection>,
    /// Counted declaration votes over projected declaration votes.
    pub basis: f64,
    pub declaration_swing: Option<f64>,
    pub final_swing: Option<f64>,
    pub projected_declaration_votes: f64,
    pub projected_total_votes: f64,
    pub remaining_percent: Option<f64>,
}

/// Expected number of formal votes of a type, from the seat overrides or the
/// previous election.
pub fn expected_volume(
    vote_type: VoteType,
    seat: &Seat,
    previous_seat: &Seat,
    seat_config: Option<&SeatConfig>,
) -> f64 {
    let known = seat_config.and_then(|sc| sc.declaration_overrides.get(&vote_type));
    let factor = override_factor(vote_type);
    match known {
        Some(DeclarationOverride {
            count: Some(count), ..
        }) => *count as f64 * factor,
        Some(DeclarationOverride {
            percent: Some(pct), ..
        }) => seat.enrolment as f64 * pct / 100.0 * factor,
        _ => previous_seat.fp_total_of(vote_type) as f64,
    }
}

fn mix_factor(counted: u64, expected: f64, vote_type: VoteType) -> f64 {
    let denominator = expected.min(full_trust_votes(vote_type));
    if denominator <= 0.0 {
        if counted > 0 {
            1.0
        } else {
            0.0
        }
    } else {
        (counted as f64 / denominator).clamp(0.0, 1.0)
    }
}

// Share of `side` among the two sides, for one vote type.
fn side_percent(seat: &Seat, side: i32, other: i32, vote_type: VoteType) -> Option<f64> {
    let votes = |aff: i32| {
        seat.tcp_votes
            .get(&aff)
            .map(|vc| vc.get(vote_type))
            .unwrap_or(0)
    };
    percent(votes(side), votes(side) + votes(other))
}

/// Projects the declaration votes of a seat.
///
/// `sides` holds the matched `(current, previous)` affiliations of the two
/// sides, the first one being the side the swings refer to. `ordinary_swing`
/// is the swing measured on the booths.
pub fn project_declaration_votes(
    seat: &Seat,
    previous_seat: &Seat,
    seat_config: Option<&SeatConfig>,
    sides: Option<[(i32, i32); 2]>,
    ordinary_swing: Option<f64>,
) -> DeclarationProjection {
    let mut categories = Vec::new();
    for vote_type in VoteType::DECLARATION {
        let counted = seat.fp_total_of(vote_type);
        let expected = expected_volume(vote_type, seat, previous_seat, seat_config);
        let mix = mix_factor(counted, expected, vote_type);
        let current_pct =
            sides.and_then(|[(c, _), (oc, _)]| side_percent(seat, c, oc, vote_type));
        let previous_pct =
            sides.and_then(|[(_, p), (_, op)]| side_percent(previous_seat, p, op, vote_type));
        let observed_swing = match (current_pct, previous_pct) {
            (Some(c), Some(p)) => Some(c - p),
            _ => None,
        };
        let blended_swing = match (observed_swing, ordinary_swing) {
            (Some(o), Some(s)) => Some(mix * o + (1.0 - mix) * s),
            (Some(o), None) => Some(o),
            (None, s) => s,
        };
        let projected_percent = match (previous_pct, blended_swing) {
            (Some(p), Some(s)) => Some((p + s).clamp(0.0, 100.0)),
            _ => current_pct,
        };
        debug!(
            "project_declaration_votes: {} {:?}: counted {}, expected {:.0}, mix {:.3}",
            seat.name, vote_type, counted, expected, mix
        );
        categories.push(CategoryProjection {
            vote_type,
            counted,
            expected_volume: expected,
            projected_volume: expected.max(counted as f64),
            mix,
            observed_swing,
            blended_swing,
            projected_percent,
        });
    }

    let counted_declaration: u64 = categories.iter().map(|c| c.counted).sum();
    let projected_declaration_votes: f64 = categories.iter().map(|c| c.projected_volume).sum();
    let basis = if projected_declaration_votes > 0.0 {
        (counted_declaration as f64 / projected_declaration_votes).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let declaration_swing = weighted_average(
        categories
            .iter()
            .map(|c| (c.counted as f64, c.observed_swing)),
    );
    let mixed = match (declaration_swing, ordinary_swing) {
        (Some(d), Some(o)) => Some(basis * d + (1.0 - basis) * o),
        (d, None) => d,
        (None, o) => o,
    };
    let ordinary_votes = seat
        .fp_total_of(VoteType::Ordinary)
        .max(previous_seat.fp_total_of(VoteType::Ordinary)) as f64;
    let projected_total_votes = ordinary_votes + projected_declaration_votes;
    let declaration_fraction = if projected_total_votes > 0.0 {
        projected_declaration_votes / projected_total_votes
    } else {
        0.0
    };
    let final_swing = match (mixed, ordinary_swing) {
        (Some(m), Some(o)) => Some((1.0 - declaration_fraction) * o + declaration_fraction * m),
        (m, None) => m,
        (None, o) => o,
    };

    DeclarationProjection {
        categories,
        basis,
        declaration_swing,
        final_swing,
        projected_declaration_votes,
        projected_total_votes,
        remaining_percent: remaining_declaration_percent(previous_seat, seat_config, basis),
    }
}

/// How much of the seat's vote is still expected from declaration votes, in
/// percent.
///
/// The historical declaration share, with a known postal percentage taking
/// the place of the previous postal volume, reduced by the share already
/// counted.
pub fn remaining_declaration_percent(
    previous_seat: &Seat,
    seat_config: Option<&SeatConfig>,
    basis: f64,
) -> Option<f64> {
    let previous_total = previous_seat.fp_total();
    if previous_total == 0 {
        return None;
    }
    let previous_declaration: u64 = VoteType::DECLARATION
        .iter()
        .map(|vt| previous_seat.fp_total_of(*vt))
        .sum();
    let known_postal = seat_config
        .and_then(|sc| sc.declaration_overrides.get(&VoteType::Postal))
        .and_then(|o| o.percent);
    let ratio = match known_postal {
        Some(pct) => {
            let without_postal =
                previous_declaration - previous_seat.fp_total_of(VoteType::Postal);
            (without_postal as f64 / previous_total as f64 + pct / 100.0).clamp(0.0, 1.0)
        }
        None => previous_declaration as f64 / previous_total as f64,
    };
    Some(ratio * (1.0 - basis.clamp(0.0, 1.0)) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    const SIDES: Option<[(i32, i32); 2]> = Some([(1, 1), (2, 2)]);

    #[test]
    fn nothing_counted_keeps_the_ordinary_swing() {
        let (current, previous) = two_party_seat((22_000, 18_000), (20_800, 19_200));
        let p = project_declaration_votes(
            &current.seats[&10],
            &previous.seats[&10],
            None,
            SIDES,
            Some(-3.0),
        );
        assert_eq!(p.basis, 0.0);
        assert_eq!(p.declaration_swing, None);
        assert_close(p.final_swing.unwrap(), -3.0);
        assert_close(p.projected_total_votes, 40_000.0);
        assert_close(p.remaining_percent.unwrap(), 0.0);
    }

    #[test]
    fn partially_counted_postals() {
        let (current, previous) = sample_snapshots();
        let seat = &current.seats[&10];
        let prev = &previous.seats[&10];
        let p = project_declaration_votes(seat, prev, None, SIDES, Some(2.0));

        let postal = p
            .categories
            .iter()
            .find(|c| c.vote_type == VoteType::Postal)
            .unwrap();
        assert_eq!(postal.counted, 300);
        assert_close(postal.expected_volume, 1000.0);
        assert_close(postal.mix, 0.3);
        assert_close(postal.observed_swing.unwrap(), 130.0 / 3.0 - 40.0);
        assert_close(postal.blended_swing.unwrap(), 0.3 * (130.0 / 3.0 - 40.0) + 1.4);

        let absent = p
            .categories
            .iter()
            .find(|c| c.vote_type == VoteType::Absent)
            .unwrap();
        assert_eq!(absent.mix, 0.0);
        assert_eq!(absent.observed_swing, None);
        assert_close(absent.blended_swing.unwrap(), 2.0);
        assert_close(absent.projected_percent.unwrap(), 54.0);

        assert_close(p.basis, 0.2);
        assert_close(p.projected_total_votes, 5500.0);
        let decl = 0.2 * (130.0 / 3.0 - 40.0) + 0.8 * 2.0;
        assert_close(p.final_swing.unwrap(), 2.0 + 1500.0 / 5500.0 * (decl - 2.0));
        assert_close(p.remaining_percent.unwrap(), 1500.0 / 5500.0 * 0.8 * 100.0);
    }

    #[test]
    fn known_postal_percentage() {
        let (current, previous) = sample_snapshots();
        let seat = &current.seats[&10];
        let prev = &previous.seats[&10];
        let mut sc = seat_config("Aston");
        sc.declaration_overrides.insert(
            VoteType::Postal,
            DeclarationOverride {
                count: None,
                percent: Some(2.0),
            },
        );
        assert_close(
            expected_volume(VoteType::Postal, seat, prev, Some(&sc)),
            100_000.0 * 0.02 * 0.86,
        );
        let p = project_declaration_votes(seat, prev, Some(&sc), SIDES, Some(2.0));
        let basis = 300.0 / (1720.0 + 500.0);
        assert_close(p.basis, basis);
        assert_close(
            p.remaining_percent.unwrap(),
            (500.0 / 5500.0 + 0.02) * (1.0 - basis) * 100.0,
        );
    }

    #[test]
    fn known_counts_use_their_factor() {
        let (current, previous) = sample_snapshots();
        let mut sc = seat_config("Aston");
        sc.declaration_overrides.insert(
            VoteType::Provisional,
            DeclarationOverride {
                count: Some(1000),
                percent: Some(50.0),
            },
        );
        assert_close(
            expected_volume(
                VoteType::Provisional,
                &current.seats[&10],
                &previous.seats[&10],
                Some(&sc),
            ),
            450.0,
        );
    }

    #[test]
    fn mix_factor_bounds() {
        assert_eq!(mix_factor(0, 0.0, VoteType::Postal), 0.0);
        assert_eq!(mix_factor(10, 0.0, VoteType::Postal), 1.0);
        assert_eq!(mix_factor(9000, 5000.0, VoteType::Postal), 1.0);
        assert_close(mix_factor(150, 1000.0, VoteType::Provisional), 0.5);
    }

    #[test]
    fn count_progress_is_a_percentage() {
        assert_eq!(count_progress(0, 0), 0.0);
        assert_close(count_progress(4300, 100_000), 4.3);
        assert_eq!(count_progress(200, 100), 100.0);
    }
}
