//! Early voting centre (PPVC) bias and sensitivity estimators.

use log::debug;

use crate::config::*;
use crate::swing::weighted_average;

/// The two-party swing observed at one booth of a seat.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct BoothSwingSample {
    pub kind: BoothKind,
    /// Two-candidate votes counted at the booth.
    pub votes: u64,
    pub swing: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct PpvcBias {
    /// How much more the early voting centres swing than ordinary booths.
    pub observed_bias: f64,
    /// Total early voting centre votes behind the estimate.
    pub confidence: f64,
}

fn kind_swing(booths: &[BoothSwingSample], early: bool) -> Option<f64> {
    weighted_average(
        booths
            .iter()
            .filter(|b| (b.kind == BoothKind::EarlyVotingCentre) == early)
            .filter(|b| early || b.kind == BoothKind::Normal)
            .map(|b| (b.votes as f64, b.swing)),
    )
}

/// The difference between the early voting centre swing and the ordinary
/// booth swing in one seat, with the early voting votes as its weight.
pub fn seat_ppvc_difference(booths: &[BoothSwingSample]) -> Option<(f64, f64)> {
    let normal = kind_swing(booths, false)?;
    let early = kind_swing(booths, true)?;
    let weight: u64 = booths
        .iter()
        .filter(|b| b.kind == BoothKind::EarlyVotingCentre && b.swing.is_some())
        .map(|b| b.votes)
        .sum();
    Some((early - normal, weight as f64))
}

/// Combines the seat differences into the overall bias.
pub fn observed_ppvc_bias<I>(differences: I) -> PpvcBias
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut confidence = 0.0;
    let mut sum = 0.0;
    for (difference, weight) in differences {
        confidence += weight;
        sum += difference * weight;
    }
    if confidence > 0.0 {
        PpvcBias {
            observed_bias: sum / confidence,
            confidence,
        }
    } else {
        PpvcBias::default()
    }
}

/// How much the early voting share of the counted votes is still expected to
/// grow.
///
/// `ordinary_counted` and `early_counted` are the fractions of the ordinary
/// and early voting centre votes counted so far, `early_share` is the share
/// of early voting centre votes in the complete count.
pub fn ppvc_sensitivity(
    ordinary_counted: f64,
    early_counted: f64,
    early_share: f64,
) -> Option<f64> {
    let ordinary_share = 1.0 - early_share;
    let counted = ordinary_counted * ordinary_share + early_counted * early_share;
    if counted <= 0.0 {
        return None;
    }
    Some(early_share - early_counted * early_share / counted)
}

fn booth_votes(snapshot: &ElectionSnapshot, seat: &Seat, kind: BoothKind) -> u64 {
    seat.booths
        .iter()
        .filter_map(|id| snapshot.booths.get(id))
        .filter(|b| b.kind == kind)
        .map(|b| b.fp_total())
        .sum()
}

/// Sensitivity of a seat, from its booth counts against the previous
/// election's.
pub fn seat_ppvc_sensitivity(
    current: &ElectionSnapshot,
    seat: &Seat,
    previous: &ElectionSnapshot,
    previous_seat: &Seat,
) -> Option<f64> {
    let previous_ordinary = booth_votes(previous, previous_seat, BoothKind::Normal);
    let previous_early = booth_votes(previous, previous_seat, BoothKind::EarlyVotingCentre);
    if previous_ordinary == 0 || previous_early == 0 {
        return None;
    }
    let ordinary_counted = (booth_votes(current, seat, BoothKind::Normal) as f64
        / previous_ordinary as f64)
        .clamp(0.0, 1.0);
    let early_counted = (booth_votes(current, seat, BoothKind::EarlyVotingCentre) as f64
        / previous_early as f64)
        .clamp(0.0, 1.0);
    let early_share = previous_early as f64 / (previous_early + previous_ordinary) as f64;
    let res = ppvc_sensitivity(ordinary_counted, early_counted, early_share);
    debug!(
        "seat_ppvc_sensitivity: {}: ordinary {:.3}, early {:.3}, share {:.3} -> {:?}",
        seat.name, ordinary_counted, early_counted, early_share, res
    );
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn sample(kind: BoothKind, votes: u64, swing: Option<f64>) -> BoothSwingSample {
        BoothSwingSample { kind, votes, swing }
    }

    #[test]
    fn seat_difference() {
        let booths = [
            sample(BoothKind::Normal, 1000, Some(5.0)),
            sample(BoothKind::Normal, 3000, Some(1.0)),
            sample(BoothKind::Hospital, 100, Some(40.0)),
            sample(BoothKind::EarlyVotingCentre, 2000, Some(-1.0)),
            sample(BoothKind::EarlyVotingCentre, 500, None),
        ];
        let (diff, weight) = seat_ppvc_difference(&booths).unwrap();
        assert_close(diff, -1.0 - 2.0);
        assert_close(weight, 2000.0);

        let no_early = [sample(BoothKind::Normal, 1000, Some(5.0))];
        assert_eq!(seat_ppvc_difference(&no_early), None);
    }

    #[test]
    fn bias_is_weighted_by_early_votes() {
        let b = observed_ppvc_bias(vec![(-3.0, 2000.0), (1.0, 6000.0)]);
        assert_close(b.observed_bias, 0.0);
        assert_close(b.confidence, 8000.0);
        assert_eq!(observed_ppvc_bias(Vec::new()), PpvcBias::default());
    }

    #[test]
    fn sensitivity_formula() {
        // Everything counted: nothing left to move.
        assert_close(ppvc_sensitivity(1.0, 1.0, 0.3).unwrap(), 0.0);
        // No early votes counted yet.
        assert_close(ppvc_sensitivity(0.5, 0.0, 0.3).unwrap(), 0.3);
        // Half of the ordinary votes and all the early votes.
        let s = ppvc_sensitivity(0.5, 1.0, 0.5).unwrap();
        assert_close(s, 0.5 - 0.5 / 0.75);
        assert_eq!(ppvc_sensitivity(0.0, 0.0, 0.5), None);
    }

    #[test]
    fn seat_sensitivity() {
        let (current, previous) = sample_snapshots();
        let s = seat_ppvc_sensitivity(
            &current,
            &current.seats[&10],
            &previous,
            &previous.seats[&10],
        );
        assert_close(s.unwrap(), 0.0);
        // Wills has no early voting centre.
        let s = seat_ppvc_sensitivity(
            &current,
            &current.seats[&20],
            &previous,
            &previous.seats[&20],
        );
        assert_eq!(s, None);
    }
}
