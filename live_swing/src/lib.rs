mod config;
use log::{debug, info, warn};

use std::collections::BTreeMap;

pub use crate::config::*;

pub mod bias;
pub mod builder;
pub mod declaration;
pub mod identity;
pub mod manual;
pub mod matching;
pub mod output;
pub mod preference_flow;
pub mod swing;
pub mod tcp_estimate;

#[cfg(test)]
mod test_support;

use crate::bias::{BoothSwingSample, PpvcBias};
use crate::declaration::DeclarationProjection;
use crate::identity::{is_classic_contest, Resolver};
use crate::preference_flow::PreferenceFlows;
use crate::swing::{FpSwing, TcpSwing};
use crate::tcp_estimate::BoothTpp;

// **** Per-run working state ****

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct BoothWork {
    pub(crate) id: i32,
    pub(crate) previous: Option<i32>,
    pub(crate) fp_votes: u64,
    pub(crate) tcp_votes: u64,
    pub(crate) fp: BTreeMap<i32, FpSwing>,
    pub(crate) tcp: BTreeMap<i32, TcpSwing>,
    pub(crate) tpp: BoothTpp,
}

#[derive(PartialEq, Debug, Clone)]
pub(crate) struct SeatWork {
    pub(crate) id: i32,
    pub(crate) index: SeatIndex,
    pub(crate) previous: Option<i32>,
    // (current affiliation, previous affiliation)
    pub(crate) matched_parties: Vec<(i32, i32)>,
    pub(crate) candidate_matches: BTreeMap<i32, Option<i32>>,
    pub(crate) classic: bool,
    pub(crate) coalition_main: PartyIndex,
    pub(crate) booths: Vec<BoothWork>,
    pub(crate) fp: BTreeMap<i32, FpSwing>,
    pub(crate) tcp: BTreeMap<i32, TcpSwing>,
    pub(crate) major_booth_swing: Option<f64>,
    // Some of the booth swings behind `major_booth_swing` are estimates.
    pub(crate) major_swing_estimated: bool,
    pub(crate) fp_progress: f64,
    pub(crate) tcp_progress: f64,
    // The affiliation the declaration swings refer to.
    pub(crate) declaration_focus: Option<i32>,
    pub(crate) declaration: Option<DeclarationProjection>,
    pub(crate) ppvc_sensitivity: Option<f64>,
}

/// Everything computed during one run. Owned by that run only.
pub(crate) struct RunState<'a> {
    pub(crate) resolver: Resolver<'a>,
    pub(crate) seats: BTreeMap<i32, SeatWork>,
    pub(crate) flows: PreferenceFlows,
    pub(crate) ppvc: PpvcBias,
}

/// Runs the whole projection pipeline on a pair of snapshots.
///
/// Arguments:
/// * `current` the partially counted results of the election in progress
/// * `previous` the complete results of the election used as a baseline
/// * `config` the party and seat configuration
///
/// The stages run in a fixed order, each one reading what the previous ones
/// computed. Running twice on the same inputs gives the same result.
pub fn run_projection(
    current: &ElectionSnapshot,
    previous: &ElectionSnapshot,
    config: &ProjectConfig,
) -> Result<ProjectionRun, ProjectionError> {
    info!(
        "Projecting {} ({} seats, {} booths) against {} ({} seats)",
        current.name,
        current.seats.len(),
        current.booths.len(),
        previous.name,
        previous.seats.len()
    );
    let resolver = Resolver::new(current, previous, config)?;
    let mut state = RunState {
        resolver,
        seats: BTreeMap::new(),
        flows: PreferenceFlows::default(),
        ppvc: PpvcBias::default(),
    };
    match_seats(&mut state);
    state.flows = preference_flow::estimate_preference_flows(&state.resolver);
    compute_swings(&mut state);
    estimate_tcp(&mut state);
    compute_count_progress(&mut state);
    project_declarations(&mut state);
    estimate_bias(&mut state);

    let output = output::assemble(&state);
    let diagnostics = output::diagnostic_report(&state);
    info!(
        "run_projection: {} seats, ppvc bias {:.3} (confidence {:.0})",
        output.seats.len(),
        output.ppvc_bias,
        output.ppvc_bias_confidence
    );
    Ok(ProjectionRun {
        output,
        diagnostics,
    })
}

fn match_seats(state: &mut RunState) {
    let resolver = &state.resolver;
    let current = resolver.current;
    let previous = resolver.previous;
    for seat in current.seats.values() {
        let previous_seat = match matching::find_best_matching_previous_seat(
            seat,
            previous,
            resolver.seat_config(seat),
        ) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("match_seats: {}: only current figures will be computed", e);
                None
            }
        };
        let matched_parties = previous_seat
            .map(|ps| matching::find_matched_parties(ps, seat, resolver))
            .unwrap_or_default();
        if previous_seat.is_some() && matched_parties.len() < 2 {
            debug!(
                "match_seats: {}: {} matched two-candidate parties",
                seat.name,
                matched_parties.len()
            );
        }
        let booths = seat
            .booths
            .iter()
            .filter_map(|id| current.booths.get(id))
            .map(|booth| BoothWork {
                id: booth.id,
                previous: previous_seat
                    .and_then(|ps| matching::find_matching_previous_booth(booth, ps, previous))
                    .map(|b| b.id),
                fp_votes: booth.fp_total(),
                tcp_votes: booth.tcp_total(),
                fp: BTreeMap::new(),
                tcp: BTreeMap::new(),
                tpp: BoothTpp::default(),
            })
            .collect();
        let work = SeatWork {
            id: seat.id,
            index: resolver.seat_index(seat),
            previous: previous_seat.map(|ps| ps.id),
            matched_parties,
            candidate_matches: matching::match_candidates(seat, previous_seat, resolver),
            classic: is_classic_contest(&resolver.seat_tcp_parties(seat)),
            coalition_main: PartyIndex::MAJOR_B,
            booths,
            fp: BTreeMap::new(),
            tcp: BTreeMap::new(),
            major_booth_swing: None,
            major_swing_estimated: false,
            fp_progress: 0.0,
            tcp_progress: 0.0,
            declaration_focus: None,
            declaration: None,
            ppvc_sensitivity: None,
        };
        state.seats.insert(seat.id, work);
    }
    info!("match_seats: {} seats matched", state.seats.len());
}

fn compute_swings(state: &mut RunState) {
    let resolver = &state.resolver;
    let current = resolver.current;
    let previous = resolver.previous;
    let cap = resolver.config.settings.transformed_swing_cap;
    for work in state.seats.values_mut() {
        let seat = match current.seats.get(&work.id) {
            Some(s) => s,
            None => continue,
        };
        let previous_seat = work.previous.and_then(|id| previous.seats.get(&id));
        for bw in work.booths.iter_mut() {
            let booth = match current.booths.get(&bw.id) {
                Some(b) => b,
                None => continue,
            };
            let previous_booth = bw.previous.and_then(|id| previous.booths.get(&id));
            bw.fp = swing::booth_fp_swings(booth, previous_booth, &work.candidate_matches, cap);
            bw.tcp = swing::booth_tcp_swings(booth, previous_booth, &work.matched_parties);
        }
        let booth_votes: u64 = work.booths.iter().map(|b| b.fp_votes).sum();
        if booth_votes != seat.fp_total_of(VoteType::Ordinary) {
            warn!(
                "compute_swings: {}: booths add up to {} ordinary votes, the seat reports {}",
                seat.name,
                booth_votes,
                seat.fp_total_of(VoteType::Ordinary)
            );
        }
        work.fp = swing::seat_fp_swings(
            seat,
            previous_seat,
            work.booths.iter().map(|b| (b.fp_votes, &b.fp)),
            &work.candidate_matches,
            cap,
        );
        work.tcp =
            swing::seat_tcp_swings(seat, work.booths.iter().map(|b| (b.tcp_votes, &b.tcp)));
    }
}

fn estimate_tcp(state: &mut RunState) {
    let resolver = &state.resolver;
    let flows = &state.flows;
    let current = resolver.current;
    let previous = resolver.previous;
    for work in state.seats.values_mut() {
        let seat = match current.seats.get(&work.id) {
            Some(s) => s,
            None => continue,
        };
        work.coalition_main = tcp_estimate::choose_coalition_main(resolver, seat);
        for bw in work.booths.iter_mut() {
            let booth = match current.booths.get(&bw.id) {
                Some(b) => b,
                None => continue,
            };
            let previous_booth = bw.previous.and_then(|id| previous.booths.get(&id));
            bw.tpp = tcp_estimate::booth_tpp(
                resolver,
                flows,
                seat,
                booth,
                previous_booth,
                &bw.tcp,
                work.coalition_main,
            );
        }
        work.major_booth_swing =
            tcp_estimate::seat_major_swing(work.booths.iter().map(|b| (b.fp_votes, &b.tpp)));
        work.major_swing_estimated = tcp_estimate::seat_major_swing_estimated(
            work.booths.iter().map(|b| (b.fp_votes, &b.tpp)),
        );
        debug!(
            "estimate_tcp: {}: main coalition {}, booth swing {:?}",
            seat.name, work.coalition_main, work.major_booth_swing
        );
    }
}

fn compute_count_progress(state: &mut RunState) {
    let current = state.resolver.current;
    for work in state.seats.values_mut() {
        if let Some(seat) = current.seats.get(&work.id) {
            work.fp_progress = declaration::count_progress(seat.fp_total(), seat.enrolment);
            work.tcp_progress = declaration::count_progress(seat.tcp_total(), seat.enrolment);
        }
    }
}

// The matched pair the declaration swings are measured on, focus side first.
fn declaration_sides(
    resolver: &Resolver,
    seat: &Seat,
    work: &SeatWork,
) -> Option<[(i32, i32); 2]> {
    let pairs = &work.matched_parties;
    if pairs.len() != 2 {
        return None;
    }
    let focus = if work.classic {
        pairs
            .iter()
            .position(|(c, _)| resolver.current_affiliation(seat, *c) == PartyIndex::MAJOR_A)?
    } else {
        0
    };
    Some([pairs[focus], pairs[1 - focus]])
}

fn project_declarations(state: &mut RunState) {
    let resolver = &state.resolver;
    let current = resolver.current;
    let previous = resolver.previous;
    for work in state.seats.values_mut() {
        let seat = match current.seats.get(&work.id) {
            Some(s) => s,
            None => continue,
        };
        let previous_seat = match work.previous.and_then(|id| previous.seats.get(&id)) {
            Some(s) => s,
            None => {
                warn!(
                    "project_declarations: {}: no previous seat, skipping",
                    seat.name
                );
                continue;
            }
        };
        let sides = declaration_sides(resolver, seat, work);
        let ordinary_swing = if work.classic {
            work.major_booth_swing
        } else {
            sides.and_then(|[(c, _), _]| work.tcp.get(&c).and_then(|t| t.swing))
        };
        work.declaration_focus = sides.map(|[(c, _), _]| c);
        work.declaration = Some(declaration::project_declaration_votes(
            seat,
            previous_seat,
            resolver.seat_config(seat),
            sides,
            ordinary_swing,
        ));
    }
}

fn estimate_bias(state: &mut RunState) {
    let resolver = &state.resolver;
    let current = resolver.current;
    let previous = resolver.previous;
    let mut differences: Vec<(f64, f64)> = Vec::new();
    for work in state.seats.values_mut() {
        let seat = match current.seats.get(&work.id) {
            Some(s) => s,
            None => continue,
        };
        let previous_seat = match work.previous.and_then(|id| previous.seats.get(&id)) {
            Some(s) => s,
            None => continue,
        };
        work.ppvc_sensitivity =
            bias::seat_ppvc_sensitivity(current, seat, previous, previous_seat);
        let previous_classic =
            is_classic_contest(&resolver.previous_seat_tcp_parties(previous_seat));
        if !(work.classic && previous_classic) {
            continue;
        }
        let samples: Vec<BoothSwingSample> = work
            .booths
            .iter()
            .filter_map(|bw| {
                let booth = current.booths.get(&bw.id)?;
                Some(BoothSwingSample {
                    kind: booth.kind,
                    votes: bw.tcp_votes,
                    swing: if bw.tpp.estimated { None } else { bw.tpp.swing },
                })
            })
            .collect();
        if let Some(d) = bias::seat_ppvc_difference(&samples) {
            debug!(
                "estimate_bias: {}: difference {:.3}, weight {}",
                seat.name, d.0, d.1
            );
            differences.push(d);
        }
    }
    state.ppvc = bias::observed_ppvc_bias(differences);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SnapshotBuilder;
    use crate::test_support::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn fully_counted_ordinary_swing() {
        init();
        let (current, previous) = two_party_seat((22_000, 18_000), (20_800, 19_200));
        let config = sample_config();
        let run = run_projection(&current, &previous, &config).unwrap();
        let aston = &run.output.seats[0];
        assert_eq!(aston.name, "Aston");
        assert_close(aston.major_swing.unwrap(), -3.0);
        assert!(!aston.major_swing_estimated);
        assert_eq!(aston.declaration_basis, Some(0.0));
        assert_eq!(aston.tcp, None);
        assert_close(aston.fp_count_progress, 40.0);
    }

    #[test]
    fn sample_election() {
        init();
        let (current, previous) = sample_snapshots();
        let config = sample_config();
        let run = run_projection(&current, &previous, &config).unwrap();
        let out = &run.output;

        let aston = &out.seats[0];
        // Booths swing 5, 5 and 0, and the postals pull slightly further.
        assert_close(aston.major_swing.unwrap(), 2.5 + 1.0 / 22.0);
        assert_close(aston.declaration_basis.unwrap(), 0.2);
        assert_close(aston.tcp_count_progress, 4.3);
        assert_close(aston.projected_total_votes.unwrap(), 5500.0);
        assert_close(aston.ppvc_sensitivity.unwrap(), 0.0);

        let wills = &out.seats[1];
        assert!(wills.major_swing_estimated);
        assert_eq!(wills.major_swing, None);
        let tcp = wills.tcp.unwrap();
        assert_eq!(tcp[0].party, PartyIndex::MAJOR_A);
        assert_close(tcp[0].percent, 56.0);
        assert_close(tcp[0].swing.unwrap(), -4.0);
        assert_close(tcp[1].swing.unwrap(), 4.0);
        // The Socialists did not run last time.
        let vs = out
            .party_columns
            .iter()
            .position(|p| *p == PartyIndex::Resolved(4))
            .unwrap();
        assert!(wills.fp[vs].unwrap().swing.is_none());
        assert_close(wills.fp[vs].unwrap().percent, 4.0);

        assert_close(out.ppvc_bias, -5.0);
        assert_close(out.ppvc_bias_confidence, 2000.0);
        assert!(run.diagnostics.contains("Aston"));
    }

    #[test]
    fn classic_seat_without_booth_counts_is_estimated() {
        init();
        let (_, previous) = two_party_seat((550, 450), (520, 480));
        let mut b = SnapshotBuilder::new("current")
            .party(1, "Australian Labor Party", "ALP")
            .unwrap()
            .party(2, "Liberal", "LP")
            .unwrap()
            .candidate(101, "Labor candidate", 1)
            .unwrap()
            .candidate(102, "Liberal candidate", 2)
            .unwrap()
            .seat(10, "Aston", 100_000)
            .unwrap()
            .booth(10, 1001, "Boronia", BoothKind::Normal)
            .unwrap();
        b.add_booth_fp(1001, 101, 520).unwrap();
        b.add_booth_fp(1001, 102, 480).unwrap();
        // Only the postals have a two-candidate count so far.
        b.add_seat_fp(10, 101, VoteType::Postal, 50).unwrap();
        b.add_seat_fp(10, 102, VoteType::Postal, 50).unwrap();
        b.add_seat_tcp(10, 1, VoteType::Postal, 50).unwrap();
        b.add_seat_tcp(10, 2, VoteType::Postal, 50).unwrap();
        let current = b.build().unwrap();

        let config = sample_config();
        let run = run_projection(&current, &previous, &config).unwrap();
        let aston = &run.output.seats[0];
        assert!(aston.major_swing_estimated);
        assert_close(aston.major_swing.unwrap(), -3.0);

        let (current, previous) = two_party_seat((550, 450), (520, 480));
        let run = run_projection(&current, &previous, &config).unwrap();
        assert!(!run.output.seats[0].major_swing_estimated);
    }

    #[test]
    fn runs_are_deterministic() {
        let (current, previous) = sample_snapshots();
        let config = sample_config();
        let a = run_projection(&current, &previous, &config).unwrap();
        let b = run_projection(&current, &previous, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn seat_without_previous_match_is_not_fatal() {
        init();
        let (current, mut previous) = sample_snapshots();
        previous.seats.remove(&20);
        let config = sample_config();
        let run = run_projection(&current, &previous, &config).unwrap();
        let wills = &run.output.seats[1];
        assert_eq!(wills.declaration_basis, None);
        assert_eq!(wills.remaining_declaration_percent, None);
        assert!(wills.fp.iter().flatten().all(|fp| fp.swing.is_none()));
        assert!(wills.fp.iter().flatten().any(|fp| fp.percent > 0.0));
    }

    #[test]
    fn fatal_configuration_errors() {
        let (current, previous) = sample_snapshots();
        let mut config = sample_config();
        config.parties.truncate(1);
        assert_eq!(
            run_projection(&current, &previous, &config).unwrap_err(),
            ProjectionError::MissingMajorParties
        );
    }
}
