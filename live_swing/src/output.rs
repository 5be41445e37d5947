//! Reshapes the per-run state into seat and party indexed arrays, and
//! renders the diagnostic report.

use std::collections::BTreeMap;
use std::fmt::Write;

use log::warn;

use crate::config::*;
use crate::swing::capped_transformed_swing;
use crate::{RunState, SeatWork};

/// The party columns of the first preference arrays: every configured slot,
/// then the sentinels.
pub fn party_columns(config: &ProjectConfig) -> Vec<PartyIndex> {
    let mut columns: Vec<PartyIndex> = (0..config.parties.len())
        .map(PartyIndex::Resolved)
        .collect();
    columns.extend([
        PartyIndex::CoalitionPartner,
        PartyIndex::Independent,
        PartyIndex::EmergingIndependent,
        PartyIndex::Others,
    ]);
    columns
}

/// Position of a party in `columns`. Parties without a column of their own
/// are counted with the others.
pub fn column_of(columns: &[PartyIndex], index: PartyIndex) -> usize {
    let others = columns.len() - 1;
    columns.iter().position(|c| *c == index).unwrap_or(others)
}

fn empty_seat(name: &str, columns: usize) -> SeatProjection {
    SeatProjection {
        name: name.to_string(),
        major_swing: None,
        major_swing_estimated: false,
        tcp_count_progress: 0.0,
        fp_count_progress: 0.0,
        declaration_basis: None,
        tcp: None,
        fp: vec![None; columns],
        remaining_declaration_percent: None,
        ppvc_sensitivity: None,
        projected_total_votes: None,
    }
}

/// Combines the candidates sharing a column.
///
/// The percentage covers every member. The swings only cover the members
/// with a previous match: the transformed swing is taken between their
/// summed current share and their summed previous share.
pub fn combine_column(members: &[FpProjection], cap: f64) -> Option<FpProjection> {
    match members {
        [] => None,
        [single] => Some(*single),
        _ => {
            let percent: f64 = members.iter().map(|m| m.percent).sum();
            let matched: Vec<(f64, f64)> = members
                .iter()
                .filter_map(|m| m.swing.map(|s| (m.percent, s)))
                .collect();
            let (swing, transformed_swing) = if matched.is_empty() {
                (None, None)
            } else {
                let current: f64 = matched.iter().map(|(p, _)| p).sum();
                let swing: f64 = matched.iter().map(|(_, s)| s).sum();
                let previous = (current - swing).clamp(0.0, 100.0);
                (
                    Some(swing),
                    Some(capped_transformed_swing(previous, current, cap)),
                )
            };
            Some(FpProjection {
                percent,
                swing,
                transformed_swing,
            })
        }
    }
}

fn fp_columns(
    state: &RunState,
    seat: &Seat,
    work: &SeatWork,
    columns: &[PartyIndex],
) -> Vec<Option<FpProjection>> {
    let resolver = &state.resolver;
    let cap = resolver.config.settings.transformed_swing_cap;
    let mut grouped: BTreeMap<usize, Vec<FpProjection>> = BTreeMap::new();
    for (cid, s) in work.fp.iter() {
        let col = column_of(columns, resolver.current_candidate(seat, *cid));
        grouped.entry(col).or_default().push(FpProjection {
            percent: s.percent,
            swing: s.swing,
            transformed_swing: s.transformed_swing,
        });
    }
    let mut res: Vec<Option<FpProjection>> = vec![None; columns.len()];
    for (col, members) in grouped.into_iter() {
        res[col] = combine_column(&members, cap);
    }
    res
}

fn tcp_sides(state: &RunState, seat: &Seat, work: &SeatWork) -> Option<[TcpSide; 2]> {
    if work.classic || work.tcp.len() != 2 {
        return None;
    }
    let adjusted = work.declaration.as_ref().and_then(|d| d.final_swing);
    let sides: Vec<TcpSide> = work
        .tcp
        .iter()
        .map(|(aff, t)| {
            let swing = match (work.declaration_focus, adjusted) {
                (Some(focus), Some(s)) if focus == *aff => Some(s),
                (Some(_), Some(s)) => Some(-s),
                _ => t.swing,
            };
            TcpSide {
                party: state.resolver.current_affiliation(seat, *aff),
                affiliation: *aff,
                percent: t.percent,
                swing,
            }
        })
        .collect();
    match sides.as_slice() {
        [a, b] => Some([*a, *b]),
        _ => None,
    }
}

fn seat_projection(
    state: &RunState,
    seat: &Seat,
    work: &SeatWork,
    columns: &[PartyIndex],
) -> SeatProjection {
    let declaration = work.declaration.as_ref();
    let major_swing = if work.classic {
        declaration
            .and_then(|d| d.final_swing)
            .or(work.major_booth_swing)
    } else {
        work.major_booth_swing
    };
    SeatProjection {
        name: seat.name.clone(),
        major_swing,
        major_swing_estimated: !work.classic || work.major_swing_estimated,
        tcp_count_progress: work.tcp_progress,
        fp_count_progress: work.fp_progress,
        declaration_basis: declaration.map(|d| d.basis),
        tcp: tcp_sides(state, seat, work),
        fp: fp_columns(state, seat, work, columns),
        remaining_declaration_percent: declaration.and_then(|d| d.remaining_percent),
        ppvc_sensitivity: work.ppvc_sensitivity,
        projected_total_votes: declaration.map(|d| d.projected_total_votes),
    }
}

/// Builds the output of a run. There is one seat entry per configured seat,
/// in the configured order.
pub(crate) fn assemble(state: &RunState) -> ProjectionOutput {
    let config = state.resolver.config;
    let current = state.resolver.current;
    let columns = party_columns(config);
    let mut seats: Vec<SeatProjection> = config
        .seats
        .iter()
        .map(|sc| empty_seat(&sc.name, columns.len()))
        .collect();
    for work in state.seats.values() {
        let pos = match work.index {
            SeatIndex::Resolved(pos) => pos,
            SeatIndex::Unresolved => continue,
        };
        if let Some(seat) = current.seats.get(&work.id) {
            seats[pos] = seat_projection(state, seat, work, &columns);
        }
    }
    ProjectionOutput {
        party_columns: columns,
        seats,
        preference_flows: state.flows.iter().collect(),
        ppvc_bias: state.ppvc.observed_bias,
        ppvc_bias_confidence: state.ppvc.confidence,
    }
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) => format!("{:+.2}", x),
        None => "-".to_string(),
    }
}

fn render(state: &RunState, out: &mut String) -> std::fmt::Result {
    let current = state.resolver.current;
    let previous = state.resolver.previous;
    writeln!(out, "Projection of {} against {}", current.name, previous.name)?;
    writeln!(
        out,
        "Preference flows ({} booths, {} rows):",
        state.flows.booths_used, state.flows.data_rows
    )?;
    for (index, flow) in state.flows.iter() {
        writeln!(out, "  {}: {:.2}", index, flow)?;
    }
    writeln!(
        out,
        "PPVC bias: {:.3} (confidence {:.0})",
        state.ppvc.observed_bias, state.ppvc.confidence
    )?;
    for work in state.seats.values() {
        let seat = match current.seats.get(&work.id) {
            Some(s) => s,
            None => continue,
        };
        let previous_name = work
            .previous
            .and_then(|id| previous.seats.get(&id))
            .map(|s| s.name.as_str())
            .unwrap_or("-");
        writeln!(out)?;
        writeln!(
            out,
            "Seat {} (previous: {}) classic: {} fp counted {:.1}% tcp counted {:.1}%",
            seat.name, previous_name, work.classic, work.fp_progress, work.tcp_progress
        )?;
        writeln!(
            out,
            "  booth swing {} main coalition {}",
            fmt_opt(work.major_booth_swing),
            work.coalition_main
        )?;
        if let Some(d) = work.declaration.as_ref() {
            writeln!(
                out,
                "  declaration basis {:.3} swing {} final {} projected votes {:.0} remaining {}",
                d.basis,
                fmt_opt(d.declaration_swing),
                fmt_opt(d.final_swing),
                d.projected_total_votes,
                fmt_opt(d.remaining_percent)
            )?;
        }
        for (cid, s) in work.fp.iter() {
            let name = current
                .candidates
                .get(cid)
                .map(|c| c.name.as_str())
                .unwrap_or("?");
            writeln!(
                out,
                "  fp {} {:.2}% swing {} transformed {}",
                name,
                s.percent,
                fmt_opt(s.swing),
                fmt_opt(s.transformed_swing)
            )?;
        }
        for (aff, t) in work.tcp.iter() {
            writeln!(
                out,
                "  tcp {} {:.2}% swing {}",
                state.resolver.current_affiliation(seat, *aff),
                t.percent,
                fmt_opt(t.swing)
            )?;
        }
        for bw in work.booths.iter() {
            let name = current
                .booths
                .get(&bw.id)
                .map(|b| b.name.as_str())
                .unwrap_or("?");
            writeln!(
                out,
                "    booth {} ({} fp, {} tcp) matched: {} tpp {} swing {}{}",
                name,
                bw.fp_votes,
                bw.tcp_votes,
                bw.previous.is_some(),
                fmt_opt(bw.tpp.estimate),
                fmt_opt(bw.tpp.swing),
                if bw.tpp.estimated { " (estimated)" } else { "" }
            )?;
        }
    }
    Ok(())
}

/// The seat by seat, booth by booth text dump of a run.
pub(crate) fn diagnostic_report(state: &RunState) -> String {
    let mut out = String::new();
    if let Err(e) = render(state, &mut out) {
        warn!("diagnostic_report: could not render the report: {}", e);
    }
    out
}
