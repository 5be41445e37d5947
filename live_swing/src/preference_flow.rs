//! Estimation of the preference flows from the booth results.
//!
//! Every qualifying booth contributes a row: the first preference shares of
//! each party column are the features, and the share of the first major party
//! in the booth's two-candidate count is the target. A booth qualifies when its
//! two-candidate count involves a major party and at most one member of the
//! major coalition. The coefficients of the
//! weighted least squares fit are the percentages of each column's vote that
//! end up with the first major party.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use log::{debug, info, warn};

use crate::config::*;
use crate::identity::Resolver;

const SINGULAR_EPSILON: f64 = 1e-12;

/// The features of the regression.
///
/// Parties sharing a regression group are merged into the column of the
/// first slot of that group.
#[derive(PartialEq, Debug, Clone)]
pub struct FlowColumns {
    columns: Vec<PartyIndex>,
    positions: BTreeMap<PartyIndex, usize>,
}

impl FlowColumns {
    pub fn new(config: &ProjectConfig) -> FlowColumns {
        let mut columns: Vec<PartyIndex> = Vec::new();
        let mut positions: BTreeMap<PartyIndex, usize> = BTreeMap::new();
        let mut groups: BTreeMap<&str, usize> = BTreeMap::new();
        for (slot, party) in config.parties.iter().enumerate() {
            let shared = party
                .regression_group
                .as_deref()
                .and_then(|g| groups.get(g).copied());
            let pos = match shared {
                Some(pos) => pos,
                None => {
                    columns.push(PartyIndex::Resolved(slot));
                    columns.len() - 1
                }
            };
            if let Some(g) = party.regression_group.as_deref() {
                groups.entry(g).or_insert(pos);
            }
            positions.insert(PartyIndex::Resolved(slot), pos);
        }
        for index in [
            PartyIndex::CoalitionPartner,
            PartyIndex::Independent,
            PartyIndex::EmergingIndependent,
            PartyIndex::Others,
        ] {
            columns.push(index);
            positions.insert(index, columns.len() - 1);
        }
        FlowColumns { columns, positions }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// The column a party contributes to. Unresolved parties count as others.
    pub fn position(&self, index: PartyIndex) -> usize {
        let key = match index {
            PartyIndex::Unresolved => PartyIndex::Others,
            PartyIndex::Resolved(slot) if !self.positions.contains_key(&index) => {
                warn!("FlowColumns::position: slot {} is not configured", slot);
                PartyIndex::Others
            }
            _ => index,
        };
        self.positions[&key]
    }

    /// All the party indices that share each column.
    fn members(&self) -> impl Iterator<Item = (PartyIndex, usize)> + '_ {
        self.positions.iter().map(|(k, v)| (*k, *v))
    }
}

/// Fitted flows, in percent, towards the first major party.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct PreferenceFlows {
    flows: BTreeMap<PartyIndex, f64>,
    /// Regression rows coming from booth data, after replication.
    pub data_rows: u64,
    pub booths_used: usize,
}

impl PreferenceFlows {
    /// The fitted flow, or `None` when no booth qualified for the fit.
    pub fn get(&self, index: PartyIndex) -> Option<f64> {
        let key = match index {
            PartyIndex::Unresolved => PartyIndex::Others,
            _ => index,
        };
        self.flows.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartyIndex, f64)> + '_ {
        self.flows.iter().map(|(k, v)| (*k, *v))
    }
}

/// The flow assumed for a party before looking at any data.
pub fn prior_flow(index: PartyIndex, config: &ProjectConfig) -> f64 {
    let settings = &config.settings;
    let fallback = config
        .default_preference_flow
        .unwrap_or(settings.unknown_flow);
    match index {
        PartyIndex::Resolved(0) => 100.0,
        PartyIndex::Resolved(1) => 0.0,
        PartyIndex::Resolved(slot) => config
            .parties
            .get(slot)
            .and_then(|p| p.preference_flow)
            .unwrap_or(fallback),
        PartyIndex::CoalitionPartner => settings.coalition_sibling_flow,
        PartyIndex::Independent
        | PartyIndex::EmergingIndependent
        | PartyIndex::Others
        | PartyIndex::Unresolved => fallback,
    }
}

// Two resolved sides, at least one of them a major party, at most one of
// them in the major coalition.
fn qualifies_for_fit(parties: &[PartyIndex]) -> bool {
    parties.len() == 2
        && parties.iter().all(|p| p.is_resolved())
        && parties.iter().filter(|p| p.is_coalition()).count() <= 1
        && parties
            .iter()
            .any(|p| *p == PartyIndex::MAJOR_A || *p == PartyIndex::MAJOR_B)
}

// The share of the first major party. When only the second major party is in
// the count, everything it did not get is counted for the first one.
fn major_share(resolver: &Resolver, seat: &Seat, booth: &Booth) -> f64 {
    let total = booth.tcp_total() as f64;
    let votes_of = |index: PartyIndex| -> u64 {
        booth
            .tcp_votes
            .iter()
            .filter(|(aff, _)| resolver.current_affiliation(seat, **aff) == index)
            .map(|(_, v)| *v)
            .sum()
    };
    let parties = resolver.booth_tcp_parties(seat, booth);
    if parties.contains(&PartyIndex::MAJOR_A) {
        votes_of(PartyIndex::MAJOR_A) as f64 * 100.0 / total
    } else {
        100.0 - votes_of(PartyIndex::MAJOR_B) as f64 * 100.0 / total
    }
}

struct Row {
    features: Vec<f64>,
    target: f64,
    weight: f64,
}

fn unit_row(n: usize, pos: usize, target: f64, weight: f64) -> Row {
    let mut features = vec![0.0; n];
    features[pos] = 1.0;
    Row {
        features,
        target,
        weight,
    }
}

// One row per qualifying booth. The row weight stands for the replication of
// the row once per block of two-candidate votes.
fn booth_rows(resolver: &Resolver, columns: &FlowColumns) -> (Vec<Row>, u64, usize) {
    let current = resolver.current;
    let per_row = resolver.config.settings.votes_per_regression_row.max(1);
    let mut rows: Vec<Row> = Vec::new();
    let mut replicated: u64 = 0;
    for seat in current.seats.values() {
        let seat_parties = resolver.seat_tcp_parties(seat);
        if !seat_parties.is_empty() && !qualifies_for_fit(&seat_parties) {
            continue;
        }
        for booth in seat.booths.iter().filter_map(|id| current.booths.get(id)) {
            let fp_total = booth.fp_total();
            let tcp_total = booth.tcp_total();
            if fp_total == 0 || tcp_total == 0 {
                continue;
            }
            if !qualifies_for_fit(&resolver.booth_tcp_parties(seat, booth)) {
                continue;
            }
            let target = major_share(resolver, seat, booth);
            let mut features = vec![0.0; columns.len()];
            for (cid, votes) in booth.fp_votes.iter() {
                let index = resolver.current_candidate(seat, *cid);
                features[columns.position(index)] += *votes as f64 / fp_total as f64;
            }
            let copies = ((tcp_total as f64 / per_row as f64).round() as u64).max(1);
            replicated += copies;
            rows.push(Row {
                features,
                target,
                weight: copies as f64,
            });
            debug!(
                "booth_rows: {} / {}: target {:.2}, weight {}",
                seat.name, booth.name, target, copies
            );
        }
    }
    let count = rows.len();
    (rows, replicated, count)
}

/// Solves the normal equations of the weighted least squares problem by
/// Gaussian elimination with partial pivoting. `None` if the system is
/// singular.
fn weighted_least_squares(rows: &[Row], n: usize) -> Option<Vec<f64>> {
    let mut a = vec![vec![0.0; n]; n];
    let mut b = vec![0.0; n];
    for row in rows.iter() {
        for i in 0..n {
            let xi = row.features[i];
            if xi == 0.0 {
                continue;
            }
            b[i] += row.weight * xi * row.target;
            for j in 0..n {
                a[i][j] += row.weight * xi * row.features[j];
            }
        }
    }
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| {
            a[i][col]
                .abs()
                .partial_cmp(&a[j][col].abs())
                .unwrap_or(Ordering::Equal)
        })?;
        if a[pivot][col].abs() < SINGULAR_EPSILON {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        let pivot_row = a[col].clone();
        let pivot_b = b[col];
        for r in (col + 1)..n {
            let factor = a[r][col] / pivot_row[col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[r][k] -= factor * pivot_row[k];
            }
            b[r] -= factor * pivot_b;
        }
    }
    let mut x = vec![0.0; n];
    for r in (0..n).rev() {
        let s: f64 = ((r + 1)..n).map(|k| a[r][k] * x[k]).sum();
        x[r] = (b[r] - s) / a[r][r];
    }
    Some(x)
}

/// Fits the preference flows on the current election's booths.
///
/// Returns no flows at all if no booth qualifies: callers then fall back on
/// the configured priors.
pub fn estimate_preference_flows(resolver: &Resolver) -> PreferenceFlows {
    let config = resolver.config;
    let settings = &config.settings;
    let columns = FlowColumns::new(config);
    let n = columns.len();
    let (mut rows, data_rows, booths_used) = booth_rows(resolver, &columns);
    if rows.is_empty() {
        info!("estimate_preference_flows: no qualifying booth, using priors");
        return PreferenceFlows::default();
    }

    // Anchors for the majors, priors for everyone else.
    let mut priors: Vec<Option<f64>> = vec![None; n];
    for (index, pos) in columns.members() {
        if priors[pos].is_none() {
            priors[pos] = Some(prior_flow(index, config));
        }
    }
    let major_a = columns.position(PartyIndex::MAJOR_A);
    let major_b = columns.position(PartyIndex::MAJOR_B);
    for (pos, prior) in priors.iter().enumerate() {
        let prior = prior.unwrap_or(settings.unknown_flow);
        if pos == major_a {
            rows.push(unit_row(n, pos, 100.0, settings.anchor_weight));
        } else if pos == major_b {
            rows.push(unit_row(n, pos, 0.0, settings.anchor_weight));
        } else {
            rows.push(unit_row(n, pos, prior, settings.prior_weight));
        }
    }

    let fitted = weighted_least_squares(&rows, n);
    if fitted.is_none() {
        warn!("estimate_preference_flows: singular system, using priors");
    }
    let mut flows = BTreeMap::new();
    for (index, pos) in columns.members() {
        let prior = priors[pos].unwrap_or(settings.unknown_flow);
        let value = fitted
            .as_ref()
            .map(|x| x[pos])
            .filter(|v| v.is_finite())
            .unwrap_or(prior);
        flows.insert(index, value.clamp(0.0, 100.0));
    }
    info!(
        "estimate_preference_flows: {} booths, {} rows, {} flows",
        booths_used,
        data_rows,
        flows.len()
    );
    PreferenceFlows {
        flows,
        data_rows,
        booths_used,
    }
}
