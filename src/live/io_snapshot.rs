use crate::live::*;

use live_swing::builder::SnapshotBuilder;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub id: i32,
    pub name: String,
    #[serde(rename = "shortCode")]
    pub short_code: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CandidateEntry {
    pub id: i32,
    pub name: String,
    /// Missing for independents.
    pub party: Option<i32>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BoothEntry {
    pub id: i32,
    pub name: String,
    pub kind: Option<String>,
    /// Ordinary first preference votes, by candidate id.
    #[serde(default)]
    pub fp: BTreeMap<String, u64>,
    /// Ordinary two-candidate votes, by party id (-1 for independents).
    #[serde(default)]
    pub tcp: BTreeMap<String, u64>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FpEntry {
    pub candidate: i32,
    #[serde(rename = "voteType")]
    pub vote_type: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TcpEntry {
    pub party: i32,
    #[serde(rename = "voteType")]
    pub vote_type: String,
    pub votes: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatEntry {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub enrolment: u64,
    #[serde(default)]
    pub booths: Vec<BoothEntry>,
    /// Votes counted outside of the booths.
    #[serde(default)]
    pub fp: Vec<FpEntry>,
    #[serde(default)]
    pub tcp: Vec<TcpEntry>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub name: String,
    #[serde(default)]
    pub parties: Vec<PartyEntry>,
    #[serde(default)]
    pub candidates: Vec<CandidateEntry>,
    #[serde(default)]
    pub seats: Vec<SeatEntry>,
}

fn booth_kind(kind: &Option<String>) -> LiveResult<BoothKind> {
    match kind.as_deref() {
        None | Some("normal") => Ok(BoothKind::Normal),
        Some("earlyVotingCentre") | Some("ppvc") => Ok(BoothKind::EarlyVotingCentre),
        Some("remote") => Ok(BoothKind::Remote),
        Some("hospital") => Ok(BoothKind::Hospital),
        Some("prison") => Ok(BoothKind::Prison),
        Some("other") => Ok(BoothKind::Other),
        Some(x) => whatever!("unknown booth kind: {}", x),
    }
}

fn vote_type(name: &str) -> LiveResult<VoteType> {
    match name {
        "ordinary" => Ok(VoteType::Ordinary),
        "absent" => Ok(VoteType::Absent),
        "provisional" => Ok(VoteType::Provisional),
        "prePoll" => Ok(VoteType::PrePoll),
        "postal" => Ok(VoteType::Postal),
        "early" => Ok(VoteType::Early),
        _ => whatever!("unknown vote type: {}", name),
    }
}

fn parse_id(key: &str) -> LiveResult<i32> {
    match key.trim().parse::<i32>() {
        Ok(id) => Ok(id),
        Err(_) => whatever!("expected a numeric id, got {:?}", key),
    }
}

/// Converts the wire representation into a snapshot, checking its consistency.
pub fn build_snapshot(entry: &SnapshotEntry, path: &str) -> LiveResult<ElectionSnapshot> {
    let mut builder = SnapshotBuilder::new(entry.name.as_str());
    for p in entry.parties.iter() {
        builder = builder
            .party(p.id, p.name.as_str(), p.short_code.as_str())
            .context(InvalidSnapshotSnafu { path })?;
    }
    for c in entry.candidates.iter() {
        let party = c.party.unwrap_or(INDEPENDENT_PARTY_ID);
        builder = builder
            .candidate(c.id, c.name.as_str(), party)
            .context(InvalidSnapshotSnafu { path })?;
    }
    for s in entry.seats.iter() {
        builder = builder
            .seat(s.id, s.name.as_str(), s.enrolment)
            .context(InvalidSnapshotSnafu { path })?;
        for b in s.booths.iter() {
            builder = builder
                .booth(s.id, b.id, b.name.as_str(), booth_kind(&b.kind)?)
                .context(InvalidSnapshotSnafu { path })?;
            for (candidate, votes) in b.fp.iter() {
                builder
                    .add_booth_fp(b.id, parse_id(candidate)?, *votes)
                    .context(InvalidSnapshotSnafu { path })?;
            }
            for (party, votes) in b.tcp.iter() {
                builder
                    .add_booth_tcp(b.id, parse_id(party)?, *votes)
                    .context(InvalidSnapshotSnafu { path })?;
            }
        }
        for fp in s.fp.iter() {
            builder
                .add_seat_fp(s.id, fp.candidate, vote_type(&fp.vote_type)?, fp.votes)
                .context(InvalidSnapshotSnafu { path })?;
        }
        for tcp in s.tcp.iter() {
            builder
                .add_seat_tcp(s.id, tcp.party, vote_type(&tcp.vote_type)?, tcp.votes)
                .context(InvalidSnapshotSnafu { path })?;
        }
        debug!(
            "build_snapshot: seat {} with {} booths",
            s.name,
            s.booths.len()
        );
    }
    builder.build().context(InvalidSnapshotSnafu { path })
}

pub fn parse_snapshot(contents: &str) -> LiveResult<ElectionSnapshot> {
    let path = "<snapshot>";
    let entry: SnapshotEntry = serde_json::from_str(contents).context(ParsingJsonSnafu { path })?;
    build_snapshot(&entry, path)
}

pub fn read_snapshot(path: &str) -> LiveResult<ElectionSnapshot> {
    let contents = read_file(path)?;
    let entry: SnapshotEntry =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    let snapshot = build_snapshot(&entry, path)?;
    info!(
        "Read snapshot {} from {}: {} seats, {} booths",
        snapshot.name,
        path,
        snapshot.seats.len(),
        snapshot.booths.len()
    );
    Ok(snapshot)
}
