// ********* Input data structures ***********

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Display;

/// Party id used by candidates (and two-candidate affiliations) that do not
/// belong to any registered party.
pub const INDEPENDENT_PARTY_ID: i32 = -1;

/// The categories in which votes are reported by the electoral commission.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum VoteType {
    Ordinary,
    Absent,
    Provisional,
    PrePoll,
    Postal,
    Early,
}

impl VoteType {
    pub const ALL: [VoteType; 6] = [
        VoteType::Ordinary,
        VoteType::Absent,
        VoteType::Provisional,
        VoteType::PrePoll,
        VoteType::Postal,
        VoteType::Early,
    ];

    /// Every vote type that is not an ordinary in-person vote.
    pub const DECLARATION: [VoteType; 5] = [
        VoteType::Absent,
        VoteType::Provisional,
        VoteType::PrePoll,
        VoteType::Postal,
        VoteType::Early,
    ];

    fn position(self) -> usize {
        match self {
            VoteType::Ordinary => 0,
            VoteType::Absent => 1,
            VoteType::Provisional => 2,
            VoteType::PrePoll => 3,
            VoteType::Postal => 4,
            VoteType::Early => 5,
        }
    }
}

/// Vote counts broken down by vote type.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default, Hash)]
pub struct VoteCounts([u64; 6]);

impl VoteCounts {
    pub const EMPTY: VoteCounts = VoteCounts([0; 6]);

    pub fn get(&self, vote_type: VoteType) -> u64 {
        self.0[vote_type.position()]
    }

    pub fn add(&mut self, vote_type: VoteType, count: u64) {
        self.0[vote_type.position()] += count;
    }

    pub fn ordinary(&self) -> u64 {
        self.get(VoteType::Ordinary)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn declaration_total(&self) -> u64 {
        self.total() - self.ordinary()
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum BoothKind {
    Normal,
    /// Pre-poll voting centre (PPVC).
    EarlyVotingCentre,
    Remote,
    Hospital,
    Prison,
    Other,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Party {
    pub id: i32,
    pub name: String,
    pub short_code: String,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Candidate {
    pub id: i32,
    pub name: String,
    /// The owning party, or `INDEPENDENT_PARTY_ID`.
    pub party: i32,
}

impl Candidate {
    pub fn is_independent(&self) -> bool {
        self.party == INDEPENDENT_PARTY_ID
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Seat {
    pub id: i32,
    pub name: String,
    pub enrolment: u64,
    /// First preference votes, by candidate id.
    pub fp_votes: BTreeMap<i32, VoteCounts>,
    /// Two-candidate-preferred votes, by affiliation (party) id.
    pub tcp_votes: BTreeMap<i32, VoteCounts>,
    pub booths: Vec<i32>,
}

impl Seat {
    pub fn fp_total(&self) -> u64 {
        self.fp_votes.values().map(|vc| vc.total()).sum()
    }

    pub fn fp_total_of(&self, vote_type: VoteType) -> u64 {
        self.fp_votes.values().map(|vc| vc.get(vote_type)).sum()
    }

    pub fn tcp_total(&self) -> u64 {
        self.tcp_votes.values().map(|vc| vc.total()).sum()
    }

    pub fn tcp_total_of(&self, vote_type: VoteType) -> u64 {
        self.tcp_votes.values().map(|vc| vc.get(vote_type)).sum()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Booth {
    pub id: i32,
    pub name: String,
    pub kind: BoothKind,
    /// First preference votes, by candidate id.
    pub fp_votes: BTreeMap<i32, u64>,
    /// Two-candidate-preferred votes, by affiliation id. Empty if the booth
    /// has not reported a two-candidate count.
    pub tcp_votes: BTreeMap<i32, u64>,
}

impl Booth {
    pub fn fp_total(&self) -> u64 {
        self.fp_votes.values().sum()
    }

    pub fn tcp_total(&self) -> u64 {
        self.tcp_votes.values().sum()
    }
}

/// All the results known for one election at one point in time.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct ElectionSnapshot {
    pub name: String,
    pub parties: BTreeMap<i32, Party>,
    pub candidates: BTreeMap<i32, Candidate>,
    pub seats: BTreeMap<i32, Seat>,
    pub booths: BTreeMap<i32, Booth>,
}

impl ElectionSnapshot {
    pub fn party_of(&self, candidate_id: i32) -> Option<&Party> {
        self.candidates
            .get(&candidate_id)
            .and_then(|c| self.parties.get(&c.party))
    }

    pub fn seat_by_name(&self, name: &str) -> Option<&Seat> {
        self.seats.values().find(|s| s.name == name)
    }
}

// ******** Internal index space *********

/// The stable party slot that all computations key off once identifiers
/// have been resolved.
///
/// `Resolved(0)` and `Resolved(1)` are the two major parties, `Resolved(1)`
/// heading the major coalition.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum PartyIndex {
    Resolved(usize),
    CoalitionPartner,
    Independent,
    EmergingIndependent,
    Others,
    Unresolved,
}

impl PartyIndex {
    pub const MAJOR_A: PartyIndex = PartyIndex::Resolved(0);
    pub const MAJOR_B: PartyIndex = PartyIndex::Resolved(1);

    /// Member of the major coalition (second major party or its partner).
    pub fn is_coalition(self) -> bool {
        matches!(self, PartyIndex::Resolved(1) | PartyIndex::CoalitionPartner)
    }

    pub fn is_resolved(self) -> bool {
        self != PartyIndex::Unresolved
    }
}

impl Display for PartyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PartyIndex::Resolved(slot) => write!(f, "slot {}", slot),
            PartyIndex::CoalitionPartner => write!(f, "coalition partner"),
            PartyIndex::Independent => write!(f, "independent"),
            PartyIndex::EmergingIndependent => write!(f, "emerging independent"),
            PartyIndex::Others => write!(f, "others"),
            PartyIndex::Unresolved => write!(f, "unresolved"),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum SeatIndex {
    Resolved(usize),
    Unresolved,
}

// ******** Output data structures *********

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct FpProjection {
    pub percent: f64,
    pub swing: Option<f64>,
    pub transformed_swing: Option<f64>,
}

/// One side of a reported two-candidate count.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct TcpSide {
    pub party: PartyIndex,
    pub affiliation: i32,
    pub percent: f64,
    pub swing: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct SeatProjection {
    pub name: String,
    /// Swing to the first major party, in percentage points.
    pub major_swing: Option<f64>,
    /// True when the major swing comes from estimated rather than reported
    /// two-party counts.
    pub major_swing_estimated: bool,
    pub tcp_count_progress: f64,
    pub fp_count_progress: f64,
    pub declaration_basis: Option<f64>,
    /// Reported two-candidate sides, for contests that are not between the
    /// two majors.
    pub tcp: Option<[TcpSide; 2]>,
    /// One entry per party column of the enclosing `ProjectionOutput`.
    pub fp: Vec<Option<FpProjection>>,
    pub remaining_declaration_percent: Option<f64>,
    pub ppvc_sensitivity: Option<f64>,
    pub projected_total_votes: Option<f64>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectionOutput {
    pub party_columns: Vec<PartyIndex>,
    /// Indexed by the position of the seat in the configured seat list.
    pub seats: Vec<SeatProjection>,
    pub preference_flows: Vec<(PartyIndex, f64)>,
    pub ppvc_bias: f64,
    pub ppvc_bias_confidence: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ProjectionRun {
    pub output: ProjectionOutput,
    /// Seat by seat, booth by booth dump of the computed figures.
    pub diagnostics: String,
}

/// Errors that prevent the pipeline from completing.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ProjectionError {
    /// The configuration declares fewer than two party slots.
    MissingMajorParties,
    DuplicateSeatName(String),
    InconsistentSnapshot(String),
}

impl Error for ProjectionError {}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionError::MissingMajorParties => {
                write!(f, "the configuration must declare at least two parties")
            }
            ProjectionError::DuplicateSeatName(name) => {
                write!(f, "seat {} is declared more than once", name)
            }
            ProjectionError::InconsistentSnapshot(msg) => {
                write!(f, "inconsistent snapshot: {}", msg)
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum MatchError {
    NoMatchingSeat(String),
}

impl Error for MatchError {}

impl Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::NoMatchingSeat(name) => {
                write!(f, "no previous seat matches {}", name)
            }
        }
    }
}

// ********* Configuration **********

#[derive(PartialEq, Debug, Clone)]
pub struct PartyConfig {
    pub name: String,
    /// Short codes used by the electoral commission for this party.
    pub official_codes: Vec<String>,
    /// Share of this party's first preferences that went to the first major
    /// party at the previous election, in percent.
    pub preference_flow: Option<f64>,
    /// Parties sharing a group are fitted as a single regression feature.
    pub regression_group: Option<String>,
}

/// A known fact about the volume of one declaration vote type in a seat.
#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct DeclarationOverride {
    pub count: Option<u64>,
    /// Percentage of the enrolment.
    pub percent: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct SeatConfig {
    pub name: String,
    pub previous_name: Option<String>,
    pub alternate_name: Option<String>,
    /// Independent candidates, by name, tracked as emerging independents.
    pub emerging_independents: Vec<String>,
    pub declaration_overrides: BTreeMap<VoteType, DeclarationOverride>,
}

#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ProjectionSettings {
    /// The transformed swing is capped at this multiple of the raw swing.
    pub transformed_swing_cap: f64,
    /// Two-candidate votes represented by one regression row.
    pub votes_per_regression_row: u64,
    pub anchor_weight: f64,
    pub prior_weight: f64,
    /// Flow from the coalition sibling of the main coalition candidate.
    pub coalition_sibling_flow: f64,
    pub unknown_flow: f64,
}

impl ProjectionSettings {
    pub const DEFAULT: ProjectionSettings = ProjectionSettings {
        transformed_swing_cap: 3.0,
        votes_per_regression_row: 100,
        anchor_weight: 1.0e7,
        prior_weight: 50.0,
        coalition_sibling_flow: 20.0,
        unknown_flow: 50.0,
    };
}

impl Default for ProjectionSettings {
    fn default() -> Self {
        ProjectionSettings::DEFAULT
    }
}

#[derive(PartialEq, Debug, Clone, Default)]
pub struct ProjectConfig {
    /// Ordered party slots. The first two are the major parties.
    pub parties: Vec<PartyConfig>,
    /// Codes matching the second major party's slot that denote its minor
    /// coalition partner.
    pub coalition_partner_codes: Vec<String>,
    /// Codes explicitly folded into the aggregate "others" slot.
    pub others_codes: Vec<String>,
    pub default_preference_flow: Option<f64>,
    /// The internal seat list. Output arrays follow this order.
    pub seats: Vec<SeatConfig>,
    pub settings: ProjectionSettings,
}

impl ProjectConfig {
    pub fn seat_config(&self, name: &str) -> Option<&SeatConfig> {
        self.seats.iter().find(|s| s.name == name)
    }
}
