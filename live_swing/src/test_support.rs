// Shared fixtures for the unit tests.
//
// Aston is a classic Labor/Liberal contest with a pre-poll centre and some
// postal votes. Wills is a Labor/Greens contest where the second booth has
// not reported its two-candidate count yet.

use std::collections::BTreeMap;

use crate::builder::SnapshotBuilder;
use crate::config::*;

pub(crate) fn party(
    name: &str,
    codes: &[&str],
    flow: Option<f64>,
    group: Option<&str>,
) -> PartyConfig {
    PartyConfig {
        name: name.to_string(),
        official_codes: codes.iter().map(|c| c.to_string()).collect(),
        preference_flow: flow,
        regression_group: group.map(|g| g.to_string()),
    }
}

pub(crate) fn seat_config(name: &str) -> SeatConfig {
    SeatConfig {
        name: name.to_string(),
        previous_name: None,
        alternate_name: None,
        emerging_independents: Vec::new(),
        declaration_overrides: BTreeMap::new(),
    }
}

pub(crate) fn sample_config() -> ProjectConfig {
    ProjectConfig {
        parties: vec![
            party("Labor", &["ALP"], None, None),
            party("Liberal", &["LP", "LNP", "NP"], None, None),
            party("Greens", &["GRN"], Some(82.0), Some("left")),
            party("One Nation", &["ON"], Some(35.0), None),
            party("Victorian Socialists", &["VS"], Some(85.0), Some("left")),
        ],
        coalition_partner_codes: vec!["NP".to_string()],
        others_codes: vec!["LDP".to_string()],
        default_preference_flow: Some(50.0),
        seats: vec![seat_config("Aston"), seat_config("Wills")],
        settings: ProjectionSettings::DEFAULT,
    }
}

fn with_parties(name: &str) -> SnapshotBuilder {
    SnapshotBuilder::new(name)
        .party(1, "Australian Labor Party", "ALP")
        .unwrap()
        .party(2, "Liberal", "LP")
        .unwrap()
        .party(3, "The Nationals", "NP")
        .unwrap()
        .party(4, "The Greens", "GRN")
        .unwrap()
        .party(5, "Victorian Socialists", "VS")
        .unwrap()
}

fn add_fp(b: &mut SnapshotBuilder, booth: i32, votes: &[(i32, u64)]) {
    for (cid, count) in votes {
        b.add_booth_fp(booth, *cid, *count).unwrap();
    }
}

fn add_tcp(b: &mut SnapshotBuilder, booth: i32, votes: &[(i32, u64)]) {
    for (aff, count) in votes {
        b.add_booth_tcp(booth, *aff, *count).unwrap();
    }
}

pub(crate) fn previous_snapshot() -> ElectionSnapshot {
    let mut b = with_parties("2019")
        .candidate(201, "Pat Labor", 1)
        .unwrap()
        .candidate(202, "Quinn Liberal", 2)
        .unwrap()
        .candidate(203, "Rae Green", 4)
        .unwrap()
        .candidate(204, "Ivy Indie", INDEPENDENT_PARTY_ID)
        .unwrap()
        .candidate(211, "Sam Labor", 1)
        .unwrap()
        .candidate(212, "Tess Green", 4)
        .unwrap()
        .candidate(213, "Uma Liberal", 2)
        .unwrap()
        .seat(10, "Aston", 100_000)
        .unwrap()
        .seat(20, "Wills", 110_000)
        .unwrap()
        .booth(10, 1001, "Boronia", BoothKind::Normal)
        .unwrap()
        .booth(10, 1002, "Rowville", BoothKind::Normal)
        .unwrap()
        .booth(10, 1003, "Knox PPVC", BoothKind::EarlyVotingCentre)
        .unwrap()
        .booth(20, 2001, "Brunswick", BoothKind::Normal)
        .unwrap()
        .booth(20, 2002, "Coburg", BoothKind::Normal)
        .unwrap();

    add_fp(&mut b, 1001, &[(201, 400), (202, 450), (203, 100), (204, 50)]);
    add_tcp(&mut b, 1001, &[(1, 480), (2, 520)]);
    add_fp(&mut b, 1002, &[(201, 300), (202, 550), (203, 100), (204, 50)]);
    add_tcp(&mut b, 1002, &[(1, 420), (2, 580)]);
    add_fp(&mut b, 1003, &[(201, 800), (202, 1000), (203, 150), (204, 50)]);
    add_tcp(&mut b, 1003, &[(1, 900), (2, 1100)]);
    for (cid, count) in [(201, 300), (202, 500), (203, 100), (204, 100)] {
        b.add_seat_fp(10, cid, VoteType::Postal, count).unwrap();
    }
    b.add_seat_tcp(10, 1, VoteType::Postal, 400).unwrap();
    b.add_seat_tcp(10, 2, VoteType::Postal, 600).unwrap();
    for (cid, count) in [(201, 200), (202, 200), (203, 80), (204, 20)] {
        b.add_seat_fp(10, cid, VoteType::Absent, count).unwrap();
    }
    b.add_seat_tcp(10, 1, VoteType::Absent, 260).unwrap();
    b.add_seat_tcp(10, 2, VoteType::Absent, 240).unwrap();

    add_fp(&mut b, 2001, &[(211, 500), (212, 300), (213, 200)]);
    add_tcp(&mut b, 2001, &[(1, 600), (4, 400)]);
    add_fp(&mut b, 2002, &[(211, 400), (212, 400), (213, 200)]);
    add_tcp(&mut b, 2002, &[(1, 550), (4, 450)]);

    b.build().unwrap()
}

pub(crate) fn current_snapshot() -> ElectionSnapshot {
    let mut b = with_parties("2022")
        .candidate(101, "Alice Labor", 1)
        .unwrap()
        .candidate(102, "Bob Liberal", 2)
        .unwrap()
        .candidate(103, "Gina Green", 4)
        .unwrap()
        .candidate(104, "Ivy Indie", INDEPENDENT_PARTY_ID)
        .unwrap()
        .candidate(111, "Sam Labor", 1)
        .unwrap()
        .candidate(112, "Tess Green", 4)
        .unwrap()
        .candidate(113, "Uma Liberal", 2)
        .unwrap()
        .candidate(114, "Vic Socialist", 5)
        .unwrap()
        .seat(10, "Aston", 100_000)
        .unwrap()
        .seat(20, "Wills", 110_000)
        .unwrap()
        .booth(10, 1001, "Boronia", BoothKind::Normal)
        .unwrap()
        .booth(10, 1002, "Rowville", BoothKind::Normal)
        .unwrap()
        .booth(10, 1003, "Knox PPVC", BoothKind::EarlyVotingCentre)
        .unwrap()
        .booth(20, 2001, "Brunswick", BoothKind::Normal)
        .unwrap()
        .booth(20, 2002, "Coburg", BoothKind::Normal)
        .unwrap();

    add_fp(&mut b, 1001, &[(101, 450), (102, 400), (103, 100), (104, 50)]);
    add_tcp(&mut b, 1001, &[(1, 530), (2, 470)]);
    add_fp(&mut b, 1002, &[(101, 330), (102, 520), (103, 110), (104, 40)]);
    add_tcp(&mut b, 1002, &[(1, 470), (2, 530)]);
    add_fp(&mut b, 1003, &[(101, 700), (102, 1000), (103, 200), (104, 100)]);
    add_tcp(&mut b, 1003, &[(1, 900), (2, 1100)]);
    for (cid, count) in [(101, 100), (102, 150), (103, 30), (104, 20)] {
        b.add_seat_fp(10, cid, VoteType::Postal, count).unwrap();
    }
    b.add_seat_tcp(10, 1, VoteType::Postal, 130).unwrap();
    b.add_seat_tcp(10, 2, VoteType::Postal, 170).unwrap();

    add_fp(&mut b, 2001, &[(111, 450), (112, 350), (113, 150), (114, 50)]);
    add_tcp(&mut b, 2001, &[(1, 560), (4, 440)]);
    add_fp(&mut b, 2002, &[(111, 380), (112, 420), (113, 170), (114, 30)]);

    b.build().unwrap()
}

pub(crate) fn sample_snapshots() -> (ElectionSnapshot, ElectionSnapshot) {
    (current_snapshot(), previous_snapshot())
}

/// A single seat with one booth and a classic two-party count in both
/// elections.
pub(crate) fn two_party_seat(
    previous_tcp: (u64, u64),
    current_tcp: (u64, u64),
) -> (ElectionSnapshot, ElectionSnapshot) {
    let make = |name: &str, first_cid: i32, tcp: (u64, u64)| {
        let mut b = with_parties(name)
            .candidate(first_cid, "Labor candidate", 1)
            .unwrap()
            .candidate(first_cid + 1, "Liberal candidate", 2)
            .unwrap()
            .seat(10, "Aston", 100_000)
            .unwrap()
            .booth(10, 1001, "Boronia", BoothKind::Normal)
            .unwrap();
        add_fp(&mut b, 1001, &[(first_cid, tcp.0), (first_cid + 1, tcp.1)]);
        add_tcp(&mut b, 1001, &[(1, tcp.0), (2, tcp.1)]);
        b.build().unwrap()
    };
    (
        make("current", 101, current_tcp),
        make("previous", 201, previous_tcp),
    )
}

pub(crate) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {} but got {}",
        expected,
        actual
    );
}
