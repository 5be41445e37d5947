use crate::live::*;

use log::info;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use std::collections::BTreeMap;

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct PartyEntry {
    pub name: String,
    #[serde(rename = "officialCodes", default)]
    pub official_codes: Vec<String>,
    #[serde(rename = "preferenceFlow")]
    pub preference_flow: Option<f64>,
    #[serde(rename = "regressionGroup")]
    pub regression_group: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OverrideEntry {
    pub count: Option<u64>,
    pub percent: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SeatEntry {
    pub name: String,
    #[serde(rename = "previousName")]
    pub previous_name: Option<String>,
    #[serde(rename = "alternateName")]
    pub alternate_name: Option<String>,
    #[serde(rename = "emergingIndependents", default)]
    pub emerging_independents: Vec<String>,
    /// Keyed by vote type: absent, provisional, prePoll, postal, early.
    #[serde(rename = "declarationOverrides", default)]
    pub declaration_overrides: BTreeMap<String, OverrideEntry>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SettingsEntry {
    #[serde(rename = "transformedSwingCap")]
    pub transformed_swing_cap: Option<f64>,
    #[serde(rename = "votesPerRegressionRow")]
    pub votes_per_regression_row: Option<u64>,
    #[serde(rename = "anchorWeight")]
    pub anchor_weight: Option<f64>,
    #[serde(rename = "priorWeight")]
    pub prior_weight: Option<f64>,
    #[serde(rename = "coalitionSiblingFlow")]
    pub coalition_sibling_flow: Option<f64>,
    #[serde(rename = "unknownFlow")]
    pub unknown_flow: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    pub parties: Vec<PartyEntry>,
    #[serde(rename = "coalitionPartnerCodes", default)]
    pub coalition_partner_codes: Vec<String>,
    #[serde(rename = "othersCodes", default)]
    pub others_codes: Vec<String>,
    #[serde(rename = "defaultPreferenceFlow")]
    pub default_preference_flow: Option<f64>,
    #[serde(default)]
    pub seats: Vec<SeatEntry>,
    pub settings: Option<SettingsEntry>,
}

fn declaration_vote_type(key: &str) -> LiveResult<VoteType> {
    match key {
        "absent" => Ok(VoteType::Absent),
        "provisional" => Ok(VoteType::Provisional),
        "prePoll" => Ok(VoteType::PrePoll),
        "postal" => Ok(VoteType::Postal),
        "early" => Ok(VoteType::Early),
        "ordinary" => whatever!("ordinary votes cannot be overridden"),
        _ => whatever!("unknown declaration vote type: {}", key),
    }
}

fn settings(entry: &Option<SettingsEntry>) -> ProjectionSettings {
    let d = ProjectionSettings::DEFAULT;
    match entry {
        None => d,
        Some(s) => ProjectionSettings {
            transformed_swing_cap: s.transformed_swing_cap.unwrap_or(d.transformed_swing_cap),
            votes_per_regression_row: s
                .votes_per_regression_row
                .unwrap_or(d.votes_per_regression_row),
            anchor_weight: s.anchor_weight.unwrap_or(d.anchor_weight),
            prior_weight: s.prior_weight.unwrap_or(d.prior_weight),
            coalition_sibling_flow: s.coalition_sibling_flow.unwrap_or(d.coalition_sibling_flow),
            unknown_flow: s.unknown_flow.unwrap_or(d.unknown_flow),
        },
    }
}

fn seat_config(entry: &SeatEntry) -> LiveResult<SeatConfig> {
    let mut declaration_overrides: BTreeMap<VoteType, DeclarationOverride> = BTreeMap::new();
    for (key, o) in entry.declaration_overrides.iter() {
        let vote_type = declaration_vote_type(key.as_str())?;
        declaration_overrides.insert(
            vote_type,
            DeclarationOverride {
                count: o.count,
                percent: o.percent,
            },
        );
    }
    Ok(SeatConfig {
        name: entry.name.clone(),
        previous_name: entry.previous_name.clone(),
        alternate_name: entry.alternate_name.clone(),
        emerging_independents: entry.emerging_independents.clone(),
        declaration_overrides,
    })
}

pub fn validate_config(config: &LiveConfig) -> LiveResult<ProjectConfig> {
    if config.parties.len() < 2 {
        whatever!(
            "the configuration declares {} parties, the two major parties are required",
            config.parties.len()
        );
    }
    let mut seats: Vec<SeatConfig> = Vec::new();
    for entry in config.seats.iter() {
        if seats.iter().any(|s| s.name == entry.name) {
            whatever!("seat {} is configured more than once", entry.name);
        }
        seats.push(seat_config(entry)?);
    }
    let parties: Vec<PartyConfig> = config
        .parties
        .iter()
        .map(|p| PartyConfig {
            name: p.name.clone(),
            official_codes: p.official_codes.clone(),
            preference_flow: p.preference_flow,
            regression_group: p.regression_group.clone(),
        })
        .collect();
    Ok(ProjectConfig {
        parties,
        coalition_partner_codes: config.coalition_partner_codes.clone(),
        others_codes: config.others_codes.clone(),
        default_preference_flow: config.default_preference_flow,
        seats,
        settings: settings(&config.settings),
    })
}

pub fn parse_config(contents: &str) -> LiveResult<ProjectConfig> {
    let config: LiveConfig =
        serde_json::from_str(contents).context(ParsingJsonSnafu { path: "<config>" })?;
    validate_config(&config)
}

pub fn read_config(path: &str) -> LiveResult<ProjectConfig> {
    let contents = read_file(path)?;
    let config: LiveConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    info!(
        "Read configuration from {}: {} parties, {} seats",
        path,
        config.parties.len(),
        config.seats.len()
    );
    validate_config(&config)
}
