use log::{debug, info, warn};

use live_swing::*;
use snafu::{prelude::*, Snafu};

use std::fs;

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

pub mod config_reader;
pub mod io_snapshot;

#[derive(Debug, Snafu)]
pub enum LiveError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the projection"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Error writing to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid snapshot in {path}"))]
    InvalidSnapshot {
        source: ProjectionError,
        path: String,
    },
    #[snafu(display("The projection could not be computed"))]
    Projection { source: ProjectionError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type LiveResult<T> = Result<T, LiveError>;

pub fn read_file(path: &str) -> LiveResult<String> {
    fs::read_to_string(path).context(OpeningJsonSnafu { path })
}

fn column_name(index: PartyIndex, config: &ProjectConfig) -> String {
    match index {
        PartyIndex::Resolved(slot) => config
            .parties
            .get(slot)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| index.to_string()),
        PartyIndex::CoalitionPartner => "Coalition partner".to_string(),
        PartyIndex::Independent => "Independent".to_string(),
        PartyIndex::EmergingIndependent => "Emerging independent".to_string(),
        PartyIndex::Others => "Others".to_string(),
        PartyIndex::Unresolved => "Unresolved".to_string(),
    }
}

fn seat_to_json(seat: &SeatProjection, config: &ProjectConfig) -> JSValue {
    let fp: Vec<JSValue> = seat
        .fp
        .iter()
        .map(|fp| match fp {
            Some(fp) => json!({
                "percent": fp.percent,
                "swing": fp.swing,
                "transformedSwing": fp.transformed_swing
            }),
            None => JSValue::Null,
        })
        .collect();
    let tcp: JSValue = match &seat.tcp {
        Some(sides) => sides
            .iter()
            .map(|s| {
                json!({
                    "party": column_name(s.party, config),
                    "affiliation": s.affiliation,
                    "percent": s.percent,
                    "swing": s.swing
                })
            })
            .collect(),
        None => JSValue::Null,
    };
    json!({
        "name": seat.name,
        "majorSwing": seat.major_swing,
        "majorSwingEstimated": seat.major_swing_estimated,
        "tcpCountProgress": seat.tcp_count_progress,
        "fpCountProgress": seat.fp_count_progress,
        "declarationBasis": seat.declaration_basis,
        "tcp": tcp,
        "fp": fp,
        "remainingDeclarationPercent": seat.remaining_declaration_percent,
        "ppvcSensitivity": seat.ppvc_sensitivity,
        "projectedTotalVotes": seat.projected_total_votes
    })
}

/// The JSON document written for a projection.
pub fn build_projection_js(output: &ProjectionOutput, config: &ProjectConfig) -> JSValue {
    let columns: Vec<String> = output
        .party_columns
        .iter()
        .map(|c| column_name(*c, config))
        .collect();
    let mut flows: JSMap<String, JSValue> = JSMap::new();
    for (index, flow) in output.preference_flows.iter() {
        flows.insert(column_name(*index, config), json!(flow));
    }
    let seats: Vec<JSValue> = output
        .seats
        .iter()
        .map(|s| seat_to_json(s, config))
        .collect();
    json!({
        "partyColumns": columns,
        "seats": seats,
        "preferenceFlows": flows,
        "ppvcBias": output.ppvc_bias,
        "ppvcBiasConfidence": output.ppvc_bias_confidence
    })
}

pub fn read_summary(path: &str) -> LiveResult<JSValue> {
    let contents = read_file(path)?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

/// Pretty printed JSON, as written to the output.
pub fn render_projection(js: &JSValue) -> LiveResult<String> {
    serde_json::to_string_pretty(js).context(SerializingJsonSnafu {})
}

fn write_output(path: &Option<String>, contents: &str) -> LiveResult<()> {
    match path.as_deref() {
        None | Some("") | Some("stdout") => {
            println!("{}", contents);
            Ok(())
        }
        Some(p) => {
            info!("Writing projection to {}", p);
            fs::write(p, contents).context(WritingOutputSnafu { path: p })
        }
    }
}

pub fn run(args: &Args) -> LiveResult<()> {
    let config = config_reader::read_config(&args.config)?;
    debug!("config: {:?}", config);
    let current = io_snapshot::read_snapshot(&args.current)?;
    let previous = io_snapshot::read_snapshot(&args.previous)?;

    let run = run_projection(&current, &previous, &config).context(ProjectionSnafu {})?;

    let result_js = build_projection_js(&run.output, &config);
    let pretty_js = render_projection(&result_js)?;
    write_output(&args.out, &pretty_js)?;

    if let Some(p) = &args.diagnostics {
        info!("Writing diagnostics to {}", p);
        fs::write(p, &run.diagnostics).context(WritingOutputSnafu { path: p.as_str() })?;
    }

    // The reference projection, if provided for comparison
    if let Some(reference_p) = &args.reference {
        let reference = read_summary(reference_p)?;
        let pretty_js_reference = render_projection(&reference)?;
        if pretty_js_reference != pretty_js {
            warn!("Found differences with the reference projection");
            print_diff(pretty_js_reference.as_str(), pretty_js.as_str(), "\n");
            whatever!("Difference detected between the computed projection and the reference")
        }
    }

    Ok(())
}
