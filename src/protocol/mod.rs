//! Block-structured text protocol: grammar, system prompt, and parser
//!
//! The protocol carries generated itineraries as a flat sequence of two
//! block kinds embedded anywhere in free-form text:
//!
//! ```text
//! Activity(<Title>) { <Field>: <Value>; ... }
//! TripInsight(<Category>) { <Field>: <Value>; ... }
//! ```
//!
//! Decoding is tolerant and total: extraction is a two-level scan (block
//! matching, then field-pair matching inside each block body) that ignores
//! surrounding prose and markdown fences, accepts fields in any order, and
//! produces fewer records on malformed input rather than an error. The
//! one hard rule is structural: an `Activity` block without a usable
//! latitude and longitude is dropped silently.
//!
//! This module is decode-only; the encoding side is the external
//! completion service, instructed via [`system_prompt`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{ActivityNode, InsightRecord};

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```\w*").unwrap());

static ACTIVITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Activity\s*\((.*?)\)\s*\{(?s:(.*?))\}").unwrap());

static INSIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TripInsight\s*\((.*?)\)\s*\{(?s:(.*?))\}").unwrap());

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)(\w+)\s*:\s*(.*?)(?:;|$)").unwrap());

/// The strict-protocol instruction text sent as the system prompt for
/// format and healing completions
pub fn system_prompt() -> &'static str {
    "STRICT_PROTOCOL: TOON.\n\
     Output ONLY blocks in this format:\n\
     Activity(Exact_Name_of_Place) {\n\
     \x20 Time: HH:MM;\n\
     \x20 Loc: Full Address;\n\
     \x20 Lat: Dec;\n\
     \x20 Lon: Dec;\n\
     \x20 Type: Indoor/Outdoor;\n\
     \x20 Logic: Why this fits the user vibe;\n\
     \x20 Description: 1-sentence vibe check;\n\
     \x20 Price: $XX;\n\
     }\n\
     TripInsight(Category_Name) {\n\
     \x20 Content: One sentence insight;\n\
     \x20 Value: Metric;\n\
     }\n\
     NO INTRO. NO OUTRO. NO MARKDOWN."
}

/// Decoded protocol text: accepted activities plus all matched insights
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPlan {
    pub itinerary: Vec<ActivityNode>,
    pub insights: Vec<InsightRecord>,
}

/// Decode protocol text into the itinerary only
pub fn parse(text: &str) -> Vec<ActivityNode> {
    parse_with_insights(text).itinerary
}

/// Decode protocol text into itinerary and insight records
///
/// Never fails: text with zero well-formed blocks yields an empty plan.
pub fn parse_with_insights(text: &str) -> ParsedPlan {
    let clean = strip_fences(text);

    let mut itinerary = Vec::new();
    for caps in ACTIVITY_RE.captures_iter(&clean) {
        let title = caps[1].replace('_', " ").trim().to_string();
        let fields = parse_fields(&caps[2], true);

        // Hard structural filter: no coordinates, no node
        if let Some(node) = activity_from_fields(itinerary.len(), title, &fields) {
            itinerary.push(node);
        } else {
            debug!("parse_with_insights: dropping activity block without usable coordinates");
        }
    }

    let mut insights = Vec::new();
    for caps in INSIGHT_RE.captures_iter(&clean) {
        insights.push(InsightRecord {
            category: caps[1].trim().to_string(),
            fields: parse_fields(&caps[2], false),
        });
    }

    debug!(
        activities = itinerary.len(),
        insights = insights.len(),
        "parse_with_insights: decoded"
    );
    ParsedPlan { itinerary, insights }
}

/// Remove markdown code fences the generator sometimes wraps output in
pub fn strip_fences(text: &str) -> String {
    FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Extract `field: value;` pairs from a block body
///
/// Field names are case-folded; values lose surrounding quotes, and for
/// activity bodies underscores become spaces. Insight bodies are kept
/// verbatim apart from the quote strip.
fn parse_fields(body: &str, normalize_underscores: bool) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();
    for caps in FIELD_RE.captures_iter(body) {
        let key = caps[1].trim().to_lowercase();
        let mut value = caps[2].trim().trim_matches('"').trim_matches('\'').to_string();
        if normalize_underscores {
            value = value.replace('_', " ");
        }
        fields.insert(key, value);
    }
    fields
}

/// Build an activity node from a decoded field map
///
/// Returns None unless both coordinates are present and parse as f64.
fn activity_from_fields(id: usize, title: String, fields: &BTreeMap<String, String>) -> Option<ActivityNode> {
    let lat: f64 = fields.get("lat")?.parse().ok()?;
    let lon: f64 = fields.get("lon")?.parse().ok()?;

    let get = |key: &str| fields.get(key).cloned().unwrap_or_default();

    Some(ActivityNode {
        id,
        title,
        time: get("time"),
        address: get("loc"),
        lat,
        lon,
        category: get("type"),
        rationale: get("logic"),
        description: get("description"),
        price: get("price"),
        reached: false,
    })
}
