//! Core domain types for Itinera
//!
//! The planning context is request-local: created once per planning
//! request, threaded through the pipeline stages, and discarded after
//! the response is returned and persisted. It is never shared across
//! requests and has no concurrent writers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A planning request, as received from the (external) transport layer
///
/// Date/time-period fields are passed through to prompts but never
/// interpreted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub destination: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default = "default_start_time")]
    pub start_time: String,
    #[serde(default = "default_end_time")]
    pub end_time: String,
    #[serde(default)]
    pub time_period: String,
    pub budget_max: i64,
    pub persona: String,
    #[serde(rename = "isReligious", default)]
    pub religious_sites_ok: bool,
    #[serde(default = "default_accommodation")]
    pub accommodation: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(rename = "duration")]
    pub duration_days: u32,
}

fn default_start_time() -> String {
    "09:00".to_string()
}

fn default_end_time() -> String {
    "21:00".to_string()
}

fn default_accommodation() -> String {
    "Boutique Hotel".to_string()
}

/// A discovered point of interest, before itinerary placement
///
/// Candidate ids are recomputed positional indices, not stable
/// identifiers: every re-filtering pass reassigns them to match the
/// current list position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub id: usize,
    pub title: String,
    /// Free-form category tag; "Indoor", "Outdoor" and "Stay" are
    /// significant to downstream logic but the set is open
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "loc", default)]
    pub address: String,
    #[serde(default = "default_price_level")]
    pub price_level: u8,
}

fn default_price_level() -> u8 {
    2
}

impl Candidate {
    /// Location of this candidate
    pub fn point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Reassign candidate ids to match current list positions
pub fn reindex(pool: &mut [Candidate]) {
    for (i, poi) in pool.iter_mut().enumerate() {
        poi.id = i;
    }
}

/// A scheduled itinerary entry
///
/// Only ever created by the protocol parser. The id is the node's
/// appearance order at parse time and is not stable across re-parses.
/// `reached` is set true externally as the traveler progresses and is
/// read by healing to determine the checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityNode {
    pub id: usize,
    pub title: String,
    #[serde(default)]
    pub time: String,
    #[serde(rename = "loc", default)]
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type", default)]
    pub category: String,
    #[serde(rename = "logic", default)]
    pub rationale: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub reached: bool,
}

/// A trip-level insight emitted alongside the itinerary
///
/// Purely additive: the parser keeps every matched block verbatim as a
/// category plus its field map, regardless of field completeness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
    pub category: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl InsightRecord {
    /// The insight sentence, if the block carried one
    pub fn content(&self) -> Option<&str> {
        self.fields.get("content").map(String::as_str)
    }

    /// The metric value string, if the block carried one
    pub fn value(&self) -> Option<&str> {
        self.fields.get("value").map(String::as_str)
    }
}

/// Mutable planning state threaded through the pipeline
///
/// Each stage reads the fields it declares as input and writes only the
/// fields it declares as output; fields never consumed by a later stage
/// may be left stale.
#[derive(Debug, Clone)]
pub struct PlanningContext {
    pub destination: String,
    pub persona: String,
    pub days: u32,
    pub budget_max: i64,
    pub religious_sites_ok: bool,
    pub accommodation: String,
    pub interests: Vec<String>,
    pub day_start: String,
    pub day_end: String,

    /// Candidate pool in discovery order; mutated in place by each stage
    pub poi_pool: Vec<Candidate>,
    pub hotel_name: String,
    pub weather: String,
    /// Display-only percentage string; not guaranteed numerically
    /// parseable beyond the documented fallback patterns
    pub efficiency: String,
    pub itinerary: Vec<ActivityNode>,
    pub insights: Vec<InsightRecord>,
}

impl PlanningContext {
    /// Build the initial context for a planning request
    pub fn from_request(req: &PlanRequest) -> Self {
        Self {
            destination: req.destination.clone(),
            persona: req.persona.clone(),
            days: req.duration_days,
            budget_max: req.budget_max,
            religious_sites_ok: req.religious_sites_ok,
            accommodation: if req.accommodation.is_empty() {
                default_accommodation()
            } else {
                req.accommodation.clone()
            },
            interests: req.interests.clone(),
            day_start: req.start_time.clone(),
            day_end: req.end_time.clone(),
            poi_pool: Vec::new(),
            hotel_name: String::new(),
            weather: "Sunny".to_string(),
            efficiency: "35%".to_string(),
            itinerary: Vec::new(),
            insights: Vec::new(),
        }
    }
}

/// The final planning result returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub itinerary: Vec<ActivityNode>,
    pub insights: Vec<InsightRecord>,
    pub center: GeoPoint,
    pub efficiency_metric: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PlanRequest {
        PlanRequest {
            destination: "Barcelona".to_string(),
            start_date: String::new(),
            end_date: String::new(),
            start_time: "09:00".to_string(),
            end_time: "21:00".to_string(),
            time_period: String::new(),
            budget_max: 1500,
            persona: "Art lover".to_string(),
            religious_sites_ok: false,
            accommodation: String::new(),
            interests: vec!["museums".to_string()],
            duration_days: 3,
        }
    }

    #[test]
    fn test_context_from_request() {
        let ctx = PlanningContext::from_request(&request());

        assert_eq!(ctx.destination, "Barcelona");
        assert_eq!(ctx.days, 3);
        assert_eq!(ctx.efficiency, "35%");
        assert!(ctx.poi_pool.is_empty());
        assert!(ctx.itinerary.is_empty());
        // Empty accommodation falls back to the default class
        assert_eq!(ctx.accommodation, "Boutique Hotel");
    }

    #[test]
    fn test_reindex_assigns_positions() {
        let mut pool = vec![
            Candidate {
                id: 7,
                title: "A".to_string(),
                category: "Outdoor".to_string(),
                description: String::new(),
                lat: 0.0,
                lon: 0.0,
                address: String::new(),
                price_level: 2,
            },
            Candidate {
                id: 3,
                title: "B".to_string(),
                category: "Indoor".to_string(),
                description: String::new(),
                lat: 0.0,
                lon: 0.0,
                address: String::new(),
                price_level: 2,
            },
        ];

        reindex(&mut pool);

        assert_eq!(pool[0].id, 0);
        assert_eq!(pool[1].id, 1);
    }

    #[test]
    fn test_plan_request_wire_shape() {
        let json = r#"{
            "destination": "Lisbon",
            "budgetMax": 900,
            "persona": "Foodie",
            "isReligious": true,
            "duration": 2
        }"#;

        let req: PlanRequest = serde_json::from_str(json).unwrap();

        assert_eq!(req.destination, "Lisbon");
        assert_eq!(req.budget_max, 900);
        assert!(req.religious_sites_ok);
        assert_eq!(req.duration_days, 2);
        // Defaults applied for omitted fields
        assert_eq!(req.start_time, "09:00");
        assert_eq!(req.end_time, "21:00");
        assert_eq!(req.accommodation, "Boutique Hotel");
    }

    #[test]
    fn test_activity_node_wire_names() {
        let node = ActivityNode {
            id: 0,
            title: "Old Town".to_string(),
            time: "09:00".to_string(),
            address: "Main St".to_string(),
            lat: 41.38,
            lon: 2.17,
            category: "Outdoor".to_string(),
            rationale: "fits the vibe".to_string(),
            description: String::new(),
            price: "$10".to_string(),
            reached: false,
        };

        let json = serde_json::to_value(&node).unwrap();

        assert_eq!(json["loc"], "Main St");
        assert_eq!(json["type"], "Outdoor");
        assert_eq!(json["logic"], "fits the vibe");
        assert_eq!(json["reached"], false);
    }

    #[test]
    fn test_insight_accessors() {
        let mut fields = BTreeMap::new();
        fields.insert("content".to_string(), "ok".to_string());
        fields.insert("value".to_string(), "1.2km".to_string());

        let insight = InsightRecord {
            category: "Stay_Optimization".to_string(),
            fields,
        };

        assert_eq!(insight.content(), Some("ok"));
        assert_eq!(insight.value(), Some("1.2km"));
    }
}
