//! Statistics report bodies.
//!
//! Aggregates are computed in the document store and then enriched with
//! names resolved from the relational store; entries with no matching
//! relational record keep their name fields empty rather than being
//! dropped.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalStatistics {
    pub total_achievements: i64,
    #[serde(rename = "topStudents")]
    pub points_distribution: Vec<TopStudent>,
    pub type_distribution: HashMap<String, i64>,
    pub level_distribution: HashMap<String, i64>,
    pub trend_by_year: HashMap<String, i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    pub student_id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub program_study: String,
    pub total_points: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentStatistics {
    #[serde(default)]
    pub student_name: String,
    pub total_points: i64,
    pub total_achievements: i64,
    pub by_type: HashMap<String, i64>,
}
