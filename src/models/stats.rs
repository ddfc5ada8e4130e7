//! Read-side aggregates over the candidate list.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Course;

/// Counts by status and course.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub by_course: BTreeMap<Course, usize>,
}

/// Per-course figures of the general report.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CourseReport {
    pub total: usize,
    pub approved: usize,
    pub rejected: usize,
    pub average: f64,
}

/// General report: overall stats plus per-course breakdown.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub stats: Stats,
    pub courses: BTreeMap<Course, CourseReport>,
    pub average: f64,
}
