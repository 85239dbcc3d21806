//! Domain DTOs for the LMS backend.
//!
//! # Design
//! These mirror the mock-server's schema but are defined independently; the
//! integration tests catch drift between the two. Field names follow the
//! backend's camelCase JSON.

use serde::{Deserialize, Serialize};

/// A course as listed on the student and admin dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Course {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A test (quiz or exam) attached to a course.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub course_id: Option<i64>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
}

/// Request payload for creating a test. Omitted fields are not sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTest {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub course_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollment {
    pub course_id: i64,
}
