// Marketplace records exchanged with the remote API
//
// These mirror the API's JSON. Fields the API may omit default so that
// older records still deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Pending => "pending",
            ClassStatus::Approved => "approved",
            ClassStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(ClassStatus::Pending),
            "approved" => Some(ClassStatus::Approved),
            "rejected" => Some(ClassStatus::Rejected),
            _ => None,
        }
    }
}

/// A class offered by a teacher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub id: String,
    pub title: String,
    pub teacher_name: String,
    pub teacher_email: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: ClassStatus,
    #[serde(default)]
    pub total_enrollment: u32,
}

/// Fields a teacher provides when creating or editing a class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassDraft {
    pub title: String,
    pub price: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Review state of a teacher application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

/// Application to teach on the marketplace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherRequest {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub image: Option<String>,
    pub experience: String,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub status: RequestStatus,
}

/// Assignment attached to a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub class_id: String,
    pub title: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub submission_count: u32,
}

/// Fields a teacher provides when creating an assignment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentDraft {
    pub title: String,
    pub deadline: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

/// A student's submission for an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub assignment_id: String,
    pub class_id: String,
    pub student_email: String,
    pub url: String,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub grade: Option<f32>,
}

/// Body for a new submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSubmission {
    pub class_id: String,
    pub student_email: String,
    pub url: String,
}

/// A completed class payment (enrollment)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    pub class_id: String,
    pub student_email: String,
    pub price: f64,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

/// Feedback a student leaves for a class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub id: String,
    pub class_id: String,
    pub student_email: String,
    #[serde(default)]
    pub student_name: Option<String>,
    pub rating: u8,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_class_defaults() {
        let class: ClassRecord = serde_json::from_value(json!({
            "id": "c1",
            "title": "Rust 101",
            "teacher_name": "Ferris",
            "teacher_email": "ferris@example.com",
            "price": 49.0
        }))
        .unwrap();

        assert_eq!(class.status, ClassStatus::Pending);
        assert_eq!(class.total_enrollment, 0);
        assert!(class.image.is_none());
    }

    #[test]
    fn test_class_status_parsing() {
        assert_eq!(ClassStatus::from_str("Approved"), Some(ClassStatus::Approved));
        assert_eq!(ClassStatus::from_str("unknown"), None);
        assert_eq!(
            serde_json::to_value(ClassStatus::Rejected).unwrap(),
            json!("rejected")
        );
    }

    #[test]
    fn test_teacher_request_status_default() {
        let request: TeacherRequest = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "experience": "experienced",
            "title": "Math",
            "category": "science"
        }))
        .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);
    }
}
