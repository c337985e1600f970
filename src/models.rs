use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatientStatus {
    Stable,
    Warning,
    Critical,
}

impl PatientStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatientStatus::Stable => "stable",
            PatientStatus::Warning => "warning",
            PatientStatus::Critical => "critical",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "stable" => Some(PatientStatus::Stable),
            "warning" => Some(PatientStatus::Warning),
            "critical" => Some(PatientStatus::Critical),
            _ => None,
        }
    }
}

/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Available,
    Busy,
    Offline,
}

impl Availability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Availability::Available => "available",
            Availability::Busy => "busy",
            Availability::Offline => "offline",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Availability::Available),
            "busy" => Some(Availability::Busy),
            "offline" => Some(Availability::Offline),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CareRole {
    Doctor,
    Caretaker,
}

impl CareRole {
    /// Role tag on the provider record. Doctors carry the historical
    /// "medical" tag.
    pub fn provider_tag(&self) -> &'static str {
        match self {
            CareRole::Doctor => "medical",
            CareRole::Caretaker => "caretaker",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CareRole::Doctor => "doctor",
            CareRole::Caretaker => "caretaker",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "doctor" | "medical" => Some(CareRole::Doctor),
            "caretaker" => Some(CareRole::Caretaker),
            _ => None,
        }
    }
}

impl std::fmt::Display for CareRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Routine,
    Urgent,
}

impl Urgency {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "routine" => Some(Urgency::Routine),
            "urgent" => Some(Urgency::Urgent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(InvitationStatus::Pending),
            "accepted" => Some(InvitationStatus::Accepted),
            "declined" => Some(InvitationStatus::Declined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub status: PatientStatus,
    pub chronic_conditions: Vec<String>,
    pub assigned_doctor_id: Option<Uuid>,
    pub assigned_caretaker_id: Option<Uuid>,
    pub assignment_reason: Option<serde_json::Value>,
    pub auto_escalate_to_doctor: bool,
    pub escalated_at: Option<DateTime<Utc>>,
    pub escalated_from: Option<Uuid>,
    pub escalation_reason: Option<String>,
}

impl Patient {
    /// Assignment requests may come from the patient or their current
    /// caretaker.
    pub fn is_managed_by(&self, actor: Uuid) -> bool {
        actor == self.id || self.assigned_caretaker_id == Some(actor)
    }

    /// Viewing and escalation extend to the assigned doctor.
    pub fn care_team_includes(&self, actor: Uuid) -> bool {
        self.is_managed_by(actor) || self.assigned_doctor_id == Some(actor)
    }
}

#[derive(Debug, Clone)]
pub struct CareProvider {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: CareRole,
    pub availability: Availability,
    pub specialization: Option<String>,
    pub years_in_practice: Option<i32>,
    pub certified: Option<bool>,
    pub experience_years: Option<i32>,
    pub max_patients: i32,
}

impl CareProvider {
    pub fn experience(&self) -> i32 {
        match self.role {
            CareRole::Doctor => self.years_in_practice.unwrap_or(0),
            CareRole::Caretaker => self.experience_years.unwrap_or(0),
        }
    }
}

/// A provider together with its derived workload. The patient count is
/// never stored on the provider record.
#[derive(Debug, Clone)]
pub struct ProviderWorkload {
    pub provider: CareProvider,
    pub current_patients: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsReading {
    pub heart_rate: Option<f64>,
    pub blood_pressure_systolic: Option<f64>,
    pub blood_pressure_diastolic: Option<f64>,
    pub oxygen_level: Option<f64>,
    pub temperature: Option<f64>,
    pub glucose: Option<f64>,
    pub respiration: Option<f64>,
    pub recorded_at: DateTime<Utc>,
    pub device_id: String,
}

impl VitalsReading {
    pub fn has_any_vital(&self) -> bool {
        self.heart_rate.is_some()
            || self.blood_pressure_systolic.is_some()
            || self.blood_pressure_diastolic.is_some()
            || self.oxygen_level.is_some()
            || self.temperature.is_some()
            || self.glucose.is_some()
            || self.respiration.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Invitation {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_email: String,
    pub invite_type: CareRole,
    pub status: InvitationStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_tags_round_trip() {
        for status in [
            PatientStatus::Stable,
            PatientStatus::Warning,
            PatientStatus::Critical,
        ] {
            assert_eq!(PatientStatus::parse(status.as_str()), Some(status));
        }
        for severity in [Severity::Low, Severity::Medium, Severity::High] {
            assert_eq!(Severity::parse(severity.as_str()), Some(severity));
        }
        assert_eq!(CareRole::parse("medical"), Some(CareRole::Doctor));
        assert_eq!(CareRole::parse("doctor"), Some(CareRole::Doctor));
        assert_eq!(PatientStatus::parse("unknown"), None);
    }

    #[test]
    fn severity_orders_high_above_medium() {
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn care_team_membership_checks() {
        let patient_id = Uuid::new_v4();
        let caretaker = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let stranger = Uuid::new_v4();

        let patient = Patient {
            id: patient_id,
            full_name: "Rosa Delgado".to_string(),
            email: "rosa@example.com".to_string(),
            status: PatientStatus::Stable,
            chronic_conditions: vec!["Hypertension".to_string()],
            assigned_doctor_id: Some(doctor),
            assigned_caretaker_id: Some(caretaker),
            assignment_reason: None,
            auto_escalate_to_doctor: false,
            escalated_at: None,
            escalated_from: None,
            escalation_reason: None,
        };

        assert!(patient.is_managed_by(patient_id));
        assert!(patient.is_managed_by(caretaker));
        assert!(!patient.is_managed_by(doctor));
        assert!(patient.care_team_includes(doctor));
        assert!(!patient.care_team_includes(stranger));
    }
}
