//! Deployment-tunable constants. The defaults mirror the production
//! settings; tests override individual fields instead of patching globals.

/// Default patient capacity for a care provider when none is recorded.
pub const DEFAULT_MAX_PATIENTS: i32 = 50;

/// Pending invitations expire this many days after creation.
pub const INVITATION_TTL_DAYS: i64 = 7;

/// Read notifications older than this are swept weekly.
pub const NOTIFICATION_RETENTION_DAYS: i64 = 30;

/// Trailing window inspected when deciding an automatic escalation.
pub const ESCALATION_WINDOW_HOURS: i64 = 24;

/// Minimum high-severity alerts inside the window to escalate.
pub const ESCALATION_HIGH_ALERT_MIN: i64 = 2;

/// Physiological boundaries for the anomaly classifier. All comparisons are
/// strict: a reading exactly on a boundary raises nothing.
#[derive(Debug, Clone)]
pub struct AnomalyThresholds {
    pub heart_rate_high: f64,
    pub heart_rate_severe_high: f64,
    pub heart_rate_low: f64,
    pub heart_rate_severe_low: f64,
    pub systolic_high: f64,
    pub systolic_severe_high: f64,
    pub systolic_low: f64,
    pub diastolic_high: f64,
    pub diastolic_low: f64,
    pub oxygen_low: f64,
    pub oxygen_severe_low: f64,
    pub temperature_high: f64,
    pub temperature_severe_high: f64,
    pub temperature_low: f64,
    pub glucose_high: f64,
    pub glucose_severe_high: f64,
    pub glucose_low: f64,
    pub glucose_severe_low: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            heart_rate_high: 100.0,
            heart_rate_severe_high: 120.0,
            heart_rate_low: 60.0,
            heart_rate_severe_low: 50.0,
            systolic_high: 140.0,
            systolic_severe_high: 160.0,
            systolic_low: 90.0,
            diastolic_high: 90.0,
            diastolic_low: 60.0,
            oxygen_low: 95.0,
            oxygen_severe_low: 90.0,
            temperature_high: 37.5,
            temperature_severe_high: 38.5,
            temperature_low: 36.0,
            glucose_high: 180.0,
            glucose_severe_high: 250.0,
            glucose_low: 70.0,
            glucose_severe_low: 54.0,
        }
    }
}

/// Point values for the care-team scorer. The `fast_*` fields drive the
/// lighter-weight doctor search used by manual escalation.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub specialization_match: f64,
    pub preferred_specialization: f64,
    pub certification: f64,
    pub experience_tier_senior: f64,
    pub experience_tier_mid: f64,
    pub availability_available: f64,
    pub availability_busy_urgent: f64,
    pub workload_max: f64,
    pub experience_cap: f64,
    pub experience_per_year: f64,
    pub fast_available: f64,
    pub fast_busy: f64,
    pub fast_condition_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            specialization_match: 100.0,
            preferred_specialization: 100.0,
            certification: 50.0,
            experience_tier_senior: 30.0,
            experience_tier_mid: 15.0,
            availability_available: 50.0,
            availability_busy_urgent: 25.0,
            workload_max: 50.0,
            experience_cap: 25.0,
            experience_per_year: 1.25,
            fast_available: 100.0,
            fast_busy: 50.0,
            fast_condition_bonus: 100.0,
        }
    }
}
