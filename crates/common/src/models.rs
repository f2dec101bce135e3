//! Domain models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A platform user, owned by the identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Program difficulty as chosen by the coach
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    /// Anything the coach tooling stored that we don't recognize
    Unrated,
}

impl Difficulty {
    /// Parse a stored difficulty label. Unknown labels map to `Unrated`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Unrated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
            Difficulty::Unrated => "unrated",
        }
    }
}

/// A coach-authored workout program
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub id: Uuid,
    pub coach_id: Uuid,
    pub title: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub is_public: bool,
    pub level_access: String,
    pub created_at: DateTime<Utc>,
}

/// A single schedulable exercise block; several units may share a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutUnit {
    pub id: Uuid,
    pub program_id: Uuid,
    pub day_number: i32,
    pub title: Option<String>,
    pub duration_minutes: i32,
}

/// Proof that one user completed one workout unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workout_unit_id: Uuid,
    pub completed_at: DateTime<Utc>,
    pub xp_earned: i64,
}

/// Per-user progress aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressLedger {
    pub user_id: Uuid,
    pub xp: i64,
    pub rank: i32,
    pub level_name: String,
    pub goal_achieved: bool,
    /// Overrides the default monthly challenge target when set
    pub monthly_challenge_target: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted lifecycle state of an assignment.
///
/// `overdue` is not stored; it is derived from the due date when read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Pending,
    Assigned,
    InProgress,
    Paused,
    Completed,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Pending => "pending",
            AssignmentStatus::Assigned => "assigned",
            AssignmentStatus::InProgress => "in_progress",
            AssignmentStatus::Paused => "paused",
            AssignmentStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(AssignmentStatus::Pending),
            "assigned" => Some(AssignmentStatus::Assigned),
            "in_progress" => Some(AssignmentStatus::InProgress),
            "paused" => Some(AssignmentStatus::Paused),
            "completed" => Some(AssignmentStatus::Completed),
            _ => None,
        }
    }
}

/// A program bound to a member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: Uuid,
    pub member_id: Uuid,
    pub program_id: Uuid,
    pub status: AssignmentStatus,
    pub assigned_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GoalType {
    LoseWeight,
    BuildMuscle,
    ImproveEndurance,
    GeneralFitness,
    IncreaseFlexibility,
}

impl GoalType {
    pub const ALL: [GoalType; 5] = [
        GoalType::LoseWeight,
        GoalType::BuildMuscle,
        GoalType::ImproveEndurance,
        GoalType::GeneralFitness,
        GoalType::IncreaseFlexibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::LoseWeight => "lose_weight",
            GoalType::BuildMuscle => "build_muscle",
            GoalType::ImproveEndurance => "improve_endurance",
            GoalType::GeneralFitness => "general_fitness",
            GoalType::IncreaseFlexibility => "increase_flexibility",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == value)
    }
}

/// A user's stated fitness objective
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub goal_type: GoalType,
    pub start_date: NaiveDate,
    /// `None` while the goal is ongoing
    pub end_date: Option<NaiveDate>,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}
