use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::VoteError;

// Lifecycle of an election event. Transitions are admin-driven and forward-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Active,
    Closed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "draft",
            EventStatus::Active => "active",
            EventStatus::Closed => "closed",
        }
    }

    /// Only `draft -> active` and `active -> closed` are allowed.
    pub fn can_transition_to(&self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Draft, EventStatus::Active) | (EventStatus::Active, EventStatus::Closed)
        )
    }
}

impl FromStr for EventStatus {
    type Err = VoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(EventStatus::Draft),
            "active" => Ok(EventStatus::Active),
            "closed" => Ok(EventStatus::Closed),
            other => Err(VoteError::InvalidEventState(format!("unknown status '{}'", other))),
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Open elections show running tallies while active; closed ones hide them until closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionType {
    Open,
    Closed,
}

impl ElectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElectionType::Open => "open",
            ElectionType::Closed => "closed",
        }
    }
}

impl FromStr for ElectionType {
    type Err = VoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ElectionType::Open),
            "closed" => Ok(ElectionType::Closed),
            other => Err(VoteError::InvalidEventState(format!("unknown election type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateStatus::Pending => "pending",
            CandidateStatus::Approved => "approved",
            CandidateStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for CandidateStatus {
    type Err = VoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CandidateStatus::Pending),
            "approved" => Ok(CandidateStatus::Approved),
            "rejected" => Ok(CandidateStatus::Rejected),
            other => Err(VoteError::InvalidEventState(format!("unknown candidate status '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Voter,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Voter => "voter",
        }
    }

    // Anything we don't recognise gets the least privileged role
    pub fn parse_lenient(s: &str) -> Self {
        match s {
            "admin" => Role::Admin,
            _ => Role::Voter,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionEvent {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: String,
    pub status: EventStatus,
    pub election_type: ElectionType,
    pub public_results: bool,
    pub show_results_after_voting: bool,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ElectionEvent {
    pub fn new(
        title: String,
        owner_id: String,
        election_type: ElectionType,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: None,
            owner_id,
            status: EventStatus::Draft,
            election_type,
            public_results: false,
            show_results_after_voting: false,
            start_time,
            end_time,
            created_at: Utc::now(),
        }
    }

    pub fn is_within_voting_window(&self, now: DateTime<Utc>) -> bool {
        self.start_time <= now && now < self.end_time
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub event_id: String,
    pub user_id: String,
    pub status: CandidateStatus,
    pub vision: String,
    pub mission: String,
    pub photo_url: Option<String>,
}

impl Candidate {
    pub fn new(event_id: String, user_id: String, vision: String, mission: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            user_id,
            status: CandidateStatus::Pending,
            vision,
            mission,
            photo_url: None,
        }
    }
}

// A roster group ("kelas")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: String,
    pub name: String,
}

impl ClassGroup {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
        }
    }
}

// A user belongs to at most one class; eligibility counting relies on this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub full_name: String,
    pub role: Role,
    pub class_id: Option<String>,
}

impl Profile {
    pub fn new(full_name: String, role: Role, class_id: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            full_name,
            role,
            class_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterGroup {
    pub event_id: String,
    pub class_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: String,
    pub event_id: String,
    pub candidate_id: String,
    pub voter_id: String,
    pub cast_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(event_id: String, candidate_id: String, voter_id: String, cast_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            event_id,
            candidate_id,
            voter_id,
            cast_at,
        }
    }
}

// Who is asking to see results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewer {
    pub is_authenticated: bool,
    pub is_owner_or_admin: bool,
    pub has_voted: bool,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn voter(has_voted: bool) -> Self {
        Self {
            is_authenticated: true,
            is_owner_or_admin: false,
            has_voted,
        }
    }

    pub fn owner() -> Self {
        Self {
            is_authenticated: true,
            is_owner_or_admin: true,
            has_voted: false,
        }
    }
}
