use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, VoteError};
use crate::models::{
    Candidate, CandidateStatus, ClassGroup, ElectionEvent, EventStatus, Profile, Role, Vote, VoterGroup,
};

/// Read/write operations the handlers need from the backing store.
///
/// The store owns the "one vote per (event, voter)" rule: `cast_vote` must
/// report a conflicting insert as [`VoteError::DuplicateVote`], and refuse
/// ballots for events that are not active at `cast_at` with
/// [`VoteError::VotingClosed`].
#[async_trait]
pub trait ElectionStore: Send + Sync {
    async fn get_event(&self, event_id: &str) -> Result<ElectionEvent>;
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>>;
    async fn get_candidate(&self, candidate_id: &str) -> Result<Candidate>;
    async fn approved_candidates(&self, event_id: &str) -> Result<Vec<Candidate>>;
    async fn event_votes(&self, event_id: &str) -> Result<Vec<Vote>>;
    async fn voter_groups(&self, event_id: &str) -> Result<Vec<VoterGroup>>;
    async fn class_member_counts(&self, event_id: &str) -> Result<HashMap<String, u64>>;
    async fn is_eligible(&self, event_id: &str, user_id: &str) -> Result<bool>;
    async fn has_voted(&self, event_id: &str, user_id: &str) -> Result<bool>;
    async fn cast_vote(&self, vote: &Vote) -> Result<()>;
    async fn update_event_status(&self, event_id: &str, from: EventStatus, to: EventStatus) -> Result<bool>;
    async fn set_candidate_status(&self, candidate_id: &str, status: CandidateStatus) -> Result<()>;
    async fn expired_active_events(&self, now: DateTime<Utc>) -> Result<Vec<String>>;
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(db_url)?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to an in-memory database is a separate database
        let in_memory = db_url.contains(":memory:");
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        Self::init_schema(&pool).await?;
        info!("Connected to database {}", db_url);

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS classes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS profiles (
                id TEXT PRIMARY KEY,
                full_name TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'voter',
                class_id TEXT,
                FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE SET NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS election_events (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT,
                owner_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'draft',
                election_type TEXT NOT NULL DEFAULT 'closed',
                public_results BOOLEAN NOT NULL DEFAULT FALSE,
                show_results_after_voting BOOLEAN NOT NULL DEFAULT FALSE,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                vision TEXT NOT NULL,
                mission TEXT NOT NULL,
                photo_url TEXT,
                UNIQUE (event_id, user_id),
                FOREIGN KEY (event_id) REFERENCES election_events(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS voter_groups (
                event_id TEXT NOT NULL,
                class_id TEXT NOT NULL,
                PRIMARY KEY (event_id, class_id),
                FOREIGN KEY (event_id) REFERENCES election_events(id) ON DELETE CASCADE,
                FOREIGN KEY (class_id) REFERENCES classes(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                candidate_id TEXT NOT NULL,
                voter_id TEXT NOT NULL,
                cast_at TEXT NOT NULL,
                UNIQUE (event_id, voter_id),
                FOREIGN KEY (event_id) REFERENCES election_events(id) ON DELETE CASCADE,
                FOREIGN KEY (candidate_id) REFERENCES candidates(id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    pub async fn create_class(&self, class: &ClassGroup) -> Result<()> {
        sqlx::query("INSERT INTO classes (id, name) VALUES (?, ?)")
            .bind(&class.id)
            .bind(&class.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_profile(&self, profile: &Profile) -> Result<()> {
        sqlx::query("INSERT INTO profiles (id, full_name, role, class_id) VALUES (?, ?, ?, ?)")
            .bind(&profile.id)
            .bind(&profile.full_name)
            .bind(profile.role.as_str())
            .bind(&profile.class_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // Moves a profile to another class, or out of every class with `None`
    pub async fn assign_class(&self, user_id: &str, class_id: Option<&str>) -> Result<()> {
        sqlx::query("UPDATE profiles SET class_id = ? WHERE id = ?")
            .bind(class_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn create_event(&self, event: &ElectionEvent) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO election_events (id, title, description, owner_id, status, election_type,
                public_results, show_results_after_voting, start_time, end_time, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.owner_id)
        .bind(event.status.as_str())
        .bind(event.election_type.as_str())
        .bind(event.public_results)
        .bind(event.show_results_after_voting)
        .bind(timestamp(event.start_time))
        .bind(timestamp(event.end_time))
        .bind(timestamp(event.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_result_settings(
        &self,
        event_id: &str,
        public_results: bool,
        show_results_after_voting: bool,
    ) -> Result<()> {
        let updated = sqlx::query(
            r#"
            UPDATE election_events
            SET public_results = ?, show_results_after_voting = ?
            WHERE id = ?
            "#,
        )
        .bind(public_results)
        .bind(show_results_after_voting)
        .bind(event_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(VoteError::EventNotFound(event_id.to_string()));
        }
        Ok(())
    }

    // Candidates, roster links and votes go with it
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM election_events WHERE id = ?")
            .bind(event_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn add_candidate(&self, candidate: &Candidate) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO candidates (id, event_id, user_id, status, vision, mission, photo_url)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&candidate.id)
        .bind(&candidate.event_id)
        .bind(&candidate.user_id)
        .bind(candidate.status.as_str())
        .bind(&candidate.vision)
        .bind(&candidate.mission)
        .bind(&candidate.photo_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn add_voter_group(&self, event_id: &str, class_id: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO voter_groups (event_id, class_id) VALUES (?, ?)")
            .bind(event_id)
            .bind(class_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn remove_voter_group(&self, event_id: &str, class_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM voter_groups WHERE event_id = ? AND class_id = ?")
            .bind(event_id)
            .bind(class_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ElectionStore for Database {
    async fn get_event(&self, event_id: &str) -> Result<ElectionEvent> {
        let row = sqlx::query(
            r#"
            SELECT id, title, description, owner_id, status, election_type, public_results,
                show_results_after_voting, start_time, end_time, created_at
            FROM election_events
            WHERE id = ?
            "#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| VoteError::EventNotFound(event_id.to_string()))?;

        event_from_row(&row)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>> {
        let row = sqlx::query("SELECT id, full_name, role, class_id FROM profiles WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| Profile {
            id: row.get("id"),
            full_name: row.get("full_name"),
            role: Role::parse_lenient(&row.get::<String, _>("role")),
            class_id: row.get("class_id"),
        }))
    }

    async fn get_candidate(&self, candidate_id: &str) -> Result<Candidate> {
        let row = sqlx::query(
            r#"
            SELECT id, event_id, user_id, status, vision, mission, photo_url
            FROM candidates
            WHERE id = ?
            "#,
        )
        .bind(candidate_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| VoteError::CandidateNotFound(candidate_id.to_string()))?;

        candidate_from_row(&row)
    }

    // Insertion order; the tally uses it to break ties
    async fn approved_candidates(&self, event_id: &str) -> Result<Vec<Candidate>> {
        sqlx::query(
            r#"
            SELECT id, event_id, user_id, status, vision, mission, photo_url
            FROM candidates
            WHERE event_id = ? AND status = 'approved'
            ORDER BY rowid
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(candidate_from_row)
        .collect()
    }

    async fn event_votes(&self, event_id: &str) -> Result<Vec<Vote>> {
        sqlx::query(
            r#"
            SELECT id, event_id, candidate_id, voter_id, cast_at
            FROM votes
            WHERE event_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|row| -> Result<Vote> {
            Ok(Vote {
                id: row.get("id"),
                event_id: row.get("event_id"),
                candidate_id: row.get("candidate_id"),
                voter_id: row.get("voter_id"),
                cast_at: parse_timestamp(&row.get::<String, _>("cast_at"), "cast_at")?,
            })
        })
        .collect()
    }

    async fn voter_groups(&self, event_id: &str) -> Result<Vec<VoterGroup>> {
        let groups = sqlx::query("SELECT event_id, class_id FROM voter_groups WHERE event_id = ?")
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| VoterGroup {
                event_id: row.get("event_id"),
                class_id: row.get("class_id"),
            })
            .collect();
        Ok(groups)
    }

    async fn class_member_counts(&self, event_id: &str) -> Result<HashMap<String, u64>> {
        let rows = sqlx::query(
            r#"
            SELECT vg.class_id AS class_id, COUNT(p.id) AS members
            FROM voter_groups vg
            LEFT JOIN profiles p ON p.class_id = vg.class_id
            WHERE vg.event_id = ?
            GROUP BY vg.class_id
            "#,
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::with_capacity(rows.len());
        for row in rows {
            let class_id: String = row.get("class_id");
            let members: i64 = row.get("members");
            let members = u64::try_from(members).map_err(|_| VoteError::InvalidCount {
                context: format!("members of class {}", class_id),
                value: members,
            })?;
            counts.insert(class_id, members);
        }
        Ok(counts)
    }

    async fn is_eligible(&self, event_id: &str, user_id: &str) -> Result<bool> {
        let found = sqlx::query(
            r#"
            SELECT 1
            FROM profiles p
            JOIN voter_groups vg ON vg.class_id = p.class_id
            WHERE p.id = ? AND vg.event_id = ?
            "#,
        )
        .bind(user_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?
        .is_some();
        Ok(found)
    }

    async fn has_voted(&self, event_id: &str, user_id: &str) -> Result<bool> {
        let found = sqlx::query("SELECT 1 FROM votes WHERE event_id = ? AND voter_id = ?")
            .bind(event_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .is_some();
        Ok(found)
    }

    // The status and window check lives in the same statement as the insert,
    // so a close that commits first turns the ballot away
    async fn cast_vote(&self, vote: &Vote) -> Result<()> {
        let cast_at = timestamp(vote.cast_at);
        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (id, event_id, candidate_id, voter_id, cast_at)
            SELECT ?, ?, ?, ?, ?
            WHERE EXISTS (
                SELECT 1 FROM election_events
                WHERE id = ? AND status = 'active' AND start_time <= ? AND end_time > ?
            )
            "#,
        )
        .bind(&vote.id)
        .bind(&vote.event_id)
        .bind(&vote.candidate_id)
        .bind(&vote.voter_id)
        .bind(&cast_at)
        .bind(&vote.event_id)
        .bind(&cast_at)
        .bind(&cast_at)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(done) if done.rows_affected() == 0 => Err(VoteError::VotingClosed(vote.event_id.clone())),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(VoteError::DuplicateVote {
                event_id: vote.event_id.clone(),
                voter_id: vote.voter_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    // Compare-and-set: only moves the event if it is still in `from`
    async fn update_event_status(&self, event_id: &str, from: EventStatus, to: EventStatus) -> Result<bool> {
        let updated = sqlx::query(
            r#"
            UPDATE election_events
            SET status = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(to.as_str())
        .bind(event_id)
        .bind(from.as_str())
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    async fn set_candidate_status(&self, candidate_id: &str, status: CandidateStatus) -> Result<()> {
        let updated = sqlx::query("UPDATE candidates SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(candidate_id)
            .execute(&self.pool)
            .await?;

        if updated.rows_affected() == 0 {
            return Err(VoteError::CandidateNotFound(candidate_id.to_string()));
        }
        Ok(())
    }

    async fn expired_active_events(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        let ids = sqlx::query(
            r#"
            SELECT id
            FROM election_events
            WHERE status = 'active' AND end_time <= ?
            ORDER BY end_time
            "#,
        )
        .bind(timestamp(now))
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|row| row.get::<String, _>("id"))
        .collect();
        Ok(ids)
    }
}

// Fixed-width UTC so string comparison in SQL orders correctly
fn timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(value: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| VoteError::MalformedRow(format!("failed to parse {}: {}", column, e)))
}

fn event_from_row(row: &SqliteRow) -> Result<ElectionEvent> {
    Ok(ElectionEvent {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        owner_id: row.get("owner_id"),
        status: row.get::<String, _>("status").parse()?,
        election_type: row.get::<String, _>("election_type").parse()?,
        public_results: row.get("public_results"),
        show_results_after_voting: row.get("show_results_after_voting"),
        start_time: parse_timestamp(&row.get::<String, _>("start_time"), "start_time")?,
        end_time: parse_timestamp(&row.get::<String, _>("end_time"), "end_time")?,
        created_at: parse_timestamp(&row.get::<String, _>("created_at"), "created_at")?,
    })
}

fn candidate_from_row(row: &SqliteRow) -> Result<Candidate> {
    Ok(Candidate {
        id: row.get("id"),
        event_id: row.get("event_id"),
        user_id: row.get("user_id"),
        status: row.get::<String, _>("status").parse()?,
        vision: row.get("vision"),
        mission: row.get("mission"),
        photo_url: row.get("photo_url"),
    })
}
