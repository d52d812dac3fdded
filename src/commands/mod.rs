use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::sync::Arc;

use crate::config::Config;
use crate::db::{Database, ElectionStore};
use crate::error::Result;
use crate::handlers::{event, results, vote};
use crate::models::EventStatus;
use crate::tasks::event_closer;

#[derive(Debug, Parser)]
#[command(author, version, about = "Campus e-voting results and ballot tool")]
pub struct Cli {
    #[command(flatten)]
    pub config: Config,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print an event's results as JSON, if the viewer may see them.
    Results {
        #[arg(long)]
        event: String,
        /// Profile id of the viewer; omit for an anonymous visitor.
        #[arg(long)]
        viewer: Option<String>,
    },
    /// Cast a ballot.
    Vote {
        #[arg(long)]
        event: String,
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        voter: String,
    },
    /// Open a draft event for voting.
    Activate {
        #[arg(long)]
        event: String,
        #[arg(long)]
        actor: String,
    },
    /// Close an active event.
    Close {
        #[arg(long)]
        event: String,
        #[arg(long)]
        actor: String,
    },
    /// Approve a pending candidate.
    Approve {
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        actor: String,
    },
    /// Reject a candidate.
    Reject {
        #[arg(long)]
        candidate: String,
        #[arg(long)]
        actor: String,
    },
    /// Close every active event whose end time has passed, once.
    CloseExpired,
    /// Keep closing expired events until interrupted.
    Watch,
}

pub async fn run(cli: Cli) -> Result<()> {
    let database = Arc::new(Database::connect(&cli.config.database_url).await?);
    let store: &dyn ElectionStore = database.as_ref();

    match cli.command {
        Command::Results { event: event_id, viewer } => match results::view_results(store, &event_id, viewer.as_deref()).await? {
            results::ResultsView::Visible(snapshot) => {
                let json = serde_json::to_string_pretty(&snapshot)?;
                println!("{}", json);
            }
            results::ResultsView::Hidden => println!("Results for this event are not available yet."),
        },
        Command::Vote { event: event_id, candidate, voter } => {
            match vote::cast_vote(store, &event_id, &candidate, &voter, Utc::now()).await {
                Ok(vote) => println!("Vote recorded ({}).", vote.id),
                Err(e) if e.is_duplicate_vote() => println!("You have already voted in this event."),
                Err(e) => return Err(e),
            }
        }
        Command::Activate { event: event_id, actor } => {
            event::transition_event(store, &event_id, &actor, EventStatus::Active).await?;
            println!("Event {} is now active.", event_id);
        }
        Command::Close { event: event_id, actor } => {
            event::transition_event(store, &event_id, &actor, EventStatus::Closed).await?;
            println!("Event {} is now closed.", event_id);
        }
        Command::Approve { candidate, actor } => {
            event::approve_candidate(store, &candidate, &actor).await?;
            println!("Candidate {} approved.", candidate);
        }
        Command::Reject { candidate, actor } => {
            event::reject_candidate(store, &candidate, &actor).await?;
            println!("Candidate {} rejected.", candidate);
        }
        Command::CloseExpired => {
            let closed = event_closer::close_expired_events(store, Utc::now()).await?;
            println!("Closed {} event(s).", closed);
        }
        Command::Watch => {
            let task = tokio::spawn(event_closer::check_expired_events_task(
                database.clone(),
                cli.config.close_check_interval_seconds,
            ));
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
            task.abort();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_results_for_anonymous_viewer() {
        let cli = Cli::parse_from(["campus-vote", "--database-url", "sqlite::memory:", "results", "--event", "ev1"]);
        assert_eq!(cli.config.database_url, "sqlite::memory:");
        assert!(matches!(
            cli.command,
            Command::Results { ref event, viewer: None } if event == "ev1"
        ));
    }

    #[test]
    fn serialization_failure_becomes_an_error() {
        let failed: Result<String> = serde_json::from_str::<String>("not json").map_err(Into::into);
        assert!(matches!(failed, Err(crate::error::VoteError::Serialization(_))));
    }

    #[tokio::test]
    async fn close_expired_runs_against_empty_database() {
        let cli = Cli::parse_from(["campus-vote", "--database-url", "sqlite::memory:", "close-expired"]);
        run(cli).await.unwrap();
    }
}
