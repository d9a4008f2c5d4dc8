use super::{ListArgs, confirm, payload, print_json, print_pagination};
use anyhow::Result;
use clap::{Args, Subcommand, ValueEnum};
use glassdoc_sdk::Gateway;
use glassdoc_sdk::api::{GenerationProgress, SessionListQuery, SessionMetadata};
use glassdoc_sdk::types::SessionStatus;
use std::time::Duration;

/// Document-generation sessions
#[derive(Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Open a new session and print its id
    Create {
        #[arg(long)]
        project_name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Show a session as JSON
    Show { id: String },
    /// Delete a session and its files
    Delete { id: String },
    /// List sessions
    List {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },
    /// Show generation progress
    Progress {
        id: String,
        /// Poll until generation completes or fails
        #[arg(short, long)]
        watch: bool,
        /// Seconds between polls
        #[arg(long, default_value_t = 2)]
        interval: u64,
    },
    /// Cancel a running generation
    Cancel { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Active,
    Expired,
    Completed,
}

impl From<StatusArg> for SessionStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Active => Self::Active,
            StatusArg::Expired => Self::Expired,
            StatusArg::Completed => Self::Completed,
        }
    }
}

impl SessionArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let api = gateway.mvp();
        match self.command {
            SessionCommand::Create {
                project_name,
                description,
            } => {
                let metadata = SessionMetadata {
                    project_name,
                    description,
                };
                let created = payload(api.create_session(&metadata).await?)?;
                println!("{}", created.session_id);
            }
            SessionCommand::Show { id } => print_json(&payload(api.get_session(&id).await?)?)?,
            SessionCommand::Delete { id } => {
                confirm(api.delete_session(&id).await?, "session deleted")?;
            }
            SessionCommand::List { list, status } => {
                let base = list.query();
                let query = SessionListQuery {
                    page: base.page,
                    per_page: base.per_page,
                    status: status.map(SessionStatus::from),
                    search: base.search,
                };
                let page = payload(api.sessions(&query).await?)?;
                for session in &page.sessions {
                    println!(
                        "{}\t{}\t{}\t{} documents",
                        session.session_id,
                        session.status,
                        session.last_activity,
                        session.documents_count
                    );
                }
                print_pagination(&page.pagination);
            }
            SessionCommand::Progress {
                id,
                watch,
                interval,
            } => loop {
                let progress = payload(api.generation_progress(&id).await?)?;
                print_progress(&progress);
                if !watch || progress.status.is_finished() {
                    break;
                }
                tokio::time::sleep(Duration::from_secs(interval.max(1))).await;
            },
            SessionCommand::Cancel { id } => {
                confirm(api.cancel_generation(&id).await?, "generation cancelled")?;
            }
        }
        Ok(())
    }
}

fn print_progress(progress: &GenerationProgress) {
    let eta = progress
        .estimated_time
        .map_or_else(String::new, |eta| format!("  (~{eta:.0}s left)"));
    println!(
        "{:>5.1}%  {}  {}{eta}",
        progress.progress, progress.status, progress.current_step
    );
    if let Some(error) = &progress.error_message {
        eprintln!("generation error: {error}");
    }
}
