use super::{ListArgs, payload, print_json, print_pagination};
use anyhow::Result;
use clap::{Args, Subcommand};
use glassdoc_sdk::Gateway;
use glassdoc_sdk::api::ApplicationListQuery;

/// Certification applications
#[derive(Args)]
pub struct ApplicationsArgs {
    #[command(subcommand)]
    command: ApplicationsCommand,
}

#[derive(Subcommand)]
enum ApplicationsCommand {
    /// List applications
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Filter by status (draft, submitted, approved, ...)
        #[arg(long)]
        status: Option<String>,
        /// Filter by application type
        #[arg(long = "type")]
        application_type: Option<String>,
        #[arg(long)]
        company_id: Option<u64>,
    },
    /// Show one application as JSON
    Get { id: u64 },
    /// Show counts per status
    Stats,
}

impl ApplicationsArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let api = gateway.applications();
        match self.command {
            ApplicationsCommand::List {
                list,
                status,
                application_type,
                company_id,
            } => {
                let query = ApplicationListQuery {
                    base: list.query(),
                    status,
                    application_type,
                    company_id,
                };
                let page = payload(api.list(&query).await?)?;
                for app in &page.applications {
                    println!(
                        "{}\t{}\t{}\t{}",
                        app.id, app.application_number, app.status, app.title
                    );
                }
                print_pagination(&page.pagination);
            }
            ApplicationsCommand::Get { id } => print_json(&payload(api.get(id).await?)?)?,
            ApplicationsCommand::Stats => {
                let stats = payload(api.stats().await?)?;
                println!("total:     {}", stats.total);
                println!("draft:     {}", stats.draft);
                println!("pending:   {}", stats.pending);
                println!("approved:  {}", stats.approved);
                println!("rejected:  {}", stats.rejected);
            }
        }
        Ok(())
    }
}
