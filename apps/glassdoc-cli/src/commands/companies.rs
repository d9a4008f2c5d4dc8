use super::{ListArgs, payload, print_json, print_pagination};
use anyhow::Result;
use clap::{Args, Subcommand};
use glassdoc_sdk::Gateway;

/// Applicant companies
#[derive(Args)]
pub struct CompaniesArgs {
    #[command(subcommand)]
    command: CompaniesCommand,
}

#[derive(Subcommand)]
enum CompaniesCommand {
    /// List companies
    List {
        #[command(flatten)]
        list: ListArgs,
        /// Fetch every company in one page
        #[arg(long, conflicts_with_all = ["page", "per_page"])]
        all: bool,
    },
    /// Show one company as JSON
    Get { id: u64 },
}

impl CompaniesArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let api = gateway.companies();
        match self.command {
            CompaniesCommand::List { list, all } => {
                let resp = if all {
                    api.list_all().await?
                } else {
                    api.list(&list.query()).await?
                };
                let page = payload(resp)?;
                for company in &page.companies {
                    println!(
                        "{}\t{}\t{}",
                        company.id,
                        company.name,
                        company.trade_names.join(", ")
                    );
                }
                print_pagination(&page.pagination);
            }
            CompaniesCommand::Get { id } => print_json(&payload(api.get(id).await?)?)?,
        }
        Ok(())
    }
}
