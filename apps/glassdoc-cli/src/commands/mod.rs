use crate::config::CliConfig;
use anyhow::{Context, Result, bail};
use clap::Args;
use glassdoc_sdk::Gateway;
use glassdoc_sdk::types::{ApiResponse, BaseQuery, NoData, Pagination};
use serde::Serialize;

mod applications;
mod companies;
mod files;
mod session;
mod templates;

pub use applications::ApplicationsArgs;
pub use companies::CompaniesArgs;
pub use files::{DownloadArgs, GenerateArgs, UploadArgs};
pub use session::SessionArgs;
pub use templates::TemplatesArgs;

/// Paging and search flags shared by list commands
#[derive(Args)]
pub struct ListArgs {
    #[arg(long)]
    page: Option<u32>,
    #[arg(long)]
    per_page: Option<u32>,
    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,
}

impl ListArgs {
    fn query(&self) -> BaseQuery {
        BaseQuery {
            page: self.page,
            per_page: self.per_page,
            search: self.search.clone(),
            ..BaseQuery::default()
        }
    }
}

pub fn endpoint(config: &CliConfig) -> Result<()> {
    let endpoint = config.endpoint.resolve()?;
    println!("{endpoint}");
    println!("source: {}", endpoint.source());
    println!("api:    {}", endpoint.api_base());
    Ok(())
}

pub async fn health(gateway: &Gateway) -> Result<()> {
    let health = gateway.system().health().await?;
    println!("status: {}", health.status);
    if let Some(database) = &health.database {
        println!("database: {database}");
    }
    if let Some(message) = &health.message {
        println!("message: {message}");
    }
    if !health.is_healthy() {
        bail!("backend reports status '{}'", health.status);
    }
    Ok(())
}

/// Payload of a successful envelope
fn payload<T>(resp: ApiResponse<T>) -> Result<T> {
    if !resp.success {
        bail!(
            "{}",
            resp.message
                .unwrap_or_else(|| "request was not successful".to_owned())
        );
    }
    resp.data.context("response carried no data")
}

/// Report an envelope without payload
fn confirm(resp: ApiResponse<NoData>, done: &str) -> Result<()> {
    if !resp.success {
        bail!("{}", resp.message.as_deref().unwrap_or(done));
    }
    println!("{}", resp.message.as_deref().unwrap_or(done));
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_pagination(pagination: &Pagination) {
    println!(
        "page {}/{} ({} total)",
        pagination.page, pagination.pages, pagination.total
    );
}
