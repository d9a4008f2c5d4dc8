use super::{ListArgs, payload, print_pagination};
use anyhow::Result;
use clap::{Args, Subcommand};
use glassdoc_sdk::Gateway;
use glassdoc_sdk::api::TemplateListQuery;

/// Document templates
#[derive(Args)]
pub struct TemplatesArgs {
    #[command(subcommand)]
    command: TemplatesCommand,
}

#[derive(Subcommand)]
enum TemplatesCommand {
    /// List templates
    List {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        category: Option<String>,
        /// Only active (true) or inactive (false) templates
        #[arg(long)]
        active: Option<bool>,
    },
    /// List the variables templates may use
    Variables,
}

impl TemplatesArgs {
    pub async fn run(self, gateway: &Gateway) -> Result<()> {
        let api = gateway.templates();
        match self.command {
            TemplatesCommand::List {
                list,
                category,
                active,
            } => {
                let query = TemplateListQuery {
                    base: list.query(),
                    category,
                    is_active: active,
                };
                let page = payload(api.list(&query).await?)?;
                for template in &page.templates {
                    let state = if template.is_active { "active" } else { "inactive" };
                    println!(
                        "{}\t{}\t{}\t{}",
                        template.template_name, template.category, state, template.display_name
                    );
                }
                print_pagination(&page.pagination);
            }
            TemplatesCommand::Variables => {
                for variable in payload(api.variables().await?)? {
                    let required = if variable.required { "*" } else { "" };
                    println!(
                        "{}{required}\t{}\t{}",
                        variable.name, variable.kind, variable.display_name
                    );
                }
            }
        }
        Ok(())
    }
}
