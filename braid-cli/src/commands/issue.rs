//! Issue inspection commands

use anyhow::Context;
use braid_core::{Config, Error, IssueStatus};
use clap::{Args, Subcommand};

use super::Workspace;

/// Issue commands
#[derive(Args, Debug)]
pub struct IssueArgs {
    #[command(subcommand)]
    pub command: IssueCommand,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// List issues in a repository
    List {
        /// Repository id
        repo: String,

        /// Only issues in this status (open, in_progress, review, closed)
        #[arg(short, long)]
        status: Option<IssueStatus>,
    },

    /// Show one issue
    Show {
        /// Issue id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

impl IssueArgs {
    /// Execute the issue command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = Workspace::open(config).await?;

        match &self.command {
            IssueCommand::List { repo, status } => {
                workspace.repos().get_repo(repo).await?;
                let issues = workspace.store.list_issues(repo, *status).await?;
                if issues.is_empty() {
                    println!("No issues");
                    return Ok(());
                }
                for issue in issues {
                    let platform = issue
                        .assigned_platform
                        .map(|p| p.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("{:<12} {:<12} {:<8} {}", issue.id, issue.status.as_str(), platform, issue.title);
                }
            }
            IssueCommand::Show { id, json } => {
                let issue = workspace
                    .store
                    .get_issue(id)
                    .await?
                    .ok_or_else(|| Error::IssueNotFound(id.clone()))?;

                if *json {
                    println!("{}", serde_json::to_string_pretty(&issue).context("Failed to encode issue")?);
                    return Ok(());
                }

                println!("Issue {}: {}", issue.id, issue.title);
                println!("  Repository: {}", issue.repo_id);
                println!("  Status: {}", issue.status);
                if let Some(platform) = issue.assigned_platform {
                    println!("  Assigned: {}", platform);
                }
                if let Some(platform) = issue.reviewer_platform {
                    println!("  Reviewer: {}", platform);
                }
                if let Some(branch) = &issue.branch_name {
                    println!("  Branch: {}", branch);
                }
                if !issue.depends_on.is_empty() {
                    println!("  Depends on: {}", issue.depends_on.join(", "));
                }
                if !issue.labels.is_empty() {
                    println!("  Labels: {}", issue.labels.join(", "));
                }
                println!("  Created: {}", issue.created_at.to_rfc3339());
                if let Some(closed) = issue.closed_at {
                    println!("  Closed: {}", closed.to_rfc3339());
                }
                if !issue.description.is_empty() {
                    println!();
                    println!("{}", issue.description);
                }
            }
        }

        Ok(())
    }
}
