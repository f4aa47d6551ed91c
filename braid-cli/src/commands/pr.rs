//! Pull request inspection commands

use anyhow::Context;
use braid_core::{Config, Error, PrStatus, PullRequest, VersionControl};
use clap::{Args, Subcommand};

use super::Workspace;

/// Pull request commands
#[derive(Args, Debug)]
pub struct PrArgs {
    #[command(subcommand)]
    pub command: PrCommand,
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// List pull requests in a repository
    List {
        /// Repository id
        repo: String,

        /// Only pull requests in this status (open, reviewing, approved, rejected, merged)
        #[arg(short, long)]
        status: Option<PrStatus>,
    },

    /// Show one pull request
    Show {
        /// Pull request id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the diff a pull request would merge
    Diff {
        /// Pull request id
        id: String,
    },
}

impl PrArgs {
    /// Execute the pr command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = Workspace::open(config).await?;

        match &self.command {
            PrCommand::List { repo, status } => {
                workspace.repos().get_repo(repo).await?;
                let prs = workspace.store.list_prs(repo, *status).await?;
                if prs.is_empty() {
                    println!("No pull requests");
                    return Ok(());
                }
                for pr in prs {
                    println!("{}  {:<10} {:<12} {}", pr.id, pr.status.as_str(), pr.issue_id, pr.title);
                }
            }
            PrCommand::Show { id, json } => {
                let pr = load(&workspace, id).await?;

                if *json {
                    println!("{}", serde_json::to_string_pretty(&pr).context("Failed to encode pull request")?);
                    return Ok(());
                }

                println!("Pull request {}: {}", pr.id, pr.title);
                println!("  Issue: {}", pr.issue_id);
                println!("  Status: {}", pr.status);
                println!("  Branches: {} -> {}", pr.source_branch, pr.target_branch);
                if let Some(reviewer) = pr.reviewer_platform {
                    println!("  Reviewer: {}", reviewer);
                }
                if let Some(comment) = &pr.review_comment {
                    println!("  Review: {}", comment);
                }
                println!("  Created: {}", pr.created_at.to_rfc3339());
                if let Some(merged) = pr.merged_at {
                    println!("  Merged: {}", merged.to_rfc3339());
                }
            }
            PrCommand::Diff { id } => {
                let pr = load(&workspace, id).await?;
                let diff = workspace
                    .vcs
                    .branch_diff(&pr.repo_id, &pr.target_branch, &pr.source_branch)?;
                print!("{}", diff);
            }
        }

        Ok(())
    }
}

async fn load(workspace: &Workspace, id: &str) -> anyhow::Result<PullRequest> {
    Ok(workspace
        .store
        .get_pr(id)
        .await?
        .ok_or_else(|| Error::PrNotFound(id.to_string()))?)
}
