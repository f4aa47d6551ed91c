//! Repository commands

use braid_core::{Config, VersionControl};
use clap::{Args, Subcommand};

use super::Workspace;

/// Repository commands
#[derive(Args, Debug)]
pub struct RepoArgs {
    #[command(subcommand)]
    pub command: RepoCommand,
}

#[derive(Subcommand, Debug)]
pub enum RepoCommand {
    /// Create a repository with an initial commit on the target branch
    Create {
        /// Display name
        name: String,
    },

    /// List repositories
    List,

    /// Show commit history
    Log {
        /// Repository id
        repo: String,

        /// Branch to walk (defaults to the checked-out branch)
        #[arg(short, long)]
        branch: Option<String>,

        /// Maximum number of commits
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,
    },

    /// List branches
    Branches {
        /// Repository id
        repo: String,
    },
}

impl RepoArgs {
    /// Execute the repo command
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let workspace = Workspace::open(config).await?;

        match &self.command {
            RepoCommand::Create { name } => {
                let meta = workspace.repos().create_repo(name).await?;
                println!("Created repository {} ({})", meta.name, meta.id);
                println!("  Path: {}", workspace.vcs.repo_path(&meta.id)?.display());
            }
            RepoCommand::List => {
                let repos = workspace.repos().list_repo_info().await?;
                if repos.is_empty() {
                    println!("No repositories");
                    return Ok(());
                }
                for info in repos {
                    println!(
                        "{}  {:<24} {} ({} branches)",
                        info.id,
                        info.name,
                        info.current_branch,
                        info.branches.len()
                    );
                }
            }
            RepoCommand::Log { repo, branch, limit } => {
                workspace.repos().get_repo(repo).await?;
                for commit in workspace.vcs.log(repo, branch.as_deref(), *limit)? {
                    println!("{} {} {}", commit.hash, commit.date, commit.message.lines().next().unwrap_or(""));
                }
            }
            RepoCommand::Branches { repo } => {
                let info = workspace.repos().repo_info(repo).await?;
                for branch in info.branches {
                    let marker = if branch == info.current_branch { "*" } else { " " };
                    println!("{} {}", marker, branch);
                }
            }
        }

        Ok(())
    }
}
