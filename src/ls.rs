//! Directory listing for `codex ls`.

use anyhow::Result;

use crate::config::Config;
use crate::github::GitHubClient;
use crate::models::EntryKind;
use crate::tree::is_markdown;

pub async fn run_ls(config: &Config, path: &str) -> Result<()> {
    let client = GitHubClient::new(config)?;
    let (branch, entries) = client
        .list_directory(path, &config.branch_candidates())
        .await?;

    if entries.is_empty() {
        println!("Empty directory on branch '{}'.", branch);
        return Ok(());
    }

    for entry in &entries {
        match entry.kind {
            EntryKind::Dir => println!("{}/", entry.name),
            EntryKind::File => {
                let marker = if is_markdown(&entry.name) { "*" } else { " " };
                match entry.size {
                    Some(size) => println!("{} {:<48} {:>8}", marker, entry.name, size),
                    None => println!("{} {}", marker, entry.name),
                }
            }
        }
    }
    println!();
    println!("{} entries ({} @ {})", entries.len(), path, branch);

    Ok(())
}
