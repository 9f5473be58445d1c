//! Source health overview for `codex sources`.
//!
//! Reports the configured repository, token presence, which branch
//! candidates actually resolve, and whether the local database opens.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::github::GitHubClient;

pub async fn run_sources(config: &Config) -> Result<()> {
    let client = GitHubClient::new(config)?;

    println!(
        "repository       {}/{}",
        config.repository.owner, config.repository.repo
    );
    println!("root             {}", config.repository.root);
    println!(
        "token            {}",
        if client.has_token() {
            "present (GITHUB_TOKEN)"
        } else {
            "absent — unauthenticated rate limits apply"
        }
    );
    println!();

    println!("{:<24} {}", "BRANCH", "STATUS");
    for branch in config.branch_candidates() {
        let status = match client.branch_exists(&branch).await {
            Ok(true) => "OK".to_string(),
            Ok(false) => "NOT FOUND".to_string(),
            Err(e) => format!("ERROR ({})", e),
        };
        println!("{:<24} {}", branch, status);
    }
    println!();

    let db_status = match db::connect(config).await {
        Ok(pool) => {
            pool.close().await;
            "OK"
        }
        Err(_) => "UNAVAILABLE",
    };
    println!("{:<24} {}", "database", db_status);

    Ok(())
}
