//! User account command handlers

use crate::config::Config;
use crate::domain::Role;
use crate::state::SharedState;

pub async fn cmd_user_add(
    config: &Config,
    email: &str,
    name: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<()> {
    let role: Role = role.parse()?;
    let state = SharedState::new(config.clone()).await?;

    let user = state
        .accounts
        .create_user(email, name, password, role)
        .await?;

    println!("✓ Created {} ({}) with role {}", user.email, user.id, user.role);
    Ok(())
}

pub async fn cmd_user_list(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let users = state.accounts.list_users().await?;

    if users.is_empty() {
        println!("No users yet.");
        println!();
        println!("Add one with: authkeep user add --email <email> --name <name> --password <pw>");
        return Ok(());
    }

    println!("Users ({} total)", users.len());
    println!("{:-<70}", "");

    for user in users {
        let status = if user.is_active { "active" } else { "disabled" };
        println!(
            "{:>5}  {:<32} {:<12} {}",
            user.id.value(),
            user.email,
            user.role.as_str(),
            status
        );
        println!("       {}", user.name);
    }

    Ok(())
}

pub async fn cmd_user_set_active(config: &Config, email: &str, active: bool) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let user = state.accounts.set_active(email, active).await?;

    if active {
        println!("✓ Enabled {}", user.email);
    } else {
        println!("✓ Disabled {} and revoked its sessions", user.email);
    }
    Ok(())
}
