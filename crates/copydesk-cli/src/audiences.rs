//! Read-only audience commands.

use clap::Subcommand;
use copydesk_core::{AudienceProfile, PROFILE_FIELDS};
use uuid::Uuid;

/// Sub-commands available under `audiences`.
#[derive(Debug, Subcommand)]
pub enum AudienceCommands {
    /// List a user's saved audiences
    List {
        #[arg(long)]
        user: Uuid,
    },
    /// Print every field of one audience
    Show {
        #[arg(long)]
        user: Uuid,
        #[arg(long)]
        id: Uuid,
    },
}

pub(crate) async fn run(pool: &sqlx::PgPool, command: AudienceCommands) -> anyhow::Result<()> {
    match command {
        AudienceCommands::List { user } => {
            let audiences = copydesk_db::list_audiences_for_user(pool, user).await?;
            if audiences.is_empty() {
                println!("no audiences saved for user {user}; run `wizard` to create one");
                return Ok(());
            }
            println!("{:<38}{:<10}NAME", "ID", "AGE");
            for audience in &audiences {
                println!("{}", list_line(audience));
            }
        }
        AudienceCommands::Show { user, id } => {
            let audience = copydesk_db::get_audience(pool, user, id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("audience '{id}' not found for user {user}"))?;
            print!("{}", describe(&audience));
        }
    }
    Ok(())
}

pub(crate) fn list_line(audience: &AudienceProfile) -> String {
    let id = audience.id.map(|id| id.to_string()).unwrap_or_default();
    format!("{id:<38}{:<10}{}", audience.age_range, audience.name)
}

/// One field per line in form order; list fields are numbered from 1.
pub(crate) fn describe(audience: &AudienceProfile) -> String {
    let mut out = String::new();
    for field in PROFILE_FIELDS {
        if let Some(text) = audience.text(field) {
            out.push_str(&format!("{field}: {text}\n"));
        } else if let Some(slots) = audience.slots(field) {
            out.push_str(&format!("{field}:\n"));
            for (i, slot) in slots.iter().enumerate() {
                out.push_str(&format!("  {}. {slot}\n", i + 1));
            }
        }
    }
    out
}
