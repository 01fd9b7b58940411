use std::io::Write;

use thiserror::Error;

use bucket_core::{BucketStore, FieldMutation, Item, ItemId, StoreError};

use crate::Command;

/// Length of the id prefix shown in listings.
const SHORT_ID_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("No item matches id {0:?}")]
    UnknownId(String),

    #[error("Id prefix {0:?} matches more than one item")]
    AmbiguousId(String),

    #[error("Nothing to change: pass --title, --description or --clear-description")]
    EmptyEdit,

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn execute(
    store: &BucketStore,
    command: Command,
    out: &mut impl Write,
) -> Result<(), CliError> {
    match command {
        Command::Add { title, description } => {
            let item = store.add(&title, description.as_deref()).await?;
            writeln!(out, "Added {}", render(&item))?;
        }
        Command::List { active, completed } => {
            let items = if active {
                store.list_active().await
            } else if completed {
                store.list_completed().await
            } else {
                store.list_all().await
            };
            let remaining = store.active_count().await;
            writeln!(
                out,
                "{} {} to do",
                remaining,
                if remaining == 1 { "item" } else { "items" }
            )?;
            if items.is_empty() {
                writeln!(out, "No bucket list items yet!")?;
            }
            for item in &items {
                writeln!(out, "{}", render(item))?;
                if let Some(description) = &item.description {
                    writeln!(out, "    {}", description)?;
                }
            }
        }
        Command::Toggle { id } => {
            let id = resolve_id(store, &id).await?;
            let item = store.toggle_complete(id).await?;
            writeln!(out, "{}", render(&item))?;
        }
        Command::Delete { id } => {
            let id = resolve_id(store, &id).await?;
            if store.delete(id).await? {
                writeln!(out, "Deleted {}", short_id(id))?;
            }
        }
        Command::Edit {
            id,
            title,
            description,
            clear_description,
        } => {
            let mut mutations = Vec::new();
            if let Some(title) = title {
                mutations.push(FieldMutation::SetTitle(title));
            }
            if clear_description {
                mutations.push(FieldMutation::SetDescription(None));
            } else if let Some(description) = description {
                mutations.push(FieldMutation::SetDescription(Some(description)));
            }
            if mutations.is_empty() {
                return Err(CliError::EmptyEdit);
            }

            let id = resolve_id(store, &id).await?;
            let item = store.update(id, mutations).await?;
            writeln!(out, "Updated {}", render(&item))?;
        }
    }
    Ok(())
}

/// Find the single item whose id starts with `prefix`.
async fn resolve_id(store: &BucketStore, prefix: &str) -> Result<ItemId, CliError> {
    let needle = prefix.trim().to_ascii_lowercase();
    if needle.is_empty() {
        return Err(CliError::UnknownId(prefix.to_string()));
    }

    let mut matches = store
        .list_all()
        .await
        .into_iter()
        .filter(|item| item.id.to_string().starts_with(&needle));

    match (matches.next(), matches.next()) {
        (Some(item), None) => Ok(item.id),
        (Some(_), Some(_)) => Err(CliError::AmbiguousId(prefix.to_string())),
        (None, _) => Err(CliError::UnknownId(prefix.to_string())),
    }
}

fn short_id(id: ItemId) -> String {
    id.to_string()[..SHORT_ID_LEN].to_string()
}

fn render(item: &Item) -> String {
    let mark = if item.completed { "x" } else { " " };
    match item.completed_at {
        Some(at) => format!(
            "[{}] {}  {}  (completed {})",
            mark,
            short_id(item.id),
            item.title,
            at.format("%b %-d, %Y")
        ),
        None => format!("[{}] {}  {}", mark, short_id(item.id), item.title),
    }
}
