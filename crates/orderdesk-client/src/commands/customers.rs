use orderdesk_shared::{CollectionKind, DocId};
use orderdesk_sync::{CustomerDraft, SyncEngine};
use tracing::info;

use super::{footer, load_pages, resolve_id};
use crate::cli::CustomerCommand;
use crate::state::AppState;
use crate::table::{truncate, Table};

pub async fn run(state: &AppState, command: CustomerCommand) -> anyhow::Result<()> {
    let engine = &state.engine;
    match command {
        CustomerCommand::List { paging } => {
            load_pages(engine, CollectionKind::Customers, paging.pages).await?;
            let customers = engine.customers().snapshot();

            let mut table = Table::new(&["ID", "NAME", "PHONE", "ADDRESS", "EMAIL"]);
            for c in &customers {
                table.row(vec![
                    c.id.short().to_string(),
                    truncate(&c.name, 32),
                    c.phone.clone(),
                    truncate(&c.address, 32),
                    c.email.clone(),
                ]);
            }
            print!("{}", table.render());
            println!("{}", footer(engine, CollectionKind::Customers, customers.len()));
        }
        CustomerCommand::Add {
            id,
            name,
            phone,
            address,
            email,
        } => {
            let id = id.map(|id| resolve_id(engine.customers(), &id));
            let id = engine
                .save_customer(CustomerDraft {
                    id,
                    name,
                    phone,
                    address,
                    email,
                })
                .await?;
            println!("{id}");
        }
        CustomerCommand::Delete { id } => {
            let id = delete(engine, &id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

/// Delete a customer once every order is loaded, so that the reference
/// check covers the whole collection.
async fn delete(engine: &SyncEngine, input: &str) -> anyhow::Result<DocId> {
    load_pages(engine, CollectionKind::Customers, usize::MAX).await?;
    load_pages(engine, CollectionKind::Orders, usize::MAX).await?;

    let id = resolve_id(engine.customers(), input);
    engine.delete_customer(&id).await?;
    info!(id = %id, orders = engine.len(CollectionKind::Orders), "Customer deleted");
    Ok(id)
}

#[cfg(test)]
mod tests {
    use orderdesk_sync::{LineItemDraft, OrderDraft, ReconcilePolicy, SyncConfig, SyncError};
    use tempfile::TempDir;

    use super::*;
    use crate::config::ClientConfig;

    fn config(dir: &TempDir, page_size: usize) -> ClientConfig {
        ClientConfig {
            db_path: Some(dir.path().join("orderdesk.db")),
            blob_path: Some(dir.path().join("blobs")),
            sync: SyncConfig {
                page_size,
                policy: ReconcilePolicy::IncrementalSplice,
                ..SyncConfig::default()
            },
        }
    }

    #[tokio::test]
    async fn test_delete_checks_orders_beyond_first_page() {
        let dir = TempDir::new().unwrap();

        let state = AppState::open(&config(&dir, 20)).await.unwrap();
        let engine = &state.engine;
        let ana = engine
            .save_customer(CustomerDraft {
                name: "Ana".into(),
                ..CustomerDraft::default()
            })
            .await
            .unwrap();
        let bruno = engine
            .save_customer(CustomerDraft {
                name: "Bruno".into(),
                ..CustomerDraft::default()
            })
            .await
            .unwrap();
        // Ana only has the oldest order
        for day in 1..=5u32 {
            let customer = if day == 1 { ana.clone() } else { bruno.clone() };
            engine
                .save_order(
                    OrderDraft {
                        customer_id: customer,
                        date: chrono::NaiveDate::from_ymd_opt(2024, 1, day)
                            .and_then(|d| d.and_hms_opt(10, 0, 0)),
                        items: vec![LineItemDraft::new("Pan")],
                        ..OrderDraft::default()
                    },
                    None,
                )
                .await
                .unwrap();
        }
        state.close().await;

        let state = AppState::open(&config(&dir, 2)).await.unwrap();
        assert_eq!(state.engine.len(CollectionKind::Orders), 2);

        let err = delete(&state.engine, ana.as_str()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::CustomerReferenced { orders: 1, .. })
        ));
        assert_eq!(state.engine.len(CollectionKind::Orders), 5);
        assert!(state.engine.customers().get(&ana).is_some());
        state.close().await;
    }
}
