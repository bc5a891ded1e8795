use orderdesk_shared::constants::PRODUCT_LIST_LIMIT;
use orderdesk_shared::CollectionKind;
use orderdesk_sync::ProductDraft;

use super::{footer, load_pages, resolve_id};
use crate::cli::ProductCommand;
use crate::state::AppState;
use crate::table::{money, truncate, Table};

pub async fn run(state: &AppState, command: ProductCommand) -> anyhow::Result<()> {
    let engine = &state.engine;
    match command {
        ProductCommand::List { paging } => {
            load_pages(engine, CollectionKind::Products, paging.pages).await?;
            let products = engine.products().snapshot();

            let mut table = Table::new(&["ID", "NAME", "PRICE"]);
            for p in products.iter().take(PRODUCT_LIST_LIMIT) {
                table.row(vec![
                    p.id.short().to_string(),
                    truncate(&p.name, 40),
                    p.price.map(money).unwrap_or_else(|| "-".into()),
                ]);
            }
            print!("{}", table.render());
            if products.len() > PRODUCT_LIST_LIMIT {
                println!("... {} more not shown", products.len() - PRODUCT_LIST_LIMIT);
            }
            println!("{}", footer(engine, CollectionKind::Products, products.len()));
        }
        ProductCommand::Add { id, name, price } => {
            let id = id.map(|id| resolve_id(engine.products(), &id));
            let id = engine.save_product(ProductDraft { id, name, price }).await?;
            println!("{id}");
        }
        ProductCommand::Delete { id } => {
            let id = resolve_id(engine.products(), &id);
            engine.delete_product(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}
