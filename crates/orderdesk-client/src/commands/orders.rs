use std::path::Path;

use anyhow::Context;
use orderdesk_shared::CollectionKind;
use orderdesk_store::Order;
use orderdesk_sync::attachments::is_pdf_url;
use orderdesk_sync::{Attachment, OrderDraft, OrderFilter, SyncEngine};

use super::{footer, load_pages, resolve_id};
use crate::cli::OrderCommand;
use crate::state::AppState;
use crate::table::{money, truncate, Table};

pub async fn run(state: &AppState, command: OrderCommand) -> anyhow::Result<()> {
    let engine = &state.engine;
    match command {
        OrderCommand::List {
            search,
            status,
            from,
            to,
            paging,
        } => {
            load_pages(engine, CollectionKind::Orders, paging.pages).await?;
            let filter = OrderFilter {
                text: search,
                status,
                date_from: from,
                date_to: to,
            };
            let orders = engine.filter_orders(&filter);
            print!("{}", render(engine, &orders));
            println!("{}", footer(engine, CollectionKind::Orders, orders.len()));
        }
        OrderCommand::Add {
            id,
            customer,
            items,
            date,
            status,
            comments,
            attachment,
            clear_attachment,
        } => {
            // the search text is built from the loaded customer
            load_pages(engine, CollectionKind::Customers, usize::MAX).await?;

            let attachment = match attachment {
                Some(path) => Some(read_attachment(&path).await?),
                None => None,
            };
            let draft = OrderDraft {
                id: id.map(|id| resolve_id(engine.orders(), &id)),
                customer_id: resolve_id(engine.customers(), &customer),
                date,
                status,
                comments,
                items,
                clear_attachment,
            };
            let id = engine.save_order(draft, attachment).await?;
            println!("{id}");
        }
        OrderCommand::Status { id, status } => {
            let id = resolve_id(engine.orders(), &id);
            engine.set_order_status(&id, status).await?;
            println!("{id} {status}");
        }
        OrderCommand::Delete { id } => {
            let id = resolve_id(engine.orders(), &id);
            engine.delete_order(&id).await?;
            println!("deleted {id}");
        }
    }
    Ok(())
}

async fn read_attachment(path: &Path) -> anyhow::Result<Attachment> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(Attachment::new(file_name, bytes))
}

fn render(engine: &SyncEngine, orders: &[Order]) -> String {
    let mut table = Table::new(&[
        "DATE", "CUSTOMER", "STATUS", "ITEMS", "TOTAL", "TICKET", "ID",
    ]);
    for order in orders {
        let customer = engine
            .customers()
            .get(&order.customer_id)
            .map(|c| c.name)
            .unwrap_or_else(|| order.customer_id.short().to_string());
        let items: Vec<String> = order
            .items
            .iter()
            .map(|i| format!("{}x {}", i.quantity, i.product_name))
            .collect();
        let ticket = match order.attachment_url.as_str() {
            "" => "",
            url if is_pdf_url(url) => "pdf",
            _ => "photo",
        };

        table.row(vec![
            order.date.replace('T', " "),
            truncate(&customer, 24),
            order.status.to_string(),
            truncate(&items.join(", "), 40),
            money(order.total()),
            ticket.to_string(),
            order.id.short().to_string(),
        ]);
    }
    table.render()
}
