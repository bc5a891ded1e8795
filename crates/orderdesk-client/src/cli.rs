//! Command-line surface.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use orderdesk_shared::constants::ORDER_DATE_FORMAT;
use orderdesk_shared::CollectionKind;
use orderdesk_store::OrderStatus;
use orderdesk_sync::LineItemDraft;

#[derive(Debug, Parser)]
#[command(name = "orderdesk")]
#[command(about = "Customers, products and orders kept in sync with the local store")]
#[command(version)]
pub struct Cli {
    /// Database file (overrides ORDERDESK_DB_PATH).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Documents per page (overrides ORDERDESK_PAGE_SIZE).
    #[arg(long, global = true)]
    pub page_size: Option<usize>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    Customers {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    Products {
        #[command(subcommand)]
        command: ProductCommand,
    },
    Orders {
        #[command(subcommand)]
        command: OrderCommand,
    },
    /// Print view events until Ctrl-C.
    Watch {
        /// Collection treated as the active view.
        #[arg(long, value_enum, default_value_t = ViewArg::Orders)]
        view: ViewArg,
        /// One JSON object per event.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Debug, Args)]
pub struct Paging {
    /// Pages to load before printing.
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    List {
        #[command(flatten)]
        paging: Paging,
    },
    /// Create a customer, or replace one with --id.
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Delete a customer that no loaded order references.
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum ProductCommand {
    List {
        #[command(flatten)]
        paging: Paging,
    },
    /// Create a product, or replace one with --id.
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Option<f64>,
    },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum OrderCommand {
    List {
        /// Case-insensitive text found in customer data, comments or items.
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
        /// First day included, YYYY-MM-DD.
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,
        /// Last day included, YYYY-MM-DD.
        #[arg(long, value_parser = parse_day)]
        to: Option<NaiveDate>,
        #[command(flatten)]
        paging: Paging,
    },
    /// Create an order, or replace one with --id.
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        customer: String,
        /// NAME[:QTY[:PRICE]], repeatable.
        #[arg(long = "item", required = true)]
        items: Vec<LineItemDraft>,
        /// YYYY-MM-DDTHH:MM, local time.
        #[arg(long, value_parser = parse_date_time)]
        date: Option<NaiveDateTime>,
        /// Defaults to pending, or to the stored status with --id.
        #[arg(long, value_parser = parse_status)]
        status: Option<OrderStatus>,
        /// Defaults to none, or to the stored comments with --id.
        #[arg(long)]
        comments: Option<String>,
        /// Receipt photo or PDF to upload.
        #[arg(long, conflicts_with = "clear_attachment")]
        attachment: Option<PathBuf>,
        /// Remove the stored attachment.
        #[arg(long, default_value_t = false)]
        clear_attachment: bool,
    },
    Status {
        id: String,
        #[arg(value_parser = parse_status)]
        status: OrderStatus,
    },
    Delete { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewArg {
    Customers,
    Products,
    Orders,
}

impl From<ViewArg> for CollectionKind {
    fn from(view: ViewArg) -> Self {
        match view {
            ViewArg::Customers => CollectionKind::Customers,
            ViewArg::Products => CollectionKind::Products,
            ViewArg::Orders => CollectionKind::Orders,
        }
    }
}

fn parse_status(s: &str) -> Result<OrderStatus, String> {
    OrderStatus::parse(s).ok_or_else(|| {
        let known: Vec<&str> = OrderStatus::ALL.iter().map(OrderStatus::as_str).collect();
        format!("unknown status '{s}', expected one of {}", known.join(", "))
    })
}

fn parse_day(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|e| format!("{s}: {e}"))
}

fn parse_date_time(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s.trim(), ORDER_DATE_FORMAT).map_err(|e| format!("{s}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("orderdesk").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_orders_list_filters() {
        let cli = parse(&[
            "orders", "list", "--search", "ana", "--status", "Delivered", "--from", "2024-01-02",
            "--to", "2024-01-04", "--pages", "3",
        ]);
        let Command::Orders {
            command:
                OrderCommand::List {
                    search,
                    status,
                    from,
                    to,
                    paging,
                },
        } = cli.command
        else {
            panic!("expected orders list");
        };
        assert_eq!(search.as_deref(), Some("ana"));
        assert_eq!(status, Some(OrderStatus::Delivered));
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 1, 4));
        assert_eq!(paging.pages, 3);
    }

    #[test]
    fn test_orders_add_repeats_items() {
        let cli = parse(&[
            "orders", "add", "--customer", "c1", "--item", "Pan:2:100", "--item", "Torta",
            "--date", "2024-05-01T09:30",
        ]);
        let Command::Orders {
            command: OrderCommand::Add { items, date, status, .. },
        } = cli.command
        else {
            panic!("expected orders add");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].quantity, Some(2));
        assert_eq!(status, None);
        assert!(date.is_some());
    }

    #[test]
    fn test_stored_status_names_accepted() {
        let cli = parse(&["orders", "status", "o1", "entregado"]);
        let Command::Orders {
            command: OrderCommand::Status { status, .. },
        } = cli.command
        else {
            panic!("expected orders status");
        };
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_bad_status_rejected() {
        let result = Cli::try_parse_from(["orderdesk", "orders", "status", "o1", "lost"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_db_flag() {
        let cli = parse(&["customers", "list", "--db", "/tmp/x.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
    }
}
