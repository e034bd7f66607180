use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use order_desk_api::OrderDeskApi;
use order_desk_core::{
    CustomerDraft, CustomerId, CustomerPatch, ItemDraft, ItemId, ItemPatch, ItemReference,
    OrderDraft, OrderId, OrderPatch,
};
use serde_json::Value;

const CLI_CONTRACT_VERSION: &str = "cli.v1";

#[derive(Debug, Parser)]
#[command(name = "odk")]
#[command(about = "OrderDesk CLI")]
struct Cli {
    #[arg(long, default_value = "./order_desk.sqlite3")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
    Customer {
        #[command(subcommand)]
        command: CustomerCommand,
    },
    Item {
        #[command(subcommand)]
        command: ItemCommand,
    },
    Order {
        #[command(subcommand)]
        command: OrderCommand,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommand {
    SchemaVersion,
    Migrate(DbMigrateArgs),
    IntegrityCheck,
}

#[derive(Debug, Args)]
struct DbMigrateArgs {
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

#[derive(Debug, Subcommand)]
enum CustomerCommand {
    Create(CustomerFieldArgs),
    Show(IdArg),
    Update(CustomerUpdateArgs),
    Delete(IdArg),
}

#[derive(Debug, Args)]
struct CustomerFieldArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Debug, Args)]
struct CustomerUpdateArgs {
    #[arg(long)]
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    Create(ItemFieldArgs),
    Show(IdArg),
    Update(ItemUpdateArgs),
    Delete(IdArg),
}

#[derive(Debug, Args)]
struct ItemFieldArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<f64>,
}

#[derive(Debug, Args)]
struct ItemUpdateArgs {
    #[arg(long)]
    id: i64,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    price: Option<f64>,
}

#[derive(Debug, Subcommand)]
enum OrderCommand {
    Create(OrderCreateArgs),
    Show(IdArg),
    Update(OrderUpdateArgs),
    Delete(IdArg),
}

#[derive(Debug, Args)]
struct OrderCreateArgs {
    #[arg(long)]
    cust_id: i64,
    #[arg(long = "item")]
    items: Vec<i64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Args)]
struct OrderUpdateArgs {
    #[arg(long)]
    id: i64,
    #[arg(long)]
    cust_id: Option<i64>,
    #[arg(long = "item")]
    items: Option<Vec<i64>>,
    /// Replace the item list with an empty one.
    #[arg(long, default_value_t = false, conflicts_with = "items")]
    clear_items: bool,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Debug, Args)]
struct IdArg {
    #[arg(long)]
    id: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let api = OrderDeskApi::new(cli.db);

    match cli.command {
        Command::Db { command } => run_db(&command, &api),
        Command::Customer { command } => run_customer(&command, &api),
        Command::Item { command } => run_item(&command, &api),
        Command::Order { command } => run_order(&command, &api),
    }
}

fn run_db(command: &DbCommand, api: &OrderDeskApi) -> Result<()> {
    match command {
        DbCommand::SchemaVersion => {
            let status = api.schema_status()?;
            emit_json(serde_json::to_value(status)?)
        }
        DbCommand::Migrate(args) => {
            let result = api.migrate(args.dry_run)?;
            emit_json(serde_json::to_value(result)?)
        }
        DbCommand::IntegrityCheck => {
            let report = api.integrity_check()?;
            emit_json(serde_json::to_value(report)?)
        }
    }
}

fn run_customer(command: &CustomerCommand, api: &OrderDeskApi) -> Result<()> {
    match command {
        CustomerCommand::Create(args) => {
            let record = api.create_customer(CustomerDraft {
                name: args.name.clone(),
                phone: args.phone.clone(),
            })?;
            emit_json(serde_json::json!({ "customer": record }))
        }
        CustomerCommand::Show(args) => {
            let record = api.get_customer(CustomerId(args.id))?;
            emit_json(serde_json::json!({ "customer": record }))
        }
        CustomerCommand::Update(args) => {
            api.update_customer(
                CustomerId(args.id),
                CustomerPatch { name: args.name.clone(), phone: args.phone.clone() },
            )?;
            let record = api.get_customer(CustomerId(args.id))?;
            emit_json(serde_json::json!({ "customer": record }))
        }
        CustomerCommand::Delete(args) => {
            api.delete_customer(CustomerId(args.id))?;
            emit_json(serde_json::json!({ "deleted": args.id, "entity": "customer" }))
        }
    }
}

fn run_item(command: &ItemCommand, api: &OrderDeskApi) -> Result<()> {
    match command {
        ItemCommand::Create(args) => {
            let record =
                api.create_item(ItemDraft { name: args.name.clone(), price: args.price })?;
            emit_json(serde_json::json!({ "item": record }))
        }
        ItemCommand::Show(args) => {
            let record = api.get_item(ItemId(args.id))?;
            emit_json(serde_json::json!({ "item": record }))
        }
        ItemCommand::Update(args) => {
            api.update_item(
                ItemId(args.id),
                ItemPatch { name: args.name.clone(), price: args.price },
            )?;
            let record = api.get_item(ItemId(args.id))?;
            emit_json(serde_json::json!({ "item": record }))
        }
        ItemCommand::Delete(args) => {
            api.delete_item(ItemId(args.id))?;
            emit_json(serde_json::json!({ "deleted": args.id, "entity": "item" }))
        }
    }
}

fn run_order(command: &OrderCommand, api: &OrderDeskApi) -> Result<()> {
    match command {
        OrderCommand::Create(args) => {
            let record = api.create_order(OrderDraft {
                cust_id: CustomerId(args.cust_id),
                items: item_refs(&args.items),
                notes: args.notes.clone(),
            })?;
            let view = api.get_order(record.id)?;
            emit_json(serde_json::json!({ "order": view }))
        }
        OrderCommand::Show(args) => {
            let view = api.get_order(OrderId(args.id))?;
            emit_json(serde_json::json!({ "order": view }))
        }
        OrderCommand::Update(args) => {
            let items = if args.clear_items {
                Some(Vec::new())
            } else {
                args.items.as_deref().map(item_refs)
            };
            api.update_order(
                OrderId(args.id),
                OrderPatch {
                    cust_id: args.cust_id.map(CustomerId),
                    items,
                    notes: args.notes.clone(),
                },
            )?;
            let view = api.get_order(OrderId(args.id))?;
            emit_json(serde_json::json!({ "order": view }))
        }
        OrderCommand::Delete(args) => {
            api.delete_order(OrderId(args.id))?;
            emit_json(serde_json::json!({ "deleted": args.id, "entity": "order" }))
        }
    }
}

fn item_refs(ids: &[i64]) -> Vec<ItemReference> {
    ids.iter().map(|id| ItemReference { id: ItemId(*id) }).collect()
}

fn emit_json(value: Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&with_contract_version(value))?);
    Ok(())
}

fn with_contract_version(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert(
                "cli_contract_version".to_string(),
                Value::String(CLI_CONTRACT_VERSION.to_string()),
            );
            Value::Object(map)
        }
        other => serde_json::json!({
            "cli_contract_version": CLI_CONTRACT_VERSION,
            "data": other
        }),
    }
}
