use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use chrono::{NaiveDate, Utc};
use inventory_ledger::{
    client::{HttpInventoryClient, InventoryApi, Session},
    config,
    errors::LedgerError,
    ledger::Selection,
    models::{
        AliasGroup, AliasLink, AssemblyDetail, AssemblySummary, CreatePartOrderRequest, Part,
        PartOrder, UpdatePartRequest,
    },
    services::{
        AliasService, AllocationService, AutoConfirm, BatchReport, Confirmation, RemovalOutcome,
        Resynced,
    },
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "ledger-cli",
    about = "Allocate stock to assembly BOM lines and manage interchangeable parts"
)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[arg(
        long,
        short = 'y',
        global = true,
        action = ArgAction::SetTrue,
        help = "Answer yes to every confirmation prompt"
    )]
    yes: bool,
    #[arg(long, global = true, help = "Backend base URL; overrides server_url from config")]
    server_url: Option<String>,
    #[arg(long, global = true, help = "Operator name sent with every request")]
    operator: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show an assembly's BOM with allocation and shortfall per line
    Detail { assembly_id: i64 },
    /// Move free stock onto a BOM line
    Allocate(AmountArgs),
    /// Return allocated stock from a BOM line
    Deallocate(AmountArgs),
    /// Fill every selected line as far as stock allows
    AutoAllocate(AutoAllocateArgs),
    /// Deallocate a line fully, then delete it
    Remove(LineArgs),
    /// Move part of a line's per-unit quantity to an interchangeable part
    Swap(SwapArgs),
    /// Point a line at a different part
    Replace(ReplaceArgs),
    /// List parts interchangeable with a line's part
    Substitutes(LineArgs),
    /// Assemblies with lines still short of stock
    LowStock,
    #[command(subcommand)]
    Alias(AliasCommands),
    #[command(subcommand)]
    Stock(StockCommands),
}

#[derive(Args)]
struct LineArgs {
    assembly_id: i64,
    part_id: i64,
}

#[derive(Args)]
struct AmountArgs {
    assembly_id: i64,
    part_id: i64,
    #[arg(long, help = "Units to move; defaults to the maximum allowed")]
    amount: Option<i64>,
}

#[derive(Args)]
struct AutoAllocateArgs {
    assembly_id: i64,
    #[arg(long = "part", help = "Restrict to these part ids; repeatable")]
    parts: Vec<i64>,
}

#[derive(Args)]
struct SwapArgs {
    assembly_id: i64,
    #[arg(long)]
    from: i64,
    #[arg(long)]
    to: i64,
    #[arg(long, help = "Per-unit quantity to move to the target part")]
    quantity: i64,
}

#[derive(Args)]
struct ReplaceArgs {
    assembly_id: i64,
    part_id: i64,
    new_part_id: i64,
}

#[derive(Subcommand)]
enum AliasCommands {
    /// Put a part into the group named after it
    On { part_id: i64 },
    /// Take a part out of its group
    Off { part_id: i64 },
    /// Mark two parts as interchangeable
    Merge { source_part_id: i64, target_part_id: i64 },
    /// Parts in a group
    Links { alias_id: i64 },
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    Rename { alias_id: i64, alias_name: String },
    /// Link a part by name, creating it with zero stock if needed
    Add { alias_id: i64, part_name: String },
    Delete { alias_id: i64 },
}

#[derive(Subcommand)]
enum StockCommands {
    /// Overwrite a part's free stock after a count
    Set { part_id: i64, quantity: i64 },
    /// Order more of a part from a supplier
    Order {
        part_id: i64,
        quantity: i64,
        #[arg(long, help = "Order date (YYYY-MM-DD); defaults to today")]
        date: Option<NaiveDate>,
    },
    /// Open orders for one part, or the most recent ones
    Orders { part_id: Option<i64> },
    /// Receive an order into free stock
    Receive { order_id: i64 },
    /// Delete parts with no stock and no BOM lines
    Delete {
        #[arg(required = true)]
        part_ids: Vec<i64>,
    },
}

/// Asks on the terminal. Enter confirms; only n/no declines.
struct StdinConfirm;

impl Confirmation for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [Y/n] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            // Closed stdin is not an answer.
            Ok(0) | Err(_) => false,
            Ok(_) => accepts(&answer),
        }
    }
}

fn accepts(answer: &str) -> bool {
    !matches!(answer.trim().to_lowercase().as_str(), "n" | "no")
}

struct CliContext {
    api: Arc<HttpInventoryClient>,
    allocation: AllocationService<HttpInventoryClient>,
    aliases: AliasService<HttpInventoryClient>,
}

impl CliContext {
    fn initialize(cli: &Cli) -> Result<Self> {
        let config = config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let mut session = match &cli.server_url {
            Some(url) => {
                let mut session = Session::new(url)?;
                if let Some(timeout) = config.request_timeout() {
                    session = session.with_timeout(timeout);
                }
                session
            }
            None => Session::from_config(&config)?,
        };
        if let Some(operator) = &cli.operator {
            session = session.with_operator(operator.clone());
        } else if session.operator().is_none() {
            if let Ok(user) = std::env::var("USER") {
                session = session.with_operator(user);
            }
        }

        let confirmation: Arc<dyn Confirmation> = if cli.yes {
            Arc::new(AutoConfirm)
        } else {
            Arc::new(StdinConfirm)
        };
        let api = Arc::new(HttpInventoryClient::new(session));
        Ok(Self {
            allocation: AllocationService::new(Arc::clone(&api), confirmation),
            aliases: AliasService::new(Arc::clone(&api)),
            api,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let result = run(cli).await;
    if let Err(err) = &result {
        if err
            .downcast_ref::<LedgerError>()
            .is_some_and(LedgerError::is_client_side)
        {
            eprintln!("note: nothing was sent to the backend");
        }
    }
    result
}

async fn run(cli: Cli) -> Result<()> {
    let context = CliContext::initialize(&cli)?;
    let json = cli.json;

    match cli.command {
        Commands::Detail { assembly_id } => {
            let detail = context
                .allocation
                .load(assembly_id)
                .await
                .context("failed to load assembly")?;
            show_detail(&detail, json)?;
        }
        Commands::Allocate(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let resynced = context
                .allocation
                .allocate(&detail, args.part_id, args.amount)
                .await?;
            finish(resynced, json, |amount| println!("Allocated {} units.", amount))?;
        }
        Commands::Deallocate(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let resynced = context
                .allocation
                .deallocate(&detail, args.part_id, args.amount)
                .await?;
            finish(resynced, json, |amount| {
                println!("Returned {} units to stock.", amount)
            })?;
        }
        Commands::AutoAllocate(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let selection = if args.parts.is_empty() {
                Selection::All
            } else {
                Selection::Parts(args.parts)
            };
            let resynced = context.allocation.auto_allocate(&detail, &selection).await?;
            finish(resynced, json, render_batch)?;
        }
        Commands::Remove(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let outcome = context
                .allocation
                .remove_line(&detail, args.part_id)
                .await?;
            render_removal(&outcome, json)?;
        }
        Commands::Swap(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let resynced = context
                .allocation
                .swap(&detail, args.from, args.to, args.quantity)
                .await?;
            finish(resynced, json, |_| println!("Swap complete."))?;
        }
        Commands::Replace(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let resynced = context
                .allocation
                .replace_part(&detail, args.part_id, args.new_part_id)
                .await?;
            finish(resynced, json, |_| println!("Line now uses part {}.", args.new_part_id))?;
        }
        Commands::Substitutes(args) => {
            let detail = context.allocation.load(args.assembly_id).await?;
            let links = context
                .allocation
                .substitutes(&detail, args.part_id)
                .await?;
            show_links(&links, json)?;
        }
        Commands::LowStock => {
            let assemblies = context
                .api
                .low_stock_assemblies()
                .await
                .context("failed to load low-stock assemblies")?;
            if json {
                print_json(&assemblies)?;
            } else if assemblies.is_empty() {
                println!("Every assembly is fully allocated.");
            } else {
                assemblies.iter().for_each(render_summary);
            }
        }
        Commands::Alias(command) => handle_alias_command(&context, command, json).await?,
        Commands::Stock(command) => handle_stock_command(&context, command, json).await?,
    }

    Ok(())
}

async fn handle_alias_command(
    context: &CliContext,
    command: AliasCommands,
    json: bool,
) -> Result<()> {
    let service = &context.aliases;
    match command {
        AliasCommands::On { part_id } => show_group(&service.enable_alias(part_id).await?, json)?,
        AliasCommands::Off { part_id } => {
            service.disable_alias(part_id).await?;
            println!("Part {} removed from its alias group.", part_id);
        }
        AliasCommands::Merge {
            source_part_id,
            target_part_id,
        } => show_group(&service.merge(source_part_id, target_part_id).await?, json)?,
        AliasCommands::Links { alias_id } => show_links(&service.links(alias_id).await?, json)?,
        AliasCommands::Search { query, limit } => {
            let groups = service.search(&query, limit).await?;
            if json {
                print_json(&groups)?;
            } else {
                groups.iter().for_each(render_group);
            }
        }
        AliasCommands::Rename {
            alias_id,
            alias_name,
        } => show_group(&service.rename(alias_id, &alias_name).await?, json)?,
        AliasCommands::Add {
            alias_id,
            part_name,
        } => {
            let link = service.add_part_by_name(alias_id, &part_name).await?;
            show_links(std::slice::from_ref(&link), json)?;
        }
        AliasCommands::Delete { alias_id } => {
            service.delete_group(alias_id).await?;
            println!("Alias group {} deleted.", alias_id);
        }
    }
    Ok(())
}

async fn handle_stock_command(
    context: &CliContext,
    command: StockCommands,
    json: bool,
) -> Result<()> {
    let api = &context.api;
    match command {
        StockCommands::Set { part_id, quantity } => {
            let request = UpdatePartRequest {
                quantity: Some(quantity),
                ..Default::default()
            };
            show_part(&api.update_part(part_id, &request).await?, json)?;
        }
        StockCommands::Order {
            part_id,
            quantity,
            date,
        } => {
            let request = CreatePartOrderRequest {
                part_id,
                order_date: date.unwrap_or_else(|| Utc::now().date_naive()),
                quantity_ordered: quantity,
            };
            show_orders(std::slice::from_ref(&api.place_order(&request).await?), json)?;
        }
        StockCommands::Orders { part_id } => {
            let orders = match part_id {
                Some(part_id) => api.part_orders(part_id).await?,
                None => api.recent_orders().await?,
            };
            show_orders(&orders, json)?;
        }
        StockCommands::Receive { order_id } => {
            show_part(&api.fulfill_order(order_id).await?, json)?;
        }
        StockCommands::Delete { part_ids } => {
            api.delete_parts(&part_ids).await?;
            println!("Deleted {} parts.", part_ids.len());
        }
    }
    Ok(())
}

/// Prints the re-fetched detail, then the outcome. A failed request becomes
/// the command's error after the refreshed state has been shown.
fn finish<T: Serialize>(resynced: Resynced<T>, json: bool, render: impl FnOnce(&T)) -> Result<()> {
    let Resynced { outcome, detail } = resynced;
    if json {
        let value = outcome.as_ref().ok();
        print_json(&serde_json::json!({ "result": value, "detail": detail }))?;
    } else {
        if let Some(detail) = &detail {
            render_detail(detail);
        }
        if let Ok(value) = &outcome {
            render(value);
        }
    }
    if detail.is_none() {
        eprintln!("warning: could not refresh the assembly; the view above may be stale");
    }
    outcome.map(|_| ()).map_err(|err| anyhow!(err))
}

fn render_removal(outcome: &RemovalOutcome, json: bool) -> Result<()> {
    let removal = &outcome.removal;
    if json {
        print_json(&serde_json::json!({ "removal": removal, "detail": outcome.detail }))?;
    } else if let Some(detail) = &outcome.detail {
        render_detail(detail);
    }
    if outcome.is_deleted() {
        if !json {
            println!("Line removed.");
        }
        return Ok(());
    }
    if removal.pending_compensation() {
        return Err(anyhow!(
            "{} units were returned to stock but the line could not be deleted: {}; run remove again",
            removal.amount,
            removal.last_error().unwrap_or("unknown error")
        ));
    }
    Err(anyhow!(
        "removal stopped at {}: {}",
        removal.state(),
        removal.last_error().unwrap_or("unknown error")
    ))
}

fn show_detail(detail: &AssemblyDetail, json: bool) -> Result<()> {
    if json {
        print_json(detail)
    } else {
        render_detail(detail);
        Ok(())
    }
}

fn show_group(group: &AliasGroup, json: bool) -> Result<()> {
    if json {
        print_json(group)
    } else {
        render_group(group);
        Ok(())
    }
}

fn show_part(part: &Part, json: bool) -> Result<()> {
    if json {
        return print_json(part);
    }
    println!("- Part {} {} • stock {}", part.id, part.part_name, part.quantity);
    Ok(())
}

fn show_orders(orders: &[PartOrder], json: bool) -> Result<()> {
    if json {
        return print_json(orders);
    }
    if orders.is_empty() {
        println!("No open orders.");
    }
    for order in orders {
        println!(
            "  • order {} • {} • part {} {} • {} units",
            order.id, order.order_date, order.part_id, order.part_name, order.quantity_ordered
        );
    }
    Ok(())
}

fn show_links(links: &[AliasLink], json: bool) -> Result<()> {
    if json {
        return print_json(&links);
    }
    if links.is_empty() {
        println!("No linked parts.");
    }
    for link in links {
        println!(
            "  • part {} {} • stock {} • link {}",
            link.part_id, link.part_name, link.quantity, link.link_id
        );
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_detail(detail: &AssemblyDetail) {
    let assembly = &detail.assembly;
    let summary = detail.summary();
    println!(
        "- Assembly {} {} • build {} • status {} • {}% allocated",
        assembly.id,
        assembly.assembly_name,
        assembly.quantity_to_build,
        summary.status(),
        summary.rounded_percent()
    );
    for line in &detail.parts {
        let required = line.required(assembly.quantity_to_build);
        println!(
            "  {} part {} {} • ref {} • {}/{} allocated • stock {}{}{}",
            if line.is_short(assembly.quantity_to_build) { "!" } else { "•" },
            line.part_id,
            line.part_name,
            line.reference.as_deref().unwrap_or("-"),
            line.allocated_quantity,
            required,
            line.quantity,
            line.alias_name
                .as_deref()
                .map(|alias| format!(" • alias {}", alias))
                .unwrap_or_default(),
            if line.is_short(assembly.quantity_to_build) {
                format!(" • short {}", required - line.current_total())
            } else {
                String::new()
            }
        );
    }
}

fn render_batch(report: &BatchReport) {
    if report.is_success() {
        println!("Allocated {} lines.", report.succeeded);
        return;
    }
    println!("{}", report.summary());
    for (part_id, message) in &report.failures {
        println!("  • part {}: {}", part_id, message);
    }
}

fn render_summary(summary: &AssemblySummary) {
    println!(
        "- Assembly {} {} • build {} • status {} • {:.0}% allocated",
        summary.id,
        summary.assembly_name,
        summary.quantity_to_build,
        summary.status,
        summary.allocation_percent
    );
}

fn render_group(group: &AliasGroup) {
    println!("- Alias {} {}", group.id, group.alias_name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_confirms_and_only_no_declines() {
        assert!(accepts("\n"));
        assert!(accepts(""));
        assert!(accepts("y\n"));
        assert!(accepts(" YES "));
        assert!(!accepts("n\n"));
        assert!(!accepts("No"));
    }
}
