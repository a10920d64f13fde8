use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{load_settings, AccessToken, ListQueryController, Listable, Storefront};
use serde::Serialize;
use shared::{
    domain::{CartLineId, InventoryId, OrderAction, OrderId, Role, SortOrder},
    protocol::{InventoryItem, Order, Product, QueryPatch, Registration, StoreProduct, User},
};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(about = "Marketplace storefront client")]
struct Cli {
    /// Overrides `api_base` from storefront.toml and the environment.
    #[arg(long)]
    api_base: Option<String>,
    /// Previously issued access token; skips the password login.
    #[arg(long, env = "STOREFRONT_TOKEN")]
    token: Option<String>,
    #[arg(long)]
    username: Option<String>,
    #[arg(long, env = "STOREFRONT_PASSWORD")]
    password: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Creates a seller or buyer account.
    Register(RegisterArgs),
    /// Signs in and prints the access token for later `--token` use.
    Login,
    /// Prints one page of a list visible to the signed-in role.
    List {
        kind: ListKind,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        sort_by: Option<String>,
        #[arg(long)]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Pages through completed and cancelled orders.
    History {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Prints the items of one order.
    Items { order_id: Uuid },
    /// Lists catalog products a seller can stock.
    ProductOptions,
    #[command(subcommand)]
    Cart(CartCommand),
    /// Moves an order on the given page through its workflow.
    Order {
        order_id: Uuid,
        action: ActionArg,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long, env = "STOREFRONT_PASSWORD")]
    password: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
    #[arg(long, value_enum)]
    role: RoleArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Seller,
    Buyer,
}

#[derive(Subcommand, Debug)]
enum CartCommand {
    Show,
    Add {
        inventory_id: Uuid,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    Inc {
        line_id: Uuid,
    },
    Dec {
        line_id: Uuid,
    },
    Remove {
        line_id: Uuid,
    },
    Clear,
    Checkout,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ListKind {
    Users,
    Products,
    Store,
    Inventory,
    Orders,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ActionArg {
    Confirm,
    Ready,
    Cancel,
    Complete,
}

impl From<ActionArg> for OrderAction {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Confirm => OrderAction::Confirm,
            ActionArg::Ready => OrderAction::Ready,
            ActionArg::Cancel => OrderAction::Cancel,
            ActionArg::Complete => OrderAction::Complete,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_base) = cli.api_base.clone() {
        settings.api_base = api_base;
    }
    let storefront = Storefront::connect(&settings).context("invalid client settings")?;
    // Registration runs without a session.
    if let Command::Register(args) = &cli.command {
        return register(&storefront, args).await;
    }
    sign_in(&storefront, &cli).await?;

    match cli.command {
        Command::Login => {
            let token = storefront
                .session()
                .token()
                .await
                .context("session ended right after sign-in")?;
            println!("{}", token.as_str());
        }
        Command::Register(_) => {}
        Command::List {
            kind,
            search,
            sort_by,
            desc,
            page,
            size,
        } => {
            let patches = list_patches(search, sort_by, desc, page, size);
            match kind {
                ListKind::Users => print_page(storefront.list::<User>().await?, patches).await?,
                ListKind::Products => {
                    print_page(storefront.list::<Product>().await?, patches).await?
                }
                ListKind::Store => {
                    print_page(storefront.list::<StoreProduct>().await?, patches).await?
                }
                ListKind::Inventory => {
                    print_page(storefront.list::<InventoryItem>().await?, patches).await?
                }
                ListKind::Orders => print_page(storefront.list::<Order>().await?, patches).await?,
            }
        }
        Command::History { page } => {
            let history = storefront.order_history().await?;
            print_page(history, vec![QueryPatch::page(page)]).await?;
        }
        Command::Items { order_id } => {
            for item in storefront.order_items(OrderId(order_id)).await? {
                println!("{}", serde_json::to_string(&item)?);
            }
        }
        Command::ProductOptions => {
            for option in storefront.product_options().await? {
                println!("{}  {}", option.id, option.name);
            }
        }
        Command::Cart(command) => run_cart(&storefront, command).await?,
        Command::Order {
            order_id,
            action,
            page,
        } => {
            let orders = storefront.list::<Order>().await?;
            orders.set_query(QueryPatch::page(page)).await?;
            orders
                .apply_order_action(OrderId(order_id), action.into())
                .await
                .with_context(|| format!("order {order_id}"))?;
            println!("order {order_id}: {action:?} accepted");
        }
    }

    Ok(())
}

async fn register(storefront: &Storefront, args: &RegisterArgs) -> Result<()> {
    let role = match args.role {
        RoleArg::Seller => Role::Seller,
        RoleArg::Buyer => Role::Buyer,
    };
    storefront
        .register(&Registration {
            username: args.username.clone(),
            password: args.password.clone(),
            name: args.name.clone(),
            phone: args.phone.clone(),
            address: args.address.clone(),
            role,
        })
        .await
        .context("registration failed")?;
    println!("registered {}; sign in with --username", args.username);
    Ok(())
}

async fn sign_in(storefront: &Storefront, cli: &Cli) -> Result<()> {
    if let Some(token) = &cli.token {
        let user = storefront
            .resume(AccessToken::new(token.clone()))
            .await
            .context("stored token was rejected")?;
        tracing::info!(username = %user.username, "resumed session");
        return Ok(());
    }
    let (Some(username), Some(password)) = (&cli.username, &cli.password) else {
        bail!("pass --token, or --username with --password");
    };
    storefront
        .login(username, password)
        .await
        .context("login failed")?;
    Ok(())
}

/// Filter changes send a query back to page 1, so the requested page is
/// applied after them as its own step.
fn list_patches(
    search: Option<String>,
    sort_by: Option<String>,
    desc: bool,
    page: u32,
    size: Option<u32>,
) -> Vec<QueryPatch> {
    let order = match (&sort_by, desc) {
        (_, true) => Some(SortOrder::Desc),
        (Some(_), false) => Some(SortOrder::Asc),
        (None, false) => None,
    };
    let filters = QueryPatch {
        search,
        sort_by,
        order,
        page: None,
        size,
    };
    if filters == QueryPatch::default() {
        return vec![QueryPatch::page(page)];
    }
    let mut patches = vec![filters];
    if page > 1 {
        patches.push(QueryPatch::page(page));
    }
    patches
}

async fn print_page<T: Listable + Serialize>(
    list: ListQueryController<T>,
    patches: Vec<QueryPatch>,
) -> Result<()> {
    for patch in patches {
        list.set_query(patch).await?;
    }
    let snapshot = list.snapshot().await;
    for item in &snapshot.items {
        println!("{}", serde_json::to_string(item)?);
    }
    println!(
        "page {}/{} ({} records)",
        snapshot.query.page,
        snapshot.page_count(),
        snapshot.total_records
    );
    Ok(())
}

async fn run_cart(storefront: &Storefront, command: CartCommand) -> Result<()> {
    let cart = storefront.cart();
    match command {
        CartCommand::Show => {}
        CartCommand::Add {
            inventory_id,
            quantity,
        } => cart.add_item(InventoryId(inventory_id), quantity).await?,
        CartCommand::Inc { line_id } => cart.increment(CartLineId(line_id)).await?,
        CartCommand::Dec { line_id } => cart.decrement(CartLineId(line_id)).await?,
        CartCommand::Remove { line_id } => cart.remove(CartLineId(line_id)).await?,
        CartCommand::Clear => cart.clear().await?,
        CartCommand::Checkout => {
            let receipt = cart.checkout().await?;
            println!("{}", serde_json::to_string(&receipt)?);
            return Ok(());
        }
    }

    for line in cart.lines().await {
        println!(
            "{}  {} x{} @ {} = {}",
            line.id,
            line.product_name,
            line.quantity,
            line.unit_price,
            line.line_total()
        );
    }
    println!(
        "{} items, subtotal {}",
        cart.item_count().await,
        cart.subtotal().await
    );
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
