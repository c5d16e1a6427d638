use anyhow::{Context, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use rpgcog::config::Config;
use rpgcog::import::CatalogFile;
use rpgcog::models::character::CharacterDraft;
use rpgcog::models::equipment::EquipSlot;
use rpgcog::models::item::{Category, ItemDefinition, Rarity};
use rpgcog::models::types::{ItemId, MemberId};
use rpgcog::{DomainError, Registry};
use serde::Serialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

const REGISTRATION_MAX_AGE: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Parser)]
#[command(name = "rpgcog", version, about = "Role-play characters, inventories and equipment")]
struct Cli {
    /// Override database URL (if omitted, use env/config)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Keep everything in memory instead of postgres. State is lost on exit.
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the regeneration ticker until interrupted
    Serve,
    /// Item catalog
    #[command(subcommand)]
    Item(ItemCommand),
    /// Characters
    #[command(subcommand)]
    Char(CharCommand),
    /// Inventory and equipment of a character
    #[command(subcommand)]
    Inv(InvCommand),
}

#[derive(Debug, Subcommand)]
enum ItemCommand {
    /// Create a catalog item
    ///
    /// Weapons take: attack_type hands weapon_type material damage (eg: melee 1 sword iron 7).
    /// Armor takes: slot kind material armor (eg: helmet heavy iron 15).
    New {
        #[arg(value_parser = parse_key::<Category>)]
        category: Category,
        name: String,
        #[arg(long, default_value = "")]
        desc: String,
        #[arg(long, default_value_t = 0)]
        price: u32,
        #[arg(long, default_value = "common", value_parser = parse_key::<Rarity>)]
        rarity: Rarity,
        /// Category specific values
        args: Vec<String>,
    },
    /// Show an item by id or name
    Show { item: String },
    /// List the whole catalog
    List,
    /// Import items from a YAML catalog file
    Import { path: PathBuf },
}

#[derive(Debug, Subcommand)]
enum CharCommand {
    /// Create the member's character
    New {
        member: String,
        #[arg(long)]
        name: String,
        /// Race key from the game config (eg: nord)
        #[arg(long)]
        race: String,
        #[arg(long)]
        sex: String,
        #[arg(long, default_value = "")]
        desc: String,
    },
    Show { member: String },
    /// Pools, resistances, skills and armor rating
    Stats { member: String },
    /// Set the avatar url, or clear it when omitted
    Avatar { member: String, url: Option<String> },
    Delete { member: String },
}

#[derive(Debug, Args)]
struct StackArgs {
    member: String,
    /// Item id or name
    item: String,
    #[arg(long)]
    maker: Option<String>,
    #[arg(long)]
    temper: Option<u32>,
}

#[derive(Debug, Subcommand)]
enum InvCommand {
    Add {
        #[command(flatten)]
        stack: StackArgs,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    Remove {
        #[command(flatten)]
        stack: StackArgs,
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    Equip {
        #[command(flatten)]
        stack: StackArgs,
    },
    /// Unequip a slot (eg: right, helmet) or an item by id or name
    Unequip {
        member: String,
        #[arg(long, conflicts_with = "item", required_unless_present = "item", value_parser = parse_key::<EquipSlot>)]
        slot: Option<EquipSlot>,
        #[arg(long)]
        item: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let mut cfg = Config::from_env()?;
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }
    let cfg = Arc::new(cfg);

    let registry = if cli.memory {
        tracing::warn!("running with in-memory storage");
        Registry::in_memory(cfg.clone())
    } else {
        Registry::connect(cfg.clone())
            .await
            .context("cannot connect to database")?
    };
    let registry = Arc::new(registry);

    let result = match cli.command {
        Command::Serve => serve(registry).await,
        Command::Item(cmd) => item_command(&registry, cmd).await,
        Command::Char(cmd) => char_command(&registry, cmd).await,
        Command::Inv(cmd) => inv_command(&registry, cmd).await,
    };

    // rejections are reported plainly, everything else keeps its full report
    if let Err(e) = &result {
        if let Some(err) = e.downcast_ref::<DomainError>() {
            if err.is_user_facing() {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
    result
}

async fn serve(registry: Arc<Registry>) -> anyhow::Result<()> {
    tracing::info!(interval = ?registry.config.regen_interval, "rpgcog ticker running");
    spawn_background_tasks(registry);

    tokio::signal::ctrl_c().await.context("cannot listen for ctrl-c")?;
    tracing::info!("shutting down");
    Ok(())
}

fn spawn_background_tasks(registry: Arc<Registry>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(registry.config.regen_interval);
        let mut last = Instant::now();
        loop {
            interval.tick().await;
            let now = Instant::now();
            let elapsed = now.duration_since(last);
            last = now;

            if let Err(e) = registry.services.character.regenerate_all(elapsed).await {
                tracing::error!(error = %e, "regeneration tick failed");
            }
            let purged = registry.registrations.purge_stale(REGISTRATION_MAX_AGE);
            if purged > 0 {
                tracing::debug!(purged, "dropped stale registrations");
            }
        }
    });
}

async fn item_command(registry: &Registry, cmd: ItemCommand) -> anyhow::Result<()> {
    let catalog = &registry.services.catalog;
    match cmd {
        ItemCommand::New {
            category,
            name,
            desc,
            price,
            rarity,
            args,
        } => {
            let item = catalog
                .create_from_args(category, &name, &desc, price, rarity, &args[..])
                .await?;
            print_json(&item)
        }
        ItemCommand::Show { item } => print_json(&resolve_item(registry, &item).await?),
        ItemCommand::List => print_json(&catalog.list().await?),
        ItemCommand::Import { path } => {
            let file = CatalogFile::load(&path).with_context(|| format!("cannot read catalog {}", path.display()))?;
            let created = catalog.import(file.items).await?;
            print_json(&created)
        }
    }
}

async fn char_command(registry: &Registry, cmd: CharCommand) -> anyhow::Result<()> {
    let characters = &registry.services.character;
    match cmd {
        CharCommand::New {
            member,
            name,
            race,
            sex,
            desc,
        } => {
            let draft = CharacterDraft {
                member_id: MemberId::new(member),
                name,
                race: race.to_lowercase(),
                sex: sex.to_lowercase(),
                desc,
            };
            print_json(&characters.create(draft).await?)
        }
        CharCommand::Show { member } => print_json(&characters.get(&MemberId::new(member)).await?),
        CharCommand::Stats { member } => {
            let character = characters.get(&MemberId::new(member)).await?;
            print_json(&character.attributes)
        }
        CharCommand::Avatar { member, url } => {
            let member = MemberId::new(member);
            characters.set_avatar(&member, url).await?;
            print_json(&characters.get(&member).await?.avatar)
        }
        CharCommand::Delete { member } => {
            characters.delete(&MemberId::new(member)).await?;
            Ok(())
        }
    }
}

async fn inv_command(registry: &Registry, cmd: InvCommand) -> anyhow::Result<()> {
    let characters = &registry.services.character;
    let member = match &cmd {
        InvCommand::Add { stack, .. } | InvCommand::Remove { stack, .. } | InvCommand::Equip { stack } => {
            MemberId::new(stack.member.clone())
        }
        InvCommand::Unequip { member, .. } => MemberId::new(member.clone()),
    };

    match cmd {
        InvCommand::Add { stack, count } => {
            let item = resolve_item(registry, &stack.item).await?;
            characters
                .add_item(&member, item.id, count, stack.maker, stack.temper)
                .await?;
        }
        InvCommand::Remove { stack, count } => {
            let item = resolve_item(registry, &stack.item).await?;
            characters
                .remove_item(&member, item.id, count, stack.maker, stack.temper)
                .await?;
        }
        InvCommand::Equip { stack } => {
            let item = resolve_item(registry, &stack.item).await?;
            characters.equip(&member, item.id, stack.maker, stack.temper).await?;
        }
        InvCommand::Unequip { slot, item, .. } => match (slot, item) {
            (Some(slot), _) => {
                characters.unequip_slot(&member, slot).await?;
            }
            (None, Some(item)) => {
                let item = resolve_item(registry, &item).await?;
                characters.unequip_item(&member, item.id).await?;
            }
            (None, None) => bail!("either --slot or --item is required"),
        },
    }

    let character = characters.get(&member).await?;
    print_json(&serde_json::json!({
        "inventory": character.inventory,
        "equipment": character.equipment,
        "armor_rating": character.attributes.armor_rating(),
    }))
}

/// Accepts a numeric id or an item name. Names shared by several items must be given as an id.
async fn resolve_item(registry: &Registry, key: &str) -> anyhow::Result<ItemDefinition> {
    let catalog = &registry.services.catalog;
    if let Ok(id) = key.parse::<ItemId>() {
        return Ok(catalog.get_by_id(id).await?);
    }

    let mut found = catalog.get_by_name(key).await?;
    if found.len() > 1 {
        let ids: Vec<String> = found.iter().map(|i| i.id.to_string()).collect();
        bail!("'{key}' matches several items ({}), use an id", ids.join(", "));
    }
    found.pop().ok_or_else(|| anyhow!("item not found: {key}"))
}

fn parse_key<T: FromStr<Err = DomainError>>(s: &str) -> Result<T, String> {
    s.parse().map_err(|e: DomainError| e.to_string())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::{EnvFilter, prelude::*};

    color_eyre::install().map_err(|e| anyhow!("cannot install error hooks: {e}"))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,rpgcog=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_timer(tracing_subscriber::fmt::time::uptime()),
        )
        .with(tracing_error::ErrorLayer::default())
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_subcommands_parse() {
        let cli = Cli::try_parse_from([
            "rpgcog", "--memory", "char", "new", "1001", "--name", "Lydia", "--race", "Nord", "--sex", "female",
        ])
        .unwrap();
        match cli.command {
            Command::Char(CharCommand::New { member, race, desc, .. }) => {
                assert_eq!(member, "1001");
                assert_eq!(race, "Nord");
                assert!(desc.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::try_parse_from(["rpgcog", "char", "avatar", "1001"]).unwrap();
        assert!(matches!(cli.command, Command::Char(CharCommand::Avatar { url: None, .. })));
        assert!(Cli::try_parse_from(["rpgcog", "char", "stats", "1001"]).is_ok());
    }

    #[test]
    fn unequip_needs_slot_or_item() {
        assert!(Cli::try_parse_from(["rpgcog", "inv", "unequip", "1001"]).is_err());
        let cli = Cli::try_parse_from(["rpgcog", "inv", "unequip", "1001", "--slot", "helmet"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Inv(InvCommand::Unequip { slot: Some(EquipSlot::Helmet), .. })
        ));
    }
}
