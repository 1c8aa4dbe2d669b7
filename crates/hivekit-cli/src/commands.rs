use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use hivekit_core::{path, Hive, Node, Value};
use hivekit_engine::{FileHive, OpenOptions};
use serde::Serialize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match &cli.command {
        Command::Init => cmd_init(&cli.hive),
        Command::Ls(args) => cmd_ls(&open_hive(&cli)?, args, &cli.format),
        Command::Get(args) => cmd_get(&open_hive(&cli)?, args, &cli.format),
        Command::Set(args) => cmd_set(&open_hive(&cli)?, args),
        Command::RmValue(args) => cmd_rm_value(&open_hive(&cli)?, args),
        Command::RmKey(args) => cmd_rm_key(&open_hive(&cli)?, args),
        Command::Dump(args) => cmd_dump(&open_hive(&cli)?, args, &cli.format),
    }
}

fn open_hive(cli: &Cli) -> anyhow::Result<Hive> {
    let options = open_options(cli)?;
    tracing::debug!(hive = %cli.hive.display(), ?options, "opening hive");
    Hive::open_with(&cli.hive, options)
        .with_context(|| format!("cannot open hive {}", cli.hive.display()))
}

/// Options from `--config`, then overridden by command-line flags.
pub fn open_options(cli: &Cli) -> anyhow::Result<OpenOptions> {
    let mut options = match &cli.config {
        Some(path) => load_options(path)?,
        None => OpenOptions::default(),
    };
    if cli.read_only {
        options.write = false;
    }
    if cli.verbose {
        options.verbose = true;
    }
    Ok(options)
}

fn load_options(path: &Path) -> anyhow::Result<OpenOptions> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
}

fn existing_node<'h>(hive: &'h Hive, key_path: &str) -> anyhow::Result<Node<'h, FileHive>> {
    let node = hive.node(key_path)?;
    if !node.exists() {
        bail!("key not found: {}", node.path());
    }
    Ok(node)
}

fn cmd_init(hive_path: &Path) -> anyhow::Result<()> {
    Hive::create(hive_path)
        .with_context(|| format!("cannot create hive {}", hive_path.display()))?;
    println!(
        "{} Created empty hive {}",
        "✓".green().bold(),
        hive_path.display().to_string().bold()
    );
    Ok(())
}

fn cmd_ls(hive: &Hive, args: &LsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let node = existing_node(hive, &args.path)?;
    let children = node.children()?;
    let values = node.values()?;

    if *format == OutputFormat::Json {
        let listing = Listing {
            path: node.path().to_string(),
            subkeys: children.iter().map(|c| c.name().to_string()).collect(),
            values: values
                .iter()
                .map(|v| NamedValue {
                    name: v.name.clone(),
                    value: Value::from_raw(v.kind, &v.data),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    println!("{}", node.path().bold());
    for child in &children {
        println!("  {}\\", child.name().blue().bold());
    }
    for value in &values {
        println!(
            "  {}  {}  {}",
            display_name(&value.name).yellow(),
            value.kind.to_string().dimmed(),
            Value::from_raw(value.kind, &value.data)
        );
    }
    if children.is_empty() && values.is_empty() {
        println!("  {}", "(empty)".dimmed());
    }
    Ok(())
}

fn cmd_get(hive: &Hive, args: &GetArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let node = existing_node(hive, &args.path)?;
    let value = node.get_value(&args.name)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
        OutputFormat::Text => println!("{value}"),
    }
    Ok(())
}

fn cmd_set(hive: &Hive, args: &SetArgs) -> anyhow::Result<()> {
    let node = hive.root().get_or_create_subnode(&args.path)?;
    let changed = match (&args.dword, &args.string, &args.multi) {
        (Some(v), _, _) => write_value(&node, &args.name, v, args.if_changed)?,
        (_, Some(s), _) => write_value(&node, &args.name, s, args.if_changed)?,
        (_, _, Some(items)) => write_value(&node, &args.name, items, args.if_changed)?,
        (None, None, None) => bail!("no value given"),
    };

    if changed {
        hive.commit()?;
        println!("{} Set {}\\{}", "✓".green().bold(), node.path(), args.name.yellow());
    } else {
        println!("{}\\{} unchanged", node.path(), args.name.yellow());
    }
    Ok(())
}

fn write_value<T>(
    node: &Node<'_, FileHive>,
    name: &str,
    value: &T,
    if_changed: bool,
) -> anyhow::Result<bool>
where
    T: hivekit_core::FromHiveValue + hivekit_core::ToHiveValue + PartialEq,
{
    if if_changed {
        Ok(node.change_if_different(name, value, true)?)
    } else {
        node.set(name, value)?;
        Ok(true)
    }
}

fn cmd_rm_value(hive: &Hive, args: &RmValueArgs) -> anyhow::Result<()> {
    let node = hive.node(&args.path)?;
    if node.delete_value(&args.name)? {
        hive.commit()?;
        println!("{} Deleted {}\\{}", "✓".green().bold(), node.path(), args.name.yellow());
    } else {
        println!("{}\\{} did not exist", node.path(), args.name.yellow());
    }
    Ok(())
}

fn cmd_rm_key(hive: &Hive, args: &RmKeyArgs) -> anyhow::Result<()> {
    if path::normalize(&args.path).is_empty() {
        bail!("refusing to delete the root key");
    }
    let existed = hive.node(&args.path)?.exists();
    hive.root().delete_subnode(&args.path)?;
    if existed {
        hive.commit()?;
        println!("{} Deleted {}", "✓".green().bold(), args.path.yellow());
    } else {
        println!("{} did not exist", args.path.yellow());
    }
    Ok(())
}

fn cmd_dump(hive: &Hive, args: &DumpArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let node = existing_node(hive, &args.path)?;
    match format {
        OutputFormat::Json => {
            let tree = DumpNode::collect(&node)?;
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        OutputFormat::Text => print_tree(&node, 0)?,
    }
    Ok(())
}

fn print_tree(node: &Node<'_, FileHive>, depth: usize) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    println!("{indent}{}", node.name().blue().bold());
    for value in node.values()? {
        println!(
            "{indent}  {} = {}",
            display_name(&value.name).yellow(),
            Value::from_raw(value.kind, &value.data)
        );
    }
    for child in node.children()? {
        print_tree(&child, depth + 1)?;
    }
    Ok(())
}

/// The unnamed default value is shown as `@`.
fn display_name(name: &str) -> &str {
    if name.is_empty() { "@" } else { name }
}

#[derive(Serialize)]
struct NamedValue {
    name: String,
    #[serde(flatten)]
    value: Value,
}

#[derive(Serialize)]
struct Listing {
    path: String,
    subkeys: Vec<String>,
    values: Vec<NamedValue>,
}

#[derive(Serialize)]
struct DumpNode {
    name: String,
    values: Vec<NamedValue>,
    children: Vec<DumpNode>,
}

impl DumpNode {
    fn collect(node: &Node<'_, FileHive>) -> anyhow::Result<Self> {
        let values = node
            .values()?
            .into_iter()
            .map(|v| NamedValue {
                value: Value::from_raw(v.kind, &v.data),
                name: v.name,
            })
            .collect();
        let children = node
            .children()?
            .iter()
            .map(DumpNode::collect)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self {
            name: node.name().to_string(),
            values,
            children,
        })
    }
}
