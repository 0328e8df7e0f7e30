use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

use empresas_core::commands::{default_root, ensure_initialized};
use empresas_core::{Commands, FormFields, StatementType};

#[derive(Parser)]
#[command(
    name = "empresas-admin",
    about = "Admin helpers for the Juego de Empresas data store"
)]
struct Cli {
    /// Data root holding config.toml, the store and the logbook
    #[arg(long, env = "EMPRESAS_ROOT", global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Create the data root, config file and schema (idempotent)
    Init,
    #[command(flatten)]
    Store(StoreCmd),
}

/// Commands that run against an opened data root.
#[derive(Subcommand)]
enum StoreCmd {
    /// Register a new company
    CreateCompany { name: String },
    /// List companies ordered by name
    Companies,
    /// Show one company
    Company {
        #[arg(long)]
        id: i64,
    },
    /// Advance a company to its next period
    Advance {
        #[arg(long)]
        id: i64,
    },
    /// Print one section of a decision document
    GetSection {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
        #[arg(long)]
        section: String,
    },
    /// Write one section from Label=value pairs; labels are normalized to field keys
    SetSection {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
        #[arg(long)]
        section: String,
        /// Prefix prepended to every label (e.g. "home", "ingresos")
        #[arg(long)]
        prefix: Option<String>,
        /// Also advance the company's period in the same transaction
        #[arg(long)]
        commit: bool,
        fields: Vec<String>,
    },
    /// Print one financial statement
    GetStatement {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
        #[arg(long = "type")]
        kind: String,
    },
    /// Replace one financial statement from key=value pairs (keys kept verbatim)
    SetStatement {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
        #[arg(long = "type")]
        kind: String,
        fields: Vec<String>,
    },
    /// Opening cash for a period, from that period's balance sheet
    OpeningBalance {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
    },
    /// Prior-period stock grid for a period
    Stock {
        #[arg(long)]
        company: i64,
        #[arg(long)]
        period: u32,
        /// Read finished goods reported in the previous period instead
        #[arg(long)]
        previous: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("empresas_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let root = cli.root.unwrap_or_else(default_root);

    match cli.cmd {
        Cmd::Init => {
            let report = ensure_initialized(&root)?;
            print(&json!({
                "root": report.root.display().to_string(),
                "created": report.created,
                "existed": report.existed,
                "schema": report.schema,
            }))
        }
        Cmd::Store(cmd) => {
            let cmds = Commands::open(&root)
                .with_context(|| format!("opening data root {}", root.display()))?;
            run(&cmds, cmd)
        }
    }
}

fn run(cmds: &Commands, cmd: StoreCmd) -> Result<()> {
    match cmd {
        StoreCmd::CreateCompany { name } => {
            let id = cmds.create_company(&name)?;
            print(&json!({ "id": id, "name": name.trim() }))
        }
        StoreCmd::Companies => {
            let list: Vec<Value> = cmds
                .get_companies()?
                .into_iter()
                .map(|(id, name)| json!({ "id": id, "name": name }))
                .collect();
            print(&Value::Array(list))
        }
        StoreCmd::Company { id } => match cmds.get_company_info(id)? {
            Some(company) => print(&serde_json::to_value(company)?),
            None => bail!("company {id} not found"),
        },
        StoreCmd::Advance { id } => {
            cmds.increment_period(id)?;
            let company = cmds
                .get_company_info(id)?
                .ok_or_else(|| anyhow!("company {id} not found"))?;
            print(&json!({ "id": id, "current_period": company.current_period }))
        }
        StoreCmd::GetSection {
            company,
            period,
            section,
        } => match cmds.load_section(company, period, &section)? {
            Some(data) => print(&Value::Object(data)),
            None => print(&Value::Null),
        },
        StoreCmd::SetSection {
            company,
            period,
            section,
            prefix,
            commit,
            fields,
        } => {
            let mut form = match prefix.as_deref() {
                Some(p) => FormFields::with_prefix(p),
                None => FormFields::new(),
            };
            for (label, raw) in parse_pairs(&fields)? {
                form.push(label, raw);
            }
            let data = form.into_section();
            if commit {
                cmds.commit_section(company, period, &section, data)?;
            } else {
                cmds.save_section(company, period, &section, data)?;
            }
            match cmds.load_section(company, period, &section)? {
                Some(saved) => print(&Value::Object(saved)),
                None => print(&Value::Null),
            }
        }
        StoreCmd::GetStatement {
            company,
            period,
            kind,
        } => {
            let kind: StatementType = kind.parse()?;
            match cmds.load_statement(company, period, &kind)? {
                Some(data) => print(&Value::Object(data)),
                None => print(&Value::Null),
            }
        }
        StoreCmd::SetStatement {
            company,
            period,
            kind,
            fields,
        } => {
            let kind: StatementType = kind.parse()?;
            let mut data = Map::new();
            for (key, raw) in parse_pairs(&fields)? {
                data.insert(key.to_string(), Value::String(raw.to_string()));
            }
            cmds.save_statement(company, period, &kind, data)?;
            print(&json!({ "type": kind, "saved": true }))
        }
        StoreCmd::OpeningBalance { company, period } => {
            let value = cmds.opening_balance(company, period)?;
            print(&json!({ "company": company, "period": period, "opening_balance": value }))
        }
        StoreCmd::Stock {
            company,
            period,
            previous,
        } => {
            let grid = if previous {
                cmds.previous_period_finished_goods(company, period)?
            } else {
                cmds.prior_period_stock(company, period)?
            };
            print(&serde_json::to_value(grid)?)
        }
    }
}

fn parse_pairs(fields: &[String]) -> Result<Vec<(&str, &str)>> {
    fields
        .iter()
        .map(|f| {
            f.split_once('=')
                .ok_or_else(|| anyhow!("expected Label=value, got {f:?}"))
        })
        .collect()
}

fn print(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
