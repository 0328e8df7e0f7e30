// empresas-core/src/commands/init.rs

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::CoreConfig;
use crate::services::connection::Database;
use crate::services::schema::{SchemaReport, ensure_schema};

#[derive(Debug, Clone)]
pub struct InitReport {
    pub root: PathBuf,
    pub config: CoreConfig,
    pub created: Vec<String>,
    pub existed: Vec<String>,
    pub schema: SchemaReport,
}

// ---------- single global init gate ----------

static INIT: OnceCell<InitReport> = OnceCell::new();

/// Idempotent global initializer over `default_root()`. Safe to call often.
pub fn ensure_initialized_once() -> Result<&'static InitReport> {
    INIT.get_or_try_init(|| ensure_initialized(&default_root()))
}

/// Data root: `EMPRESAS_ROOT` if set, else the directory the executable is
/// installed in, else the working directory.
pub fn default_root() -> PathBuf {
    if let Some(root) = std::env::var_os("EMPRESAS_ROOT") {
        return PathBuf::from(root);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn open_database(config: &CoreConfig) -> Database {
    Database::new(&config.store.path)
        .with_busy_timeout(Duration::from_millis(config.store.busy_timeout_ms))
}

/// Ensure the data root, its config file, the logbook directory and the
/// store schema all exist. Idempotent.
pub fn ensure_initialized(root: &Path) -> Result<InitReport> {
    let mut created = Vec::new();
    let mut existed = Vec::new();

    ensure_dir(root, "", &mut created, &mut existed)?;
    ensure_file(
        root,
        "config.toml",
        DEFAULT_CONFIG_TOML,
        &mut created,
        &mut existed,
    )?;

    let config = CoreConfig::load(root)?;

    if config.logbook.enabled {
        if let Some(dir) = config.logbook.path.parent() {
            ensure_dir(dir, "", &mut created, &mut existed)?;
        }
    }

    let store_label = config.store.path.display().to_string();
    if config.store.path.exists() {
        existed.push(store_label);
    } else {
        created.push(store_label);
    }
    let db = open_database(&config);
    let schema = ensure_schema(&db)
        .with_context(|| format!("initializing schema in {}", db.path().display()))?;

    tracing::info!(root = %root.display(), created = ?created, "data root ready");
    Ok(InitReport {
        root: root.to_path_buf(),
        config,
        created,
        existed,
        schema,
    })
}

fn ensure_dir(
    base: &Path,
    rel: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = if rel.is_empty() { base.to_path_buf() } else { base.join(rel) };
    let label = p.display().to_string();
    if p.exists() {
        existed.push(label);
        return Ok(());
    }
    fs::create_dir_all(&p).with_context(|| format!("create_dir_all({:?})", p))?;
    created.push(label);
    Ok(())
}

fn ensure_file(
    base: &Path,
    rel_file: &str,
    content_if_absent: &str,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
) -> Result<()> {
    let p = base.join(rel_file);
    if p.exists() {
        existed.push(rel_file.to_string());
        return Ok(());
    }
    write_atomic(&p, content_if_absent.as_bytes())?;
    created.push(rel_file.to_string());
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create_dir_all({:?})", parent))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut f = OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp)
            .with_context(|| format!("open temp file {:?}", tmp))?;
        f.write_all(bytes)?;
        f.flush()?;
    }
    fs::rename(&tmp, path).with_context(|| format!("rename {:?} -> {:?}", tmp, path))?;
    Ok(())
}

// ---------- defaults ----------

const DEFAULT_CONFIG_TOML: &str = r#"[system]
name = "juego-empresas"

[store]
path = "captop.db"
busy_timeout_ms = 5000

[company]
starting_cash_usd = 100000.0
starting_period = 0
exchange_rate = 950.0

[carry_forward]
product_lines = ["home", "pro"]
countries = ["Argentina", "Brasil", "Chile", "Colombia", "Mexico"]

[logbook]
enabled = true
path = "logbook/operations.jsonl"
"#;
