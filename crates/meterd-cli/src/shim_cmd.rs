//! `meterd shim`, `meterd input`, `meterd processors` and `meterd inputs`.

use anyhow::{Context, Result, bail};

use meterd_core::plugin::{PluginKind, Registry};
use meterd_core::{InputRegistry, ProcessorRegistry, Shim};

/// Run the named processor as an external plugin on stdin/stdout.
pub async fn run_shim(registry: &ProcessorRegistry, name: &str, options: &[String]) -> Result<()> {
    let options = parse_options(options)?;
    let processor = registry
        .create(name, &options)
        .with_context(|| format!("failed to create processor {name:?}"))?;

    let mut shim = Shim::new();
    shim.add_processor(processor)?;
    tracing::debug!(processor = name, "shim started");
    shim.run_processor().await?;
    Ok(())
}

/// Run the named input as an external plugin, gathering whenever the host
/// writes a line to stdin or sends SIGUSR1.
pub async fn run_input(registry: &InputRegistry, name: &str, options: &[String]) -> Result<()> {
    let options = parse_options(options)?;
    let input = registry
        .create(name, &options)
        .with_context(|| format!("failed to create input {name:?}"))?;

    let mut shim = Shim::new();
    shim.add_input(input)?;
    tracing::debug!(input = name, "shim started");
    shim.run_input().await?;
    Ok(())
}

/// Print every registered plugin with its description.
pub fn list_plugins<T: ?Sized + PluginKind>(registry: &Registry<T>) {
    let entries = registry.list();
    let width = entries.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in entries {
        println!("{name:<width$}  {description}");
    }
}

/// Turn `key=value` arguments into a TOML options table. Values stay strings.
fn parse_options(raw: &[String]) -> Result<toml::Table> {
    let mut table = toml::Table::new();
    for option in raw {
        let Some((key, value)) = option.split_once('=') else {
            bail!("invalid option {option:?}, expected KEY=VALUE");
        };
        if key.is_empty() {
            bail!("invalid option {option:?}, key is empty");
        }
        table.insert(key.to_string(), toml::Value::String(value.to_string()));
    }
    Ok(table)
}
