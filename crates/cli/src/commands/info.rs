//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{DispatchConfig, GroupConfig};
use dispatcher::Dispatcher;

use super::load_config;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    options: OptionsInfo,
    groups: Vec<GroupInfo>,
}

#[derive(Serialize)]
struct OptionsInfo {
    fail_retries: u32,
    fail_retry_interval_ms: u64,
}

#[derive(Serialize)]
struct GroupInfo {
    name: String,
    /// De-duplicated, comma-joined sources as the dispatcher renders them
    dispatcher: String,
    sources: Vec<String>,
    options: OptionsInfo,
    overrides_options: bool,
    continuous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_passes: Option<u64>,
    /// Longest time one rotation can spend backing off
    worst_case_backoff_ms: u64,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = load_config(&args.config)?;
    let info = build_config_info(&config)?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &DispatchConfig) -> Result<ConfigInfo> {
    let shared = contracts::DispatchOptions::try_from(config.options)?;

    let groups = config
        .groups
        .iter()
        .map(|group| build_group_info(config, group))
        .collect::<Result<Vec<_>>>()?;

    Ok(ConfigInfo {
        options: options_info(shared),
        groups,
    })
}

fn build_group_info(config: &DispatchConfig, group: &GroupConfig) -> Result<GroupInfo> {
    let options = config.options_for(group)?;
    let dispatcher: Dispatcher<String> = Dispatcher::new(group.sources.clone(), options)?;

    Ok(GroupInfo {
        name: group.name.clone(),
        dispatcher: dispatcher.to_string(),
        sources: group.sources.clone(),
        options: options_info(options),
        overrides_options: group.options.is_some(),
        continuous: group.continuous,
        max_passes: group.max_passes,
        worst_case_backoff_ms: u64::try_from(
            options.worst_case_backoff(dispatcher.count()).as_millis(),
        )
        .unwrap_or(u64::MAX),
    })
}

fn options_info(options: contracts::DispatchOptions) -> OptionsInfo {
    OptionsInfo {
        fail_retries: options.fail_retries,
        fail_retry_interval_ms: u64::try_from(options.fail_retry_interval.as_millis())
            .unwrap_or(u64::MAX),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Failover Dispatch Configuration                ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Options");
    println!("   ├─ Fail retries: {}", info.options.fail_retries);
    println!("   └─ Retry interval: {} ms", info.options.fail_retry_interval_ms);

    println!("\n🔀 Groups ({})", info.groups.len());
    for (i, group) in info.groups.iter().enumerate() {
        let is_last = i == info.groups.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!("   {} {} [{}]", prefix, group.name, group.dispatcher);

        let retries = if group.overrides_options {
            format!(
                "{} retries every {} ms (override)",
                group.options.fail_retries, group.options.fail_retry_interval_ms
            )
        } else {
            format!(
                "{} retries every {} ms",
                group.options.fail_retries, group.options.fail_retry_interval_ms
            )
        };
        println!("   {}  ├─ {}", child_prefix, retries);

        let passes = match (group.continuous, group.max_passes) {
            (false, _) => "single pass".to_string(),
            (true, Some(cap)) => format!("continuous, at most {cap} passes"),
            (true, None) => "continuous".to_string(),
        };
        println!("   {}  ├─ {}", child_prefix, passes);
        println!(
            "   {}  └─ worst-case backoff per rotation: {} ms",
            child_prefix, group.worst_case_backoff_ms
        );
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_group_info_dedups_display() {
        let config = ConfigLoader::load_from_str(
            r#"
[options]
fail_retries = 2
fail_retry_interval_ms = 100

[[groups]]
name = "hosts"
sources = ["h1", "h2", "h1"]
max_passes = 4
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let info = build_config_info(&config).unwrap();
        let group = &info.groups[0];
        assert_eq!(group.dispatcher, "h1,h2");
        assert_eq!(group.sources.len(), 3);
        assert!(!group.overrides_options);
        // 3 sources x 2 retries x 100 ms
        assert_eq!(group.worst_case_backoff_ms, 600);
    }
}
