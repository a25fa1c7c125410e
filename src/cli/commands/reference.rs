use anyhow::Result;
use colored::*;
use serde_json::json;

use super::{active_tenant, build_client};
use crate::config::Config;
use crate::reference::{EntityKind, KindDiagnostics, ReferenceIndex};

const SAMPLE_SIZE: usize = 5;

pub async fn reference_command(config: &Config, tenant: Option<&str>, as_json: bool) -> Result<()> {
    let (_, tenant) = active_tenant(config, tenant)?;
    let client = build_client(config, tenant)?;
    let data = client.fetch_reference_data().await?;

    if as_json {
        let dump = json!({
            "sites": data.sites,
            "floors": data.floors,
            "spaces": data.spaces,
            "users": data.users,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    let index = ReferenceIndex::build(&data);
    let diagnostics = index.diagnostics();

    println!();
    println!("  {} {}", "Reference data for".bright_white().bold(), client.domain().cyan());
    for (kind, counts) in [
        (EntityKind::Site, &diagnostics.sites),
        (EntityKind::Floor, &diagnostics.floors),
        (EntityKind::Space, &diagnostics.spaces),
        (EntityKind::User, &diagnostics.users),
    ] {
        print_kind(&index, kind, counts);
    }
    println!();
    Ok(())
}

fn print_kind(index: &ReferenceIndex, kind: EntityKind, counts: &KindDiagnostics) {
    let mut line = format!(
        "  {:<7} {:>5} loaded",
        kind.label(),
        counts.loaded.to_string().bright_green()
    );
    if counts.dropped > 0 {
        line.push_str(&format!(", {} dropped", counts.dropped.to_string().bright_yellow()));
    }
    println!("{}", line);

    let samples = index.sample_names(kind, SAMPLE_SIZE);
    if !samples.is_empty() {
        println!("          {}", samples.join(", ").dimmed());
    }
}
