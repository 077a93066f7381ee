//! CLI commands

use kube::Client;

use tkgs_common::kube_utils::create_client;

use crate::config::{load_config, resolve_context, resolve_kubeconfig, TkgsConfig};
use crate::{GlobalArgs, Result};

pub mod cluster;
pub mod config;
pub mod feature_gates;

/// Load the CLI config and connect to the supervisor it points at
pub async fn connect(global: &GlobalArgs) -> Result<(Client, TkgsConfig)> {
    let cfg = load_config()?;
    let kubeconfig = resolve_kubeconfig(global.kubeconfig.as_deref(), &cfg);
    let context = resolve_context(global.context.as_deref(), &cfg);
    let client = create_client(kubeconfig.as_deref(), context).await?;
    Ok((client, cfg))
}

/// Column-aligned table lines, headers first
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(widths.len()) {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:<width$}", cell, width = w)
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![line(headers.to_vec())];
    for row in rows {
        lines.push(line(row.iter().map(String::as_str).collect()));
    }
    lines
}
