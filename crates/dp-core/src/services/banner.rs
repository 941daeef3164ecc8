use std::collections::BTreeMap;

use crate::models::ServiceEndpoint;

const INNER_WIDTH: usize = 49;

/// Boxed port listing printed before the task runner takes over the terminal.
pub fn render_banner(base_port: u16, services: &[ServiceEndpoint], runner_label: &str) -> String {
    let rule = "─".repeat(INNER_WIDTH);
    let name_width = services.iter().map(|s| s.name.len()).max().unwrap_or(0);

    let mut lines = vec![
        String::new(),
        format!("┌{rule}┐"),
        boxed(&format!(" Ports assigned (base: {base_port})")),
        format!("├{rule}┤"),
    ];
    for service in services {
        let label = format!("{}:", service.name);
        lines.push(boxed(&format!(
            "   {label:<width$}  {}",
            service.url,
            width = name_width + 1
        )));
    }
    lines.push(format!("├{rule}┤"));
    lines.push(boxed(&format!(" Starting {runner_label}...")));
    lines.push(format!("└{rule}┘"));
    lines.push(String::new());

    lines.join("\n")
}

fn boxed(content: &str) -> String {
    let padding = INNER_WIDTH.saturating_sub(content.chars().count());
    format!("│{content}{}│", " ".repeat(padding))
}

/// `KEY=VALUE` lines for the injected port and URL variables. Empty when
/// there are none.
pub fn render_env_listing(env: &BTreeMap<String, String>) -> String {
    let vars: Vec<String> = env
        .iter()
        .filter(|(k, _)| k.starts_with("PORT_") || k.ends_with("_URL"))
        .map(|(k, v)| format!("  {k}={v}"))
        .collect();
    if vars.is_empty() {
        return String::new();
    }
    format!("Injected env vars:\n{}\n", vars.join("\n"))
}
