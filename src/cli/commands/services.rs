//! Service listing command handler.

use crate::config::Service;
use crate::ui::Style;

/// Settings `service` needs before a chat can start, in reporting order.
pub fn required_settings(service: Service) -> Vec<&'static str> {
    let mut required = vec!["model"];
    if service.requires_url() {
        required.push("url");
    }
    if service.requires_api_key() {
        required.push("apikey");
    }
    required
}

/// Prints every supported service with its requirements and default URL.
pub fn print_services() {
    println!("{}\n", Style::header("Supported services"));
    for service in Service::ALL {
        println!("  {}", Style::value(service));
        println!(
            "    {} {}",
            Style::label("requires:"),
            required_settings(service).join(", ")
        );
        if let Some(url) = service.default_url() {
            println!("    {} {}", Style::label("default url:"), Style::secondary(url));
        }
    }
    println!();
    println!(
        "{}",
        Style::hint("Select one in chat with /service <name>")
    );
}
