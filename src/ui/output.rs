use crate::diagnostics::Diagnostic;
use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;

pub fn header(text: &str) {
    println!("{} {}", Icons::MAP, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

/// Like [`status`], with the value styled as a file path
pub fn path_status(icon: &str, label: &str, path: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), path.style(theme().path.clone()));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

/// One diagnostic per line, styled by kind
pub fn diagnostic(diagnostic: &Diagnostic) {
    let style = theme().diagnostic(&diagnostic.kind);
    println!(
        "  {} {}",
        Icons::for_diagnostic(&diagnostic.kind),
        diagnostic.to_string().style(style)
    );
}
