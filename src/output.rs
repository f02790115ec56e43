use console::style;

/// Styling helpers for terminal output
fn bright_green(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).bright().green()
}

fn cyan(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).cyan()
}

fn dim(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).dim()
}

fn magenta_bold(text: impl std::fmt::Display) -> console::StyledObject<String> {
    style(text.to_string()).magenta().bold()
}

/// Prints the banner to stderr so stdout stays free for the job URL.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("☂ coveralls-action"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Coveralls for GitHub Actions")
    );
}

/// Prints the Coveralls job URL: plain on stdout for scripts, styled on stderr.
pub fn print_coverage_url(url: &str) {
    eprintln!("{} {}", bright_green("✓ Coverage submitted:"), cyan(url));
    println!("{url}");
}

pub fn print_build_finished() {
    eprintln!("{}", bright_green("✓ Parallel build marked as done"));
}
