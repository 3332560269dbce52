//! Help text rendering.
//!
//! The output depends only on declarations, so the same tree always renders
//! the same text.

use crate::command::Command;

const HELP_FLAGS: &str = "-h, --help";
const HELP_DESCRIPTION: &str = "output usage information";

/// Render the help text for `cmd`.
pub fn render<M>(cmd: &Command<M>) -> String {
    let mut parts = vec![
        String::new(),
        format!("  Usage: {} {}", display_name(cmd), cmd.usage_line()),
        String::new(),
    ];

    if let Some(block) = commands_block(cmd) {
        parts.push(block);
    }

    if let Some(description) = cmd.description_text().filter(|d| !d.is_empty()) {
        parts.push(format!("  {description}"));
        parts.push(String::new());
    }

    parts.push("  Options:".to_string());
    parts.push(String::new());
    parts.push(indent(&option_rows(cmd)));
    parts.push(String::new());
    parts.push(String::new());

    parts.join("\n")
}

fn display_name<M>(cmd: &Command<M>) -> String {
    match cmd.alias_name() {
        Some(alias) => format!("{}|{alias}", cmd.name()),
        None => cmd.name().to_string(),
    }
}

fn commands_block<M>(cmd: &Command<M>) -> Option<String> {
    if cmd.commands().is_empty() {
        return None;
    }

    let rows: Vec<(String, &str)> = cmd
        .commands()
        .iter()
        .filter(|c| !c.is_no_help())
        .map(|c| {
            let args: Vec<String> = c.arg_specs().iter().map(|a| a.human_readable()).collect();
            let options = if c.options().is_empty() { "" } else { " [options]" };
            let left = format!("{}{options} {}", display_name(c), args.join(" "));
            (left, c.description_text().unwrap_or_default())
        })
        .collect();

    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
    let lines: Vec<String> = rows
        .iter()
        .map(|(left, description)| {
            if description.is_empty() {
                pad(left, width)
            } else {
                format!("{}  {description}", pad(left, width))
            }
        })
        .collect();

    Some(
        [
            String::new(),
            "  Commands:".to_string(),
            String::new(),
            indent(&lines),
            String::new(),
        ]
        .join("\n"),
    )
}

fn option_rows<M>(cmd: &Command<M>) -> Vec<String> {
    let width = cmd
        .options()
        .iter()
        .map(|o| o.flags().len())
        .max()
        .unwrap_or(0);

    std::iter::once(format!("{}  {HELP_DESCRIPTION}", pad(HELP_FLAGS, width)))
        .chain(
            cmd.options()
                .iter()
                .map(|o| format!("{}  {}", pad(o.flags(), width), o.description())),
        )
        .collect()
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

fn indent(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    type Cmd = Command<()>;

    #[test]
    fn root_help_layout() {
        let mut root = Cmd::new();
        root.command("test <required> [optional]")
            .unwrap()
            .description("Test command")
            .option("-s, --size <size>", "Pizza size");
        root.option("-v, --verbose", "Verbose");

        let help_row = format!("    {:<36}  display help for [cmd]", "help [cmd]");
        let expected = [
            "",
            "  Usage:  [options] [command]",
            "",
            "",
            "  Commands:",
            "",
            help_row.as_str(),
            "    test [options] <required> [optional]  Test command",
            "",
            "  Options:",
            "",
            "    -h, --help     output usage information",
            "    -v, --verbose  Verbose",
            "",
            "",
        ]
        .join("\n");
        assert_eq!(render(&root), expected);
    }

    #[test]
    fn flag_column_is_as_wide_as_the_longest_flags() {
        let mut cmd = Cmd::new();
        cmd.option("-o, --option-with-long-name <value>", "Long");
        let rendered = render(&cmd);
        assert!(rendered.contains(&format!("    {:<35}  output usage information", "-h, --help")));
        assert!(rendered.contains("    -o, --option-with-long-name <value>  Long"));
    }

    #[test]
    fn no_help_commands_are_hidden() {
        let mut root = Cmd::new();
        root.command("visible").unwrap().description("shown");
        root.command_with("secret", true).unwrap();
        let rendered = render(&root);
        assert!(rendered.contains("visible"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn description_and_alias() {
        let mut cmd = Cmd::named("test");
        cmd.alias("t").description("A test command");
        let rendered = render(&cmd);
        assert!(rendered.contains("  Usage: test|t [options]\n"));
        assert!(rendered.contains("\n  A test command\n"));
        assert!(!rendered.contains("Commands:"));
    }

    #[test]
    fn usage_override() {
        let mut cmd = Cmd::named("test");
        cmd.usage("<this> [that]");
        assert!(render(&cmd).contains("  Usage: test <this> [that]\n"));
    }
}
