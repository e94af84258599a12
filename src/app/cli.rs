#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Chat,
    Status,
    Export,
    Import,
    Reset,
    Catalog,
    Suggest,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "chat" => CliVerb::Chat,
        "status" => CliVerb::Status,
        "export" => CliVerb::Export,
        "import" => CliVerb::Import,
        "reset" => CliVerb::Reset,
        "catalog" => CliVerb::Catalog,
        "suggest" => CliVerb::Suggest,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  chat                                 Build a pipeline conversationally".to_string(),
        "  status                               Show the saved canvas and the next question"
            .to_string(),
        "  export [path]                        Print or write the canvas configuration JSON"
            .to_string(),
        "  import <path>                        Replace the saved canvas with a configuration file"
            .to_string(),
        "  reset                                Forget the saved canvas".to_string(),
        "  catalog [source|transform|destination]  List known connectors and their fields"
            .to_string(),
        "  suggest <text>                       Show intent guesses and name suggestions"
            .to_string(),
        "  help                                 Show this help".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
