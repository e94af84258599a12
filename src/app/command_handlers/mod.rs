use crate::app::cli::{help_text, parse_cli_verb, CliVerb};
use crate::app::command_support::{load_context, AppContext};

pub mod catalog;
pub mod chat;
pub mod session;

pub fn run_cli(args: Vec<String>) -> Result<String, String> {
    if args.is_empty() {
        return Ok(help_text());
    }
    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0])),
        _ => {
            let context = load_context()?;
            run_cli_with_context(&args, &context)
        }
    }
}

/// Dispatches against an already resolved context; tests use this directly.
pub fn run_cli_with_context(args: &[String], context: &AppContext) -> Result<String, String> {
    let Some(verb) = args.first() else {
        return Ok(help_text());
    };
    let rest = &args[1..];
    match parse_cli_verb(verb) {
        CliVerb::Chat => chat::cmd_chat(rest, context),
        CliVerb::Status => session::cmd_status(rest, context),
        CliVerb::Export => session::cmd_export(rest, context),
        CliVerb::Import => session::cmd_import(rest, context),
        CliVerb::Reset => session::cmd_reset(rest, context),
        CliVerb::Catalog => catalog::cmd_catalog(rest, context),
        CliVerb::Suggest => catalog::cmd_suggest(rest, context),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{verb}`")),
    }
}
