use crate::app::command_support::AppContext;
use crate::chat::{run_chat_session_lines, run_chat_session_tui};
use std::io::{self, IsTerminal};
use std::time::Duration;

pub fn cmd_chat(args: &[String], context: &AppContext) -> Result<String, String> {
    if !args.is_empty() {
        return Err("usage: chat".to_string());
    }

    let mut session = context.open_session()?;
    let session_id = session.session_id().to_string();
    if io::stdin().is_terminal() && io::stdout().is_terminal() {
        let debounce = Duration::from_millis(context.settings.intent.debounce_ms);
        run_chat_session_tui(session, debounce)?;
    } else {
        run_chat_session_lines(&mut session, io::stdin().lock(), io::stdout().lock())?;
    }
    Ok(format!("chat ended\nsession_id={session_id}"))
}
