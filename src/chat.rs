pub mod session;
pub mod tui;

pub use session::{
    is_chat_exit_command, CanvasView, ChatMessage, ChatSession, NodeView, Speaker,
    CHAT_EXIT_COMMANDS,
};
pub use tui::{run_chat_session_lines, run_chat_session_tui};
