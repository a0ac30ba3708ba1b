//! Documentation Q&A front end: search session lifecycle, answer view,
//! health report, smoke harness and the commands behind the `docs-qa` CLI.

pub mod commands;
pub mod session;
pub mod smoke;
pub mod status;
pub mod view;

pub use commands::{resolve_state_path, App, AppError, AskReply, Rating, RemoteHistory};
pub use session::{ElapsedTicker, SearchOutcome, SearchSession, SessionSnapshot};
pub use view::AnswerView;
