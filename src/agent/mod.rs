pub mod context;
#[path = "loop/mod.rs"]
pub mod agent_loop;
pub mod tools;

pub use agent_loop::{AgentLoop, AgentLoopConfig, ExchangeReply};
