//! sp-oncall CLI library: logging setup, the log line format and the commands
//! behind the `sp-oncall` binary (one-shot query, REPL, tool and logger listings).

pub mod log_format;
pub mod logging;
pub mod run;

pub use run::{
    format_loggers, format_tools, list_tools, query_from_args, run_query, run_repl, CliOverrides,
    QueryOutput, RunError,
};
