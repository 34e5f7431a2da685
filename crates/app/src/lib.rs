//! apiprobe command-line front end.
//!
//! `run` executes one suite file and reports per-case verdicts; `schedule`
//! submits several suites to the task scheduler and waits for them.

pub mod cli;
pub mod commands;
