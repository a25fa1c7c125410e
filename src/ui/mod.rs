//! Interactive terminal prompts

pub mod prompts;
