// Library surface of the outreach CLI, shared by the binary and its tests

pub mod exit_codes;
pub mod generator;
pub mod processor;
