pub mod cell;
pub mod resolve;
pub mod table;
