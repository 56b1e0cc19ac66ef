pub mod analyze;
pub mod census;
mod command_result;
pub mod init;
pub mod lexicon;

pub use command_result::*;
