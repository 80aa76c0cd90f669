pub mod add;
pub mod bundle;
pub mod code;
pub mod generate;
pub mod init;
pub mod list;
pub mod preview;
pub mod serve;
pub mod tree;
