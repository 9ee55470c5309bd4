pub mod compression;
pub mod corpus;
pub mod lock;
pub mod mbox;
