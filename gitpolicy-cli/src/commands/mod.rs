pub mod daemon;
pub mod ignore;
pub mod init;
pub mod sync;
