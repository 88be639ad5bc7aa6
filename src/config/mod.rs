pub mod gnss;

pub use gnss::{Commit, GNSSConfig, GNSSProtocol};
