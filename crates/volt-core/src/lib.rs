#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

mod acquire;
mod build;
mod commands;
mod config;
mod context;
mod fsutil;
mod gitutil;
mod plugconf;
mod report;
mod transaction;

pub use acquire::{AcquireOutcome, AcquireRequest};
pub use commands::build::{build, BuildRequest};
pub use commands::get::{get, GetRequest};
pub use commands::list::list;
pub use commands::migrate::migrate;
pub use commands::profile::{profile, ProfileRequest, RcFile};
pub use commands::rm::{rm, RmRequest};
pub use commands::self_upgrade::{self_upgrade, SelfUpgradeRequest};
pub use config::{Config, Strategy};
pub use context::{CommandContext, GlobalOptions};
pub use report::{CommandError, CommandReport};
pub use transaction::Transaction;

pub const VOLT_VERSION: &str = env!("CARGO_PKG_VERSION");
