pub use mdtest::{Invocation, Mdtest, Phase, RunOutput};
pub use report::Report;
pub mod config;
pub mod hostfile;
pub mod mdtest;
pub mod options;
pub mod report;

mod error;
pub use error::{MDError, MDResult};
