//! Vhostforge Mutation Engine
//!
//! Validated, rollback-capable mutations of the virtual host files. Every
//! write follows the same path: validate, stage to a temporary file, back up
//! the target, commit with a privileged copy, syntax-check, reload, and
//! roll back from the backup if either external check fails.

pub mod exec;
pub mod mutation;
pub mod privops;
pub mod templates;

pub use exec::{CommandOutput, CommandRunner, TokioCommandRunner};
pub use mutation::{AddSpec, CertIssuer, ConfTarget, MutationEngine, MutationReport, UpdateSpec};
pub use privops::{DirectPrivOps, PrivilegedOps, ShellPrivOps};
