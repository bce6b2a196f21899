//! Dump artifact naming and placement
//!
//! Artifacts live under a dump directory that exists on both hosts, split by
//! the environment that *produced* them:
//!
//! ```text
//! <root>/<dump_dir>/local/   artifacts dumped on the local machine
//! <root>/<dump_dir>/remote/  artifacts dumped on the remote host
//! ```
//!
//! `<root>` is the local workspace on the local side and the deploy root on
//! the remote side. The producer decides the subdirectory, never the reader,
//! so the same artifact has the same relative path on both hosts.

mod layout;
mod resolver;

pub use layout::ArtifactLayout;
pub use resolver::{artifact_name, find_existing, ArtifactResolver, DumpArtifact};
