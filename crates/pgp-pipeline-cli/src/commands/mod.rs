pub mod cat;
pub mod pack;
pub mod serve;
pub mod unpack;

use pgp_pipeline_core::adapters::{resolve_special_filename, ResolvedTarget};
use pgp_pipeline_core::Pipeline;

/// Resolve a CLI-supplied filename (`-`, `fd:7`, or a plain path) into an
/// input pipeline, mirroring how the C toolchain treats its filename
/// arguments.
pub fn open_input(name: &str) -> Pipeline {
    match resolve_special_filename(name) {
        ResolvedTarget::Stdio => Pipeline::attach_stdio(true),
        ResolvedTarget::RawFd(fd) => Pipeline::attach_handle(fd, true, true),
        ResolvedTarget::Path(path) => Pipeline::open_read(&path).unwrap_or_else(|e| {
            eprintln!("pgp-pipeline: cannot open {path} for reading: {e}");
            std::process::exit(1);
        }),
    }
}

/// Resolve a CLI-supplied filename into an output pipeline; `append`
/// controls truncate-vs-append and `mode700` restricts permissions for
/// plain paths, as with `create_write`.
pub fn open_output(name: &str, append: bool, mode700: bool) -> Pipeline {
    match resolve_special_filename(name) {
        ResolvedTarget::Stdio => Pipeline::attach_stdio(false),
        ResolvedTarget::RawFd(fd) => Pipeline::attach_handle(fd, false, true),
        ResolvedTarget::Path(path) => Pipeline::create_write(&path, append, mode700).unwrap_or_else(|e| {
            eprintln!("pgp-pipeline: cannot open {path} for writing: {e}");
            std::process::exit(1);
        }),
    }
}
