//! `pgp-pipeline cat` — copy one stream to another through the plain
//! filter chain, no framing. Mostly a smoke test for the adapters layer.

use super::{open_input, open_output};

pub fn run(input: &str, output: &str, append: bool, mode700: bool) {
    let mut src = open_input(input);
    let mut dst = open_output(output, append, mode700);

    match pgp_pipeline_core::Pipeline::copy(&mut src, &mut dst) {
        Ok(n) => {
            if let Err(e) = dst.close() {
                eprintln!("pgp-pipeline: flush failed: {e}");
                std::process::exit(1);
            }
            let _ = src.close();
            log::info!("copied {n} bytes");
        }
        Err(e) => {
            eprintln!("pgp-pipeline: copy failed: {e}");
            let _ = dst.cancel();
            std::process::exit(1);
        }
    }
}
