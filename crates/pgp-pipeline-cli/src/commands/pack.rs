//! `pgp-pipeline pack` — wrap a plain byte stream in OpenPGP partial-body
//! framing (spec.md §4.C), the write side of the block filter.

use pgp_pipeline_core::block::BlockFilter;
use pgp_pipeline_core::Direction;

use super::{open_input, open_output};

pub fn run(input: &str, output: &str) {
    let mut src = open_input(input);
    let mut dst = open_output(output, false, false);

    if let Err(e) = dst.push(Direction::OutputStream, Box::new(BlockFilter::for_write())) {
        eprintln!("pgp-pipeline: failed to install framing filter: {e}");
        std::process::exit(1);
    }

    match pgp_pipeline_core::Pipeline::copy(&mut src, &mut dst) {
        Ok(n) => {
            if let Err(e) = dst.close() {
                eprintln!("pgp-pipeline: flush failed: {e}");
                std::process::exit(1);
            }
            let _ = src.close();
            log::info!("packed {n} bytes");
        }
        Err(e) => {
            eprintln!("pgp-pipeline: pack failed: {e}");
            let _ = dst.cancel();
            std::process::exit(1);
        }
    }
}
