//! `pgp-pipeline unpack` — the read side of the block filter: decode
//! OpenPGP partial-body framing back into plain bytes.

use pgp_pipeline_core::block::BlockFilter;
use pgp_pipeline_core::Direction;

use super::{open_input, open_output};

pub fn run(input: &str, output: &str) {
    let mut src = open_input(input);

    let first_c = match src.read_byte() {
        Ok(Some(b)) => b,
        Ok(None) => {
            eprintln!("pgp-pipeline: empty input, nothing to unpack");
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("pgp-pipeline: read failed: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = src.push(Direction::InputStream, Box::new(BlockFilter::for_read(first_c))) {
        eprintln!("pgp-pipeline: failed to install framing filter: {e}");
        std::process::exit(1);
    }

    let mut dst = open_output(output, false, false);
    match pgp_pipeline_core::Pipeline::copy(&mut src, &mut dst) {
        Ok(n) => {
            if let Err(e) = dst.close() {
                eprintln!("pgp-pipeline: flush failed: {e}");
                std::process::exit(1);
            }
            let _ = src.close();
            log::info!("unpacked {n} bytes");
        }
        Err(e) => {
            eprintln!("pgp-pipeline: unpack failed: {e}");
            let _ = dst.cancel();
            std::process::exit(1);
        }
    }
}
