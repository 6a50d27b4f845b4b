use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::debug;

use raid_rs::relay::{Request, RequestHandler, Response};

/// `run` answers one JSON request per input line with one JSON response line.
///
/// Blank lines are skipped; lines that do not decode get an in-band `error` response.
pub fn run<H, R, W>(handler: &H, input: R, mut output: W) -> Result<usize>
where
    H: RequestHandler,
    R: BufRead,
    W: Write,
{
    let mut answered = 0;
    for line in input.lines() {
        let line = line.context("read request line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<Request>(line) {
            Ok(request) => {
                debug!(?request, "relay request");
                handler.handle(request)
            }
            Err(err) => Response::decode_error(err),
        };
        serde_json::to_writer(&mut output, &response).context("encode response")?;
        output.write_all(b"\n").context("write response")?;
        output.flush().context("flush response")?;
        answered += 1;
    }
    Ok(answered)
}
