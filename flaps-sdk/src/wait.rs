use std::time::Duration;

use flaps_api::Client;
use flaps_api::types::{Machine, MachineState};
use reqwest::StatusCode;
use tokio::time::{Instant, sleep_until, timeout_at};

use crate::error::{Error, Result};

/// Pause between a 408 and the next wait request.
pub const WAIT_RETRY_PAUSE: Duration = Duration::from_millis(200);

/// Wait for `machine` to reach `state`, for up to `timeout` overall.
///
/// A single wait call is bounded by the server; this re-issues it while the
/// server reports its window elapsed (408) and time remains, pausing
/// [`WAIT_RETRY_PAUSE`] in between. Any other failure is returned immediately.
#[tracing::instrument(skip(client, machine), fields(machine_id = %machine.id))]
pub async fn wait_for_state(
    client: &Client,
    machine: &Machine,
    state: MachineState,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let timed_out = || Error::WaitTimeout {
        machine_id: machine.id.clone(),
        state,
        timeout,
    };

    let mut attempt = 1u32;
    loop {
        match timeout_at(deadline, client.wait(machine, Some(state))).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(err)) if err.status() == Some(StatusCode::REQUEST_TIMEOUT) => {
                if Instant::now() >= deadline {
                    return Err(timed_out());
                }
                tracing::debug!(attempt, "wait window elapsed, waiting again");
                attempt += 1;
                sleep_until((Instant::now() + WAIT_RETRY_PAUSE).min(deadline)).await;
            }
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(timed_out()),
        }
    }
}
