use std::time::Duration;

use flaps_api::transport::ReqwestTransport;

use crate::error::Result;

/// Builds the default HTTP transport.
///
/// No overall request timeout is set: wait calls are held open by the server.
pub fn connect(connect_timeout: Option<Duration>) -> Result<ReqwestTransport> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = connect_timeout {
        builder = builder.connect_timeout(timeout);
    }
    Ok(ReqwestTransport::new(builder.build()?))
}
