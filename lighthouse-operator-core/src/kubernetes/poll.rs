use std::{fmt::Debug, future::Future, time::Duration};

use log::debug;
use thiserror::Error;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

#[derive(Debug, Error)]
pub enum PollError<E: Debug> {
    #[error("Condition wasn't met within {:?}!", .0)]
    Timeout(Duration),
    #[error("Couldn't check the condition! Reason: {:?}", .0)]
    Check(E),
}

/// Runs `check` immediately and then every `config.interval` until it returns
/// `true`, fails, or `config.timeout` elapses.
pub async fn poll_until<F, Fut, E>(config: &PollConfig, mut check: F) -> Result<(), PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: Debug,
{
    let polling = async {
        loop {
            match check().await {
                Ok(true) => return Ok(()),
                Ok(false) => (),
                Err(error) => return Err(PollError::Check(error)),
            }

            debug!("Condition not met yet, checking again in {:?}", config.interval);
            tokio::time::sleep(config.interval).await;
        }
    };

    match tokio::time::timeout(config.timeout, polling).await {
        Ok(result) => result,
        Err(_) => Err(PollError::Timeout(config.timeout)),
    }
}
