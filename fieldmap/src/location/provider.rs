//! Host location provider interface.
//!
//! The sensor itself is a singleton host resource; implementations wrap
//! whatever the platform offers (a browser geolocation bridge, gpsd, a
//! mobile SDK, a replay file).
//!
//! - [`LocationProvider`] - single-shot requests and continuous watches
//! - [`WatchSubscription`] - readings from one watch plus its cancel handle
//! - [`WatchHandle`] - cancels the watch explicitly or on drop

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::AcquisitionOptions;
use super::error::LocationError;
use super::state::Fix;

/// One reading (or error) delivered by a watch.
pub type WatchReading = Result<Fix, LocationError>;

/// Trait for acquiring the device position.
pub trait LocationProvider: Send + Sync + 'static {
    /// Request one position reading.
    fn request_once(
        &self,
        options: AcquisitionOptions,
    ) -> impl Future<Output = Result<Fix, LocationError>> + Send;

    /// Start a continuous watch.
    ///
    /// Readings arrive on the returned subscription until it is cancelled or
    /// dropped.
    fn watch(&self, options: AcquisitionOptions) -> Result<WatchSubscription, LocationError>;
}

/// Cancels a running watch.
///
/// Dropping the handle cancels the watch too, so a subscription can never
/// outlive the component that started it.
#[derive(Debug)]
pub struct WatchHandle {
    token: CancellationToken,
}

impl WatchHandle {
    /// Wrap the token the provider's producer listens on.
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stop the watch.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the watch has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A running watch: the cancel handle plus the reading stream.
#[derive(Debug)]
pub struct WatchSubscription {
    handle: WatchHandle,
    readings: mpsc::Receiver<WatchReading>,
}

impl WatchSubscription {
    /// Create a subscription from a handle and the receiving end of the
    /// provider's reading channel.
    pub fn new(handle: WatchHandle, readings: mpsc::Receiver<WatchReading>) -> Self {
        Self { handle, readings }
    }

    /// Wait for the next reading. `None` means the provider ended the watch.
    pub async fn next(&mut self) -> Option<WatchReading> {
        self.readings.recv().await
    }

    /// Stop the watch and release the subscription.
    pub fn cancel(self) {
        self.handle.cancel();
    }

    /// Returns true once the watch has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.handle.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_cancels_token() {
        let token = CancellationToken::new();
        let handle = WatchHandle::new(token.clone());

        assert!(!handle.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_drop_cancels_token() {
        let token = CancellationToken::new();
        let (_tx, rx) = mpsc::channel(1);
        let subscription = WatchSubscription::new(WatchHandle::new(token.clone()), rx);

        drop(subscription);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscription_yields_readings() {
        let token = CancellationToken::new();
        let (tx, rx) = mpsc::channel(4);
        let mut subscription = WatchSubscription::new(WatchHandle::new(token), rx);

        tx.send(Err(LocationError::Timeout)).await.unwrap();
        drop(tx);

        assert_eq!(subscription.next().await, Some(Err(LocationError::Timeout)));
        assert_eq!(subscription.next().await, None);
    }
}
