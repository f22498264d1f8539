//! Communication port - abstraction for the serial link to the host
//!
//! This trait lets the command server talk to the host without knowing the
//! specific transport (USB CDC, UART, an in-memory buffer in tests, etc.)

use core::future::Future;

/// Error type for communication operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommunicationError {
    /// Connection lost
    Disconnected,
    /// Failed to send response
    SendFailed,
    /// Failed to receive bytes
    ReceiveFailed,
}

/// Port for byte-stream communication with the host
///
/// # Example Implementation
///
/// ```ignore
/// struct UsbCdcAdapter<D: Driver> {
///     class: CdcAcmClass<'static, D>,
/// }
///
/// impl<D: Driver> CommunicationPort for UsbCdcAdapter<D> {
///     async fn wait_connection(&mut self) {
///         self.class.wait_connection().await;
///     }
///
///     fn is_connected(&self) -> bool {
///         self.class.dtr()
///     }
///
///     async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CommunicationError> {
///         self.class.read_packet(buf).await.map_err(|_| CommunicationError::ReceiveFailed)
///     }
///
///     async fn send(&mut self, bytes: &[u8]) -> Result<(), CommunicationError> {
///         // ... chunk into packets ...
///     }
/// }
/// ```
pub trait CommunicationPort {
    /// Wait for the host to connect
    fn wait_connection(&mut self) -> impl Future<Output = ()>;

    /// Check if connected
    fn is_connected(&self) -> bool;

    /// Receive whatever bytes are available
    ///
    /// Returns `Ok(0)` when nothing arrived within the transport's poll
    /// window. Implementations must not block indefinitely, so the caller's
    /// scheduler keeps ticking.
    fn receive(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<usize, CommunicationError>>;

    /// Write all of `bytes` to the host
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = Result<(), CommunicationError>>;
}
