//! USB CDC communication adapter
//!
//! This adapter implements the CommunicationPort trait for USB CDC ACM
//! (serial over USB). Receives are bounded by a short poll window so one
//! server tick never blocks on a silent host.

use crate::ports::communication::{CommunicationError, CommunicationPort};
use embassy_time::{with_timeout, Duration};
use embassy_usb::class::cdc_acm::CdcAcmClass;
use embassy_usb::driver::EndpointError;

/// USB packet size (CDC ACM max)
const USB_PACKET_SIZE: usize = 64;

/// USB CDC communication adapter
pub struct UsbCdcAdapter<'a, D: embassy_usb::driver::Driver<'a>> {
    /// USB CDC ACM class instance
    class: CdcAcmClass<'a, D>,
    /// Receive poll window
    rx_poll: Duration,
}

impl<'a, D: embassy_usb::driver::Driver<'a>> UsbCdcAdapter<'a, D> {
    /// Create a new USB CDC adapter
    pub fn new(class: CdcAcmClass<'a, D>, rx_poll_ms: u64) -> Self {
        Self {
            class,
            rx_poll: Duration::from_millis(rx_poll_ms),
        }
    }

    /// Get mutable access to the underlying CdcAcmClass
    pub fn class_mut(&mut self) -> &mut CdcAcmClass<'a, D> {
        &mut self.class
    }
}

fn map_endpoint_error(e: EndpointError, fallback: CommunicationError) -> CommunicationError {
    match e {
        EndpointError::Disabled => CommunicationError::Disconnected,
        EndpointError::BufferOverflow => fallback,
    }
}

impl<'a, D: embassy_usb::driver::Driver<'a>> CommunicationPort for UsbCdcAdapter<'a, D> {
    async fn wait_connection(&mut self) {
        self.class.wait_connection().await;
    }

    fn is_connected(&self) -> bool {
        self.class.dtr()
    }

    async fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CommunicationError> {
        match with_timeout(self.rx_poll, self.class.read_packet(buf)).await {
            Ok(Ok(n)) => Ok(n),
            Ok(Err(e)) => Err(map_endpoint_error(e, CommunicationError::ReceiveFailed)),
            // Nothing arrived in this tick
            Err(_) => Ok(0),
        }
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), CommunicationError> {
        for chunk in bytes.chunks(USB_PACKET_SIZE) {
            self.class
                .write_packet(chunk)
                .await
                .map_err(|e| map_endpoint_error(e, CommunicationError::SendFailed))?;
        }
        // A full final packet needs a ZLP to end the transfer
        if bytes.len() % USB_PACKET_SIZE == 0 {
            self.class
                .write_packet(&[])
                .await
                .map_err(|e| map_endpoint_error(e, CommunicationError::SendFailed))?;
        }
        Ok(())
    }
}
