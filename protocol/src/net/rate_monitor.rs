//! Read rate monitoring.

use super::io::{IoError, PacketIo};
use super::packet::Packet;
use super::payload::PacketPayload;

/// Receives the total size of every successfully read packet.
pub type ReadSizeConsumer = Box<dyn FnMut(u32) + Send>;

/// Packet io decoration that reports the byte size of completed reads
/// to a sink, leaving everything else untouched.
pub struct ReadRateMonitorPacketIo<T: PacketIo> {
    inner: T,
    read_size_consumer: ReadSizeConsumer,
}

impl<T: PacketIo> ReadRateMonitorPacketIo<T> {
    /// Creates a monitor around `inner` reporting to
    /// `read_size_consumer`.
    pub fn new(inner: T, read_size_consumer: ReadSizeConsumer) -> Self {
        Self {
            inner,
            read_size_consumer,
        }
    }
}

impl<T: PacketIo> PacketIo for ReadRateMonitorPacketIo<T> {
    fn write(&mut self, payload: &PacketPayload) -> Result<(), IoError> {
        self.inner.write(payload)
    }

    fn read(&mut self) -> Result<Packet, IoError> {
        let packet = self.inner.read()?;
        (self.read_size_consumer)(packet.header.size);
        Ok(packet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::io::mocks::MockPacketIo;
    use crate::net::packet::PacketType;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn create_monitor(mock: MockPacketIo) -> (ReadRateMonitorPacketIo<MockPacketIo>, Arc<AtomicU64>) {
        let total = Arc::new(AtomicU64::new(0));
        let sink_total = Arc::clone(&total);
        let monitor = ReadRateMonitorPacketIo::new(
            mock,
            Box::new(move |size| {
                sink_total.fetch_add(u64::from(size), Ordering::SeqCst);
            }),
        );
        (monitor, total)
    }

    #[test]
    fn read_reports_packet_size() {
        let mut mock = MockPacketIo::new();
        mock.queue_read(Ok(Packet::new(
            PacketType::PushBlock,
            Bytes::from(vec![0u8; 100]),
        )));
        let (mut monitor, total) = create_monitor(mock);

        let packet = monitor.read().unwrap();

        assert_eq!(108, packet.header.size);
        assert_eq!(108, total.load(Ordering::SeqCst));
    }

    #[test]
    fn multiple_reads_accumulate() {
        let mut mock = MockPacketIo::new();
        for size in [10usize, 30] {
            mock.queue_read(Ok(Packet::new(
                PacketType::PushBlock,
                Bytes::from(vec![0u8; size]),
            )));
        }
        let (mut monitor, total) = create_monitor(mock);

        monitor.read().unwrap();
        monitor.read().unwrap();

        assert_eq!(8 + 10 + 8 + 30, total.load(Ordering::SeqCst));
    }

    #[test]
    fn failed_read_reports_nothing() {
        let mut mock = MockPacketIo::new();
        mock.queue_read(Err(IoError::ReadError));
        let (mut monitor, total) = create_monitor(mock);

        assert_eq!(Err(IoError::ReadError), monitor.read());
        assert_eq!(0, total.load(Ordering::SeqCst));
    }

    #[test]
    fn write_passes_through_unreported() {
        let mut mock = MockPacketIo::new();
        mock.queue_write(Ok(()));
        let (mut monitor, total) = create_monitor(mock);

        monitor
            .write(&PacketPayload::header_only(PacketType::PullBlock))
            .unwrap();

        assert_eq!(0, total.load(Ordering::SeqCst));
    }
}
