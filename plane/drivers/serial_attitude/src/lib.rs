pub mod frame;
pub mod port;

pub use frame::*;
pub use plane_traits::{
    AttitudeReader, AxisMapping, Channel, LinkEvent, Orientation, PlaneError, Sample, SharedMapping,
};
pub use port::{SerialSettings, SerialSource, DEFAULT_BAUD_RATE};

use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, info, warn};

/// Asks the sensor to start calibrating.
pub const CALIBRATE_COMMAND: &[u8] = b"c";

#[derive(Debug, Clone)]
pub struct LinkOptions {
    /// Sleep between polls that returned no data.
    pub poll_interval: Duration,
    pub max_line_len: usize,
    pub read_chunk: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            poll_interval: Duration::from_millis(10),
            max_line_len: DEFAULT_MAX_LINE_LEN,
            read_chunk: 1024,
        }
    }
}

type SharedWriter = Arc<Mutex<Option<Box<dyn Write + Send>>>>;

/// A live connection to the sensor.
///
/// A background thread reads and parses the stream, maps each frame with the
/// shared mapping and queues a `LinkEvent` for the foreground, which collects
/// them with `drain`. Writes (calibration) happen on the caller's thread.
pub struct Link {
    name: String,
    events: mpsc::Receiver<LinkEvent>,
    writer: SharedWriter,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Link {
    /// Opens the serial port described by `settings` and starts reading it.
    pub fn open(
        settings: &SerialSettings,
        mapping: SharedMapping,
        options: LinkOptions,
    ) -> Result<Self, PlaneError> {
        let port = port::open(settings)?;
        let writer = port.try_clone()?;
        Link::spawn(&settings.port, SerialSource::new(port), writer, mapping, options)
    }

    /// Starts a reader thread over any byte stream.
    pub fn spawn<R, W>(
        name: &str,
        reader: R,
        writer: W,
        mapping: SharedMapping,
        options: LinkOptions,
    ) -> Result<Self, PlaneError>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));
        let writer: Box<dyn Write + Send> = Box::new(writer);
        let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));

        let handle = {
            let name = name.to_string();
            let running = Arc::clone(&running);
            let writer = Arc::clone(&writer);
            thread::Builder::new()
                .name(format!("reader-{}", name))
                .spawn(move || read_loop(&name, reader, mapping, running, writer, tx, options))?
        };

        info!("Connected to {}", name);
        Ok(Link {
            name: name.to_string(),
            events: rx,
            writer,
            running,
            handle: Some(handle),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stops the reader and waits for its thread to exit.
    pub fn disconnect(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Reader thread for {} panicked", self.name);
            }
        }
    }
}

impl AttitudeReader for Link {
    fn drain(&self) -> Vec<LinkEvent> {
        self.events.try_iter().collect()
    }

    fn calibrate(&self) -> Result<(), PlaneError> {
        if !self.is_running() {
            return Err(PlaneError::NotConnected);
        }
        let mut guard = self.writer.lock()?;
        let writer = guard.as_mut().ok_or(PlaneError::NotConnected)?;
        writer.write_all(CALIBRATE_COMMAND)?;
        writer.flush()?;
        info!("Sent calibration command to {}", self.name);
        Ok(())
    }

    fn stop(&self) -> Result<(), PlaneError> {
        self.running.store(false, Ordering::Release);
        self.writer.lock()?.take();
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn read_loop<R: Read>(
    name: &str,
    mut reader: R,
    mapping: SharedMapping,
    running: Arc<AtomicBool>,
    writer: SharedWriter,
    tx: mpsc::Sender<LinkEvent>,
    options: LinkOptions,
) {
    let mut parser = FrameParser::new(Some(options.max_line_len));
    let mut buffer = vec![0u8; options.read_chunk.max(1)];

    let failure = loop {
        if !running.load(Ordering::Acquire) {
            break None;
        }

        match reader.read(&mut buffer) {
            Ok(0) => break Some("Serial stream closed".to_string()),
            Ok(n) => {
                let frames = parser.parse(&buffer[..n]);
                if !frames.is_empty() {
                    // One copy per batch; apply() swaps the whole value under the lock.
                    let current = match mapping.read() {
                        Ok(guard) => *guard,
                        Err(poisoned) => *poisoned.into_inner(),
                    };
                    let mut receiver_gone = false;
                    for raw in frames {
                        let sample = Sample {
                            raw,
                            mapped: current.apply(&raw),
                        };
                        if tx.send(LinkEvent::Sample(sample)).is_err() {
                            receiver_gone = true;
                            break;
                        }
                    }
                    if receiver_gone {
                        break None;
                    }
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => break Some(format!("Serial error: {}", e)),
        }

        thread::sleep(options.poll_interval);
    };

    running.store(false, Ordering::Release);
    match writer.lock() {
        Ok(mut guard) => {
            guard.take();
        }
        Err(e) => warn!("Writer lock poisoned while closing {}: {}", name, e),
    }

    match failure {
        Some(reason) => {
            error!("Reader for {} stopped: {}", name, reason);
            let _ = tx.send(LinkEvent::Disconnected(reason));
        }
        None => info!("Disconnected from {}", name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plane_traits::Inversion;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    /// Bytes pushed through a channel; `WouldBlock` while empty, end of
    /// stream once the sender is dropped.
    struct ChannelReader {
        rx: mpsc::Receiver<Vec<u8>>,
        pending: Vec<u8>,
    }

    impl Read for ChannelReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pending.is_empty() {
                match self.rx.try_recv() {
                    Ok(bytes) => self.pending = bytes,
                    Err(mpsc::TryRecvError::Empty) => {
                        return Err(io::Error::from(io::ErrorKind::WouldBlock))
                    }
                    Err(mpsc::TryRecvError::Disconnected) => return Ok(0),
                }
            }
            let n = self.pending.len().min(buf.len());
            buf[..n].copy_from_slice(&self.pending[..n]);
            self.pending.drain(..n);
            Ok(n)
        }
    }

    /// Always has a line ready and counts how often it was read.
    struct EndlessReader(Arc<AtomicUsize>);

    impl Read for EndlessReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.fetch_add(1, Ordering::Relaxed);
            let line = b"NOISE\n";
            let n = line.len().min(buf.len());
            buf[..n].copy_from_slice(&line[..n]);
            Ok(n)
        }
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "device unplugged"))
        }
    }

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn options() -> LinkOptions {
        LinkOptions {
            poll_interval: Duration::from_millis(1),
            ..LinkOptions::default()
        }
    }

    fn channel_link(mapping: SharedMapping) -> (Link, mpsc::Sender<Vec<u8>>, SharedBuf) {
        let (tx, rx) = mpsc::channel();
        let reader = ChannelReader {
            rx,
            pending: Vec::new(),
        };
        let written = SharedBuf::default();
        let link = Link::spawn("test", reader, written.clone(), mapping, options()).unwrap();
        (link, tx, written)
    }

    fn wait_for(link: &Link, count: usize) -> Vec<LinkEvent> {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut events = Vec::new();
        while events.len() < count && Instant::now() < deadline {
            events.extend(link.drain());
            thread::sleep(Duration::from_millis(1));
        }
        events
    }

    fn samples(events: &[LinkEvent]) -> Vec<Sample> {
        events
            .iter()
            .filter_map(|e| match e {
                LinkEvent::Sample(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn delivers_mapped_samples_in_order() {
        let mapping: AxisMapping = "yaw,roll,-pitch".parse().unwrap();
        let (link, tx, _) = channel_link(mapping.shared());

        tx.send(b"PITCH:1,ROLL:2,YAW:3\nPITCH:4,".to_vec()).unwrap();
        tx.send(b"ROLL:5,YAW:6\nGARBAGE\n".to_vec()).unwrap();
        drop(tx);

        let events = wait_for(&link, 3);
        assert_eq!(
            events,
            vec![
                LinkEvent::Sample(Sample {
                    raw: Orientation::new(1.0, 2.0, 3.0),
                    mapped: Orientation::new(3.0, 2.0, -1.0),
                }),
                LinkEvent::Sample(Sample {
                    raw: Orientation::new(4.0, 5.0, 6.0),
                    mapped: Orientation::new(6.0, 5.0, -4.0),
                }),
                LinkEvent::Disconnected("Serial stream closed".to_string()),
            ]
        );
        assert!(!link.is_running());
    }

    #[test]
    fn applied_mapping_reaches_later_frames() {
        let mapping = AxisMapping::default().shared();
        let (link, tx, _) = channel_link(Arc::clone(&mapping));

        tx.send(b"PITCH:10,ROLL:20,YAW:30\n".to_vec()).unwrap();
        let first = samples(&wait_for(&link, 1));
        assert_eq!(first[0].mapped, Orientation::new(10.0, 20.0, 30.0));

        *mapping.write().unwrap() = AxisMapping {
            invert: Inversion::ROLL,
            ..AxisMapping::default()
        };
        tx.send(b"PITCH:10,ROLL:20,YAW:30\n".to_vec()).unwrap();
        let second = samples(&wait_for(&link, 1));
        assert_eq!(second[0].raw, Orientation::new(10.0, 20.0, 30.0));
        assert_eq!(second[0].mapped, Orientation::new(10.0, -20.0, 30.0));

        link.disconnect();
    }

    #[test]
    fn calibrate_writes_command_byte() {
        let (link, _tx, written) = channel_link(AxisMapping::default().shared());
        link.calibrate().unwrap();
        assert_eq!(written.0.lock().unwrap().as_slice(), b"c");
        link.disconnect();
    }

    #[test]
    fn calibrate_after_stop_is_rejected() {
        let (link, _tx, written) = channel_link(AxisMapping::default().shared());
        link.stop().unwrap();
        assert!(matches!(link.calibrate(), Err(PlaneError::NotConnected)));
        assert!(written.0.lock().unwrap().is_empty());
    }

    #[test]
    fn io_failure_reports_disconnect() {
        let link = Link::spawn(
            "broken",
            FailingReader,
            SharedBuf::default(),
            AxisMapping::default().shared(),
            options(),
        )
        .unwrap();

        let events = wait_for(&link, 1);
        match events.as_slice() {
            [LinkEvent::Disconnected(reason)] => assert!(reason.contains("device unplugged")),
            other => panic!("unexpected events: {:?}", other),
        }
        assert!(matches!(link.calibrate(), Err(PlaneError::NotConnected)));
    }

    #[test]
    fn disconnect_stops_an_idle_reader() {
        let (link, tx, _) = channel_link(AxisMapping::default().shared());
        assert!(link.is_running());
        link.disconnect();
        // Nothing is listening any more, but sending must not panic.
        let _ = tx.send(b"PITCH:1,ROLL:2,YAW:3\n".to_vec());
    }

    #[test]
    fn sleeps_between_reads_that_return_data() {
        let reads = Arc::new(AtomicUsize::new(0));
        let link = Link::spawn(
            "busy",
            EndlessReader(Arc::clone(&reads)),
            SharedBuf::default(),
            AxisMapping::default().shared(),
            LinkOptions {
                poll_interval: Duration::from_millis(20),
                ..LinkOptions::default()
            },
        )
        .unwrap();

        thread::sleep(Duration::from_millis(100));
        link.disconnect();
        let count = reads.load(Ordering::Relaxed);
        assert!(count >= 1 && count <= 10, "read {} times in 100 ms", count);
    }
}
