//! Command channel: message parsing, input sources and the ingestor thread.

use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::animation::{AnimationMode, Command, SharedAnimation};
use crate::config::{BrightnessLevels, CommandConfig, SourceKind};
use crate::device::{AmbientDevice, StateHandle};
use crate::error::{AmbientError, Result};

const READ_BUFFER_SIZE: usize = 4096;
const ERROR_BACKOFF: Duration = Duration::from_millis(500);
const WAKE_BYTES: &[u8] = b"\n";

/// Wire form of one pipe message, e.g. `{"command":"color","value":"red"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "command", content = "value", rename_all = "lowercase")]
pub enum Message {
    #[serde(alias = "mode")]
    Color(String),
    Brightness(BrightnessValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BrightnessValue {
    Level(i64),
    Name(String),
}

impl Message {
    /// `None` when the value can't be understood.
    pub fn into_command(self, levels: &BrightnessLevels) -> Option<Command> {
        match self {
            Message::Color(name) => Some(Command::SetMode(AnimationMode::from_name(&name))),
            Message::Brightness(BrightnessValue::Level(level)) => {
                Some(Command::SetBrightness(level))
            }
            Message::Brightness(BrightnessValue::Name(name)) => {
                parse_brightness(&name, levels).map(Command::SetBrightness)
            }
        }
    }
}

/// Accepts `low`, `mid`, `high` or a decimal integer.
pub fn parse_brightness(text: &str, levels: &BrightnessLevels) -> Option<i64> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.to_ascii_lowercase().as_str() {
        "low" => Some(i64::from(levels.low)),
        "mid" => Some(i64::from(levels.mid)),
        "high" => Some(i64::from(levels.high)),
        other => other.parse().ok(),
    }
}

/// Parse every message in one read. Stops at the first malformed message.
pub fn parse_messages(chunk: &[u8], levels: &BrightnessLevels) -> Vec<Command> {
    let mut commands = Vec::new();
    for message in serde_json::Deserializer::from_slice(chunk).into_iter::<Message>() {
        match message {
            Ok(message) => match message.into_command(levels) {
                Some(command) => commands.push(command),
                None => trace!("dropping command with unusable value"),
            },
            Err(e) => {
                trace!("dropping malformed command: {}", e);
                break;
            }
        }
    }
    commands
}

/// Wakes a source blocked in `poll` from another thread.
#[derive(Debug, Default)]
pub struct Interrupter(Option<File>);

impl Interrupter {
    /// For sources whose `poll` returns on its own within a poll interval.
    pub fn none() -> Self {
        Interrupter(None)
    }

    pub fn interrupt(&mut self) {
        if let Some(pipe) = self.0.as_mut() {
            if let Err(e) = pipe.write_all(WAKE_BYTES) {
                warn!("failed to wake command reader: {}", e);
            }
        }
    }
}

pub trait CommandSource: Send {
    fn describe(&self) -> String;

    /// Wait for input and return the commands it carried, possibly none.
    fn poll(&mut self) -> io::Result<Vec<Command>>;

    fn interrupter(&self) -> io::Result<Interrupter>;
}

/// Named pipe carrying JSON messages.
pub struct FifoSource {
    path: PathBuf,
    pipe: File,
    levels: BrightnessLevels,
    buf: Vec<u8>,
}

impl FifoSource {
    /// Open an existing FIFO. It's held read+write so the open doesn't wait for
    /// a writer and reads never see end-of-file between setter invocations.
    pub fn open(path: &Path, levels: BrightnessLevels) -> Result<Self> {
        let channel_err = |source| AmbientError::CommandChannel {
            path: path.to_path_buf(),
            source,
        };

        let meta = fs::metadata(path).map_err(channel_err)?;
        if !meta.file_type().is_fifo() {
            return Err(channel_err(io::Error::new(
                ErrorKind::InvalidInput,
                "not a named pipe (create it with mkfifo)",
            )));
        }

        let pipe = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(channel_err)?;

        Ok(FifoSource {
            path: path.to_path_buf(),
            pipe,
            levels,
            buf: vec![0u8; READ_BUFFER_SIZE],
        })
    }
}

impl CommandSource for FifoSource {
    fn describe(&self) -> String {
        format!("fifo {}", self.path.display())
    }

    fn poll(&mut self) -> io::Result<Vec<Command>> {
        match self.pipe.read(&mut self.buf) {
            Ok(n) => {
                let chunk = &self.buf[..n];
                debug!("received {:?}", String::from_utf8_lossy(chunk).trim());
                Ok(parse_messages(chunk, &self.levels))
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn interrupter(&self) -> io::Result<Interrupter> {
        Ok(Interrupter(Some(self.pipe.try_clone()?)))
    }
}

/// Polls a get-mode/get-brightness handle and reports what changed.
pub struct PolledSource<H> {
    handle: H,
    interval: Duration,
    levels: BrightnessLevels,
    last_mode: Option<String>,
    last_brightness: Option<String>,
}

impl<H: StateHandle> PolledSource<H> {
    pub fn new(handle: H, interval: Duration, levels: BrightnessLevels) -> Self {
        PolledSource {
            handle,
            interval,
            levels,
            last_mode: None,
            last_brightness: None,
        }
    }
}

impl<H: StateHandle> CommandSource for PolledSource<H> {
    fn describe(&self) -> String {
        self.handle.describe()
    }

    fn poll(&mut self) -> io::Result<Vec<Command>> {
        thread::sleep(self.interval);

        let mode = self.handle.read_mode()?;
        let brightness = self.handle.read_brightness()?;
        let mut commands = Vec::new();

        // A steady value is not re-applied every poll.
        if self.last_mode.as_deref() != Some(mode.as_str()) {
            debug!("mode now {:?}", mode);
            commands.push(Command::SetMode(AnimationMode::from_name(&mode)));
            self.last_mode = Some(mode);
        }
        if self.last_brightness.as_deref() != Some(brightness.as_str()) {
            debug!("brightness now {:?}", brightness);
            if let Some(level) = parse_brightness(&brightness, &self.levels) {
                commands.push(Command::SetBrightness(level));
            }
            self.last_brightness = Some(brightness);
        }
        Ok(commands)
    }

    fn interrupter(&self) -> io::Result<Interrupter> {
        Ok(Interrupter::none())
    }
}

/// Open the source named by the config.
pub fn open_source(
    config: &CommandConfig,
    levels: BrightnessLevels,
) -> Result<Box<dyn CommandSource>> {
    let path = Path::new(&config.path);
    Ok(match config.source {
        SourceKind::Fifo => Box::new(FifoSource::open(path, levels)?),
        SourceKind::Device => {
            let device =
                AmbientDevice::open(path).map_err(|source| AmbientError::CommandChannel {
                    path: path.to_path_buf(),
                    source,
                })?;
            Box::new(PolledSource::new(device, config.poll_interval(), levels))
        }
    })
}

/// Deliver one message to the configured channel, as a single write.
pub fn send_message(config: &CommandConfig, message: &Message) -> io::Result<()> {
    let path = Path::new(&config.path);
    match config.source {
        SourceKind::Fifo => {
            let payload = serde_json::to_vec(message)?;
            let mut pipe = OpenOptions::new().write(true).open(path)?;
            let written = pipe.write(&payload)?;
            if written != payload.len() {
                return Err(io::Error::new(
                    ErrorKind::WriteZero,
                    format!("wrote {} of {} bytes", written, payload.len()),
                ));
            }
            Ok(())
        }
        SourceKind::Device => {
            let mut device = AmbientDevice::open(path)?;
            match message {
                Message::Color(mode) => device.set_mode(mode),
                Message::Brightness(BrightnessValue::Level(level)) => {
                    device.set_brightness(&level.to_string())
                }
                Message::Brightness(BrightnessValue::Name(name)) => device.set_brightness(name),
            }
        }
    }
}

/// Applies commands from a source to the shared state on a dedicated thread.
pub struct CommandIngestor {
    running: Arc<AtomicBool>,
    interrupter: Interrupter,
    worker_handle: Option<thread::JoinHandle<()>>,
}

impl CommandIngestor {
    pub fn spawn(source: Box<dyn CommandSource>, state: SharedAnimation) -> io::Result<Self> {
        let interrupter = source.interrupter()?;
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = Arc::clone(&running);

        debug!("listening for commands on {}", source.describe());
        let worker_handle = thread::Builder::new()
            .name("command-ingestor".into())
            .spawn(move || ingest_loop(source, state, worker_running))?;

        Ok(CommandIngestor {
            running,
            interrupter,
            worker_handle: Some(worker_handle),
        })
    }

    /// Stop the worker and wait for it. No command is applied after this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.worker_handle.take() {
            self.interrupter.interrupt();
            if handle.join().is_err() {
                warn!("command ingestor thread panicked");
            }
        }
    }
}

impl Drop for CommandIngestor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn ingest_loop(
    mut source: Box<dyn CommandSource>,
    state: SharedAnimation,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::Relaxed) {
        match source.poll() {
            Ok(commands) => {
                for command in commands {
                    if !running.load(Ordering::Relaxed) {
                        return;
                    }
                    debug!("applying {:?}", command);
                    state.apply(command);
                }
            }
            Err(e) => {
                warn!("command read from {} failed: {}", source.describe(), e);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationState;
    use crate::color::Rgb;

    fn levels() -> BrightnessLevels {
        BrightnessLevels::default()
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("ambient-light-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_setter_messages() {
        let commands = parse_messages(br#"{"command":"color", "value":"red"}"#, &levels());
        assert_eq!(commands, vec![Command::SetMode(AnimationMode::Solid(Rgb::new(255, 0, 0)))]);

        let commands = parse_messages(br#"{"command":"brightness", "value":50}"#, &levels());
        assert_eq!(commands, vec![Command::SetBrightness(50)]);

        let commands = parse_messages(br#"{"command":"mode","value":"rainbow"}"#, &levels());
        assert_eq!(commands, vec![Command::SetMode(AnimationMode::Rainbow)]);
    }

    #[test]
    fn brightness_names_and_strings() {
        let commands = parse_messages(br#"{"command":"brightness","value":"high"}"#, &levels());
        assert_eq!(commands, vec![Command::SetBrightness(100)]);
        let commands = parse_messages(br#"{"command":"brightness","value":" 75 "}"#, &levels());
        assert_eq!(commands, vec![Command::SetBrightness(75)]);
        let commands = parse_messages(br#"{"command":"brightness","value":"dim"}"#, &levels());
        assert!(commands.is_empty());
        let commands = parse_messages(br#"{"command":"brightness","value":12.5}"#, &levels());
        assert!(commands.is_empty());
    }

    #[test]
    fn concatenated_messages_apply_in_order() {
        let chunk = br#"{"command":"color","value":"blue"}{"command":"brightness","value":20}
"#;
        let commands = parse_messages(chunk, &levels());
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[1], Command::SetBrightness(20));
    }

    #[test]
    fn malformed_chunks_yield_nothing() {
        let chunks: [&[u8]; 5] = [
            b"not json",
            br#"{"command":"strobe","value":"fast"}"#,
            br#"{"command":"brightness"}"#,
            b"\n",
            b"",
        ];
        for chunk in chunks {
            assert!(parse_messages(chunk, &levels()).is_empty());
        }
    }

    #[test]
    fn malformed_command_leaves_state_untouched() {
        let shared = SharedAnimation::new(AnimationState::new(40));
        shared.apply(Command::SetMode(AnimationMode::Rainbow));
        shared.take_frame_snapshot(3);
        let before = shared.snapshot();

        for command in parse_messages(br#"{"command":"brightness","value":"#, &levels()) {
            shared.apply(command);
        }
        assert_eq!(shared.snapshot(), before);
    }

    #[test]
    fn setter_message_round_trips() {
        let message = Message::Brightness(BrightnessValue::Level(50));
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(json, r#"{"command":"brightness","value":50}"#);
        let json = serde_json::to_string(&Message::Color("red".into())).unwrap();
        assert_eq!(json, r#"{"command":"color","value":"red"}"#);
    }

    #[test]
    fn fifo_source_rejects_regular_file() {
        let dir = scratch_dir("not-fifo");
        let path = dir.join("cmd");
        fs::write(&path, b"").unwrap();
        let err = FifoSource::open(&path, levels()).err().unwrap();
        assert!(matches!(err, AmbientError::CommandChannel { .. }));
        let _ = fs::remove_dir_all(&dir);
    }

    /// In-memory stand-in for the kernel handle.
    #[derive(Clone, Default)]
    struct FakeHandle(Arc<std::sync::Mutex<(String, String)>>);

    impl FakeHandle {
        fn set(&self, mode: &str, brightness: &str) {
            *self.0.lock().unwrap() = (mode.to_string(), brightness.to_string());
        }
    }

    impl StateHandle for FakeHandle {
        fn describe(&self) -> String {
            "fake".into()
        }

        fn read_mode(&mut self) -> io::Result<String> {
            Ok(self.0.lock().unwrap().0.clone())
        }

        fn read_brightness(&mut self) -> io::Result<String> {
            Ok(self.0.lock().unwrap().1.clone())
        }
    }

    #[test]
    fn polled_source_emits_only_changes() {
        let handle = FakeHandle::default();
        handle.set("rainbow", "mid");

        let mut source = PolledSource::new(handle.clone(), Duration::from_millis(1), levels());
        assert_eq!(
            source.poll().unwrap(),
            vec![Command::SetMode(AnimationMode::Rainbow), Command::SetBrightness(40)]
        );
        assert!(source.poll().unwrap().is_empty());

        handle.set("rainbow", "85");
        assert_eq!(source.poll().unwrap(), vec![Command::SetBrightness(85)]);

        handle.set("sparkle", "85");
        assert_eq!(source.poll().unwrap(), vec![Command::SetMode(AnimationMode::Off)]);

        // An unusable brightness is remembered but sends nothing.
        handle.set("sparkle", "dim");
        assert!(source.poll().unwrap().is_empty());
    }

    #[test]
    fn device_source_needs_the_node() {
        let config = CommandConfig {
            source: SourceKind::Device,
            path: "/dev/ambient-light-no-such-device".into(),
            poll_interval_ms: 1,
        };
        let err = open_source(&config, levels()).err().unwrap();
        assert!(matches!(err, AmbientError::CommandChannel { .. }));
        assert!(send_message(&config, &Message::Color("red".into())).is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn device_source_opens_char_device() {
        let config = CommandConfig {
            source: SourceKind::Device,
            path: "/dev/null".into(),
            poll_interval_ms: 1,
        };
        let mut source = open_source(&config, levels()).unwrap();
        assert!(source.describe().contains("/dev/null"));
        // /dev/null has no mode accessor; the read fails instead of yielding commands.
        assert!(source.poll().is_err());
    }

    #[test]
    fn ingestor_applies_polled_changes_and_stops() {
        let handle = FakeHandle::default();
        handle.set("green", "50");

        let shared = SharedAnimation::new(AnimationState::new(40));
        let source = PolledSource::new(handle, Duration::from_millis(5), levels());
        let mut ingestor = CommandIngestor::spawn(Box::new(source), shared.clone()).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while shared.snapshot().brightness() != 50 && std::time::Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        ingestor.stop();

        let state = shared.snapshot();
        assert_eq!(state.mode, AnimationMode::Solid(Rgb::new(0, 255, 0)));
        assert_eq!(state.brightness(), 50);
    }

    struct PanickingSource;

    impl CommandSource for PanickingSource {
        fn describe(&self) -> String {
            "panicking".into()
        }

        fn poll(&mut self) -> io::Result<Vec<Command>> {
            panic!("source failed");
        }

        fn interrupter(&self) -> io::Result<Interrupter> {
            Ok(Interrupter::none())
        }
    }

    #[test]
    fn stop_survives_a_panicked_worker() {
        let shared = SharedAnimation::new(AnimationState::new(40));
        let mut ingestor =
            CommandIngestor::spawn(Box::new(PanickingSource), shared.clone()).unwrap();
        thread::sleep(Duration::from_millis(20));
        ingestor.stop();
        ingestor.stop();
        assert_eq!(shared.snapshot(), AnimationState::new(40));
    }
}
