use std::fs::{File, create_dir_all};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Log event types that determine which receivers should log the message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    /// Per-batch allocation and outcome detail inside one run
    Batch,
    /// One simulation run (start, completion, recovered draws)
    Run,
    /// Aggregated result of one policy variant
    Variant,
    /// Comparisons between variants within a scenario
    Scenario,
    /// Pass/fail results of scenario checks
    Validation,
}

impl LogEvent {
    /// This event and every event above it
    /// Hierarchy: Batch -> Run -> Variant -> Scenario -> Validation
    fn and_upward(self) -> &'static [LogEvent] {
        static ALL: [LogEvent; 5] = [
            LogEvent::Batch,
            LogEvent::Run,
            LogEvent::Variant,
            LogEvent::Scenario,
            LogEvent::Validation,
        ];
        let start = ALL.iter().position(|e| *e == self).unwrap_or(0);
        &ALL[start..]
    }
}

/// Trait for log receivers that can receive log messages
pub trait LogReceiver {
    /// Check if this receiver should handle the given log event
    fn should_log(&self, event: LogEvent) -> bool;

    fn write(&mut self, s: &str) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

/// Console log receiver (writes to stdout)
pub struct ConsoleReceiver {
    enabled_events: Vec<LogEvent>,
}

impl ConsoleReceiver {
    /// Returns a boxed receiver ready to be added to a logger
    pub fn new(enabled_events: Vec<LogEvent>) -> Box<dyn LogReceiver> {
        Box::new(Self { enabled_events })
    }
}

impl LogReceiver for ConsoleReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        print!("{}", s);
        io::stdout().flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// File log receiver (writes to a file)
pub struct FileReceiver {
    file: File,
    enabled_events: Vec<LogEvent>,
}

impl FileReceiver {
    /// Create a receiver writing to `path`, truncating it and creating parent
    /// directories as needed
    pub fn new(path: &Path, enabled_events: Vec<LogEvent>) -> io::Result<Box<dyn LogReceiver>> {
        if let Some(parent) = path.parent() {
            create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        Ok(Box::new(Self { file, enabled_events }))
    }
}

impl LogReceiver for FileReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        write!(self.file, "{}", s)?;
        self.file.flush()
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// In-memory receiver for tests
#[cfg(test)]
pub struct MemoryReceiver {
    enabled_events: Vec<LogEvent>,
    pub lines: std::rc::Rc<std::cell::RefCell<String>>,
}

#[cfg(test)]
impl MemoryReceiver {
    /// Returns the receiver and a handle to everything written to it
    pub fn new(enabled_events: Vec<LogEvent>) -> (Box<dyn LogReceiver>, std::rc::Rc<std::cell::RefCell<String>>) {
        let lines = std::rc::Rc::new(std::cell::RefCell::new(String::new()));
        (Box::new(Self { enabled_events, lines: lines.clone() }), lines)
    }
}

#[cfg(test)]
impl LogReceiver for MemoryReceiver {
    fn should_log(&self, event: LogEvent) -> bool {
        self.enabled_events.contains(&event)
    }

    fn write(&mut self, s: &str) -> io::Result<()> {
        self.lines.borrow_mut().push_str(s);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub type ReceiverId = usize;

static RECEIVER_ID_COUNTER: AtomicUsize = AtomicUsize::new(1);

/// Main logger that fans messages out to its receivers
pub struct Logger {
    receivers: Vec<(ReceiverId, Box<dyn LogReceiver>)>,
}

impl Logger {
    pub fn new() -> Self {
        Self { receivers: Vec::new() }
    }

    /// Add a receiver to the logger and return its unique ID
    pub fn add_receiver(&mut self, receiver: Box<dyn LogReceiver>) -> ReceiverId {
        let id = RECEIVER_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.receivers.push((id, receiver));
        id
    }

    pub fn remove_receiver(&mut self, id: ReceiverId) {
        self.receivers.retain(|(receiver_id, _)| *receiver_id != id);
    }

    /// Whether any receiver listens to `event`; lets callers skip formatting
    pub fn is_enabled(&self, event: LogEvent) -> bool {
        self.receivers.iter().any(|(_, r)| r.should_log(event))
    }

    pub fn log(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            if receiver.should_log(event) {
                receiver.write(message)?;
            }
        }
        Ok(())
    }

    pub fn logln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log(event, &format!("{}\n", message))
    }

    /// Send a prefixed line to the event and all upward events.
    /// Each receiver gets the line once even if it listens to several of them.
    fn log_with_prefix(&mut self, event: LogEvent, prefix: &str, message: &str) -> io::Result<()> {
        let events = event.and_upward();
        let formatted_message = format!("{} {}\n", prefix, message);
        for (_, receiver) in &mut self.receivers {
            if events.iter().any(|&evt| receiver.should_log(evt)) {
                receiver.write(&formatted_message)?;
            }
        }
        Ok(())
    }

    /// Prepends "ERROR" and propagates upward
    pub fn errln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log_with_prefix(event, "ERROR", message)
    }

    /// Prepends "WARNING" and propagates upward
    pub fn warnln(&mut self, event: LogEvent, message: &str) -> io::Result<()> {
        self.log_with_prefix(event, "WARNING", message)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        for (_, receiver) in &mut self.receivers {
            receiver.flush()?;
        }
        Ok(())
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanitize a string to be used as a filename
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect()
}

/// Log a formatted line (like println! but for logger)
#[macro_export]
macro_rules! logln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.logln($event, &format!($($arg)*));
        }
    };
}

/// Log a formatted string without newline
#[macro_export]
macro_rules! log {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.log($event, &format!($($arg)*));
        }
    };
}

/// Log an ERROR line to the event and all upward events
#[macro_export]
macro_rules! errln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.errln($event, &format!($($arg)*));
        }
    };
}

/// Log a WARNING line to the event and all upward events
#[macro_export]
macro_rules! warnln {
    ($logger:expr, $event:expr, $($arg:tt)*) => {
        {
            let _ = $logger.warnln($event, &format!($($arg)*));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("epsilon greedy"), "epsilon_greedy");
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_routing_by_event() {
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Variant]);
        logger.add_receiver(receiver);
        logln!(logger, LogEvent::Batch, "batch detail");
        logln!(logger, LogEvent::Variant, "variant summary");
        assert_eq!(lines.borrow().as_str(), "variant summary\n");
    }

    #[test]
    fn test_warnings_propagate_upward_once() {
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Run, LogEvent::Scenario]);
        logger.add_receiver(receiver);
        warnln!(logger, LogEvent::Batch, "draw recovered");
        assert_eq!(lines.borrow().as_str(), "WARNING draw recovered\n");

        // Nothing propagates downward
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Batch]);
        logger.add_receiver(receiver);
        errln!(logger, LogEvent::Variant, "bad");
        assert!(lines.borrow().is_empty());
    }

    #[test]
    fn test_remove_receiver() {
        let mut logger = Logger::new();
        let (receiver, lines) = MemoryReceiver::new(vec![LogEvent::Run]);
        let id = logger.add_receiver(receiver);
        assert!(logger.is_enabled(LogEvent::Run));
        logger.remove_receiver(id);
        assert!(!logger.is_enabled(LogEvent::Run));
        logln!(logger, LogEvent::Run, "dropped");
        assert!(lines.borrow().is_empty());
    }
}
