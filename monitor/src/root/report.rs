use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use log::warn;

use super::controller::DeadlockFlag;

/// Line-per-flag deadlock report written by the root.
///
/// Write failures are logged and the sink is dropped; the monitored program
/// never sees them.
pub struct DeadlockReport {
    sink: Option<Box<dyn Write + Send>>,
}

impl DeadlockReport {
    pub fn create(path: &Path) -> Self {
        match File::create(path) {
            Ok(file) => Self::from_writer(Box::new(BufWriter::new(file))),
            Err(error) => {
                warn!(
                    "cannot create deadlock report {}: {}. Flags will only be logged",
                    path.display(),
                    error
                );
                Self::disabled()
            }
        }
    }

    pub fn from_writer(sink: Box<dyn Write + Send>) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_active(&self) -> bool {
        self.sink.is_some()
    }

    /// Appends `<tick> <peer>` for every flag
    pub fn write_flags(&mut self, flags: &[DeadlockFlag]) {
        if flags.is_empty() {
            return;
        }
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let result = flags
            .iter()
            .try_for_each(|flag| writeln!(sink, "{} {}", flag.tick, flag.peer));
        if let Err(error) = result {
            warn!("deadlock report write failed: {}. Report disabled", error);
            self.sink = None;
        }
    }

    pub fn flush(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(error) = sink.flush() {
                warn!("deadlock report flush failed: {}", error);
            }
        }
    }
}

impl Drop for DeadlockReport {
    fn drop(&mut self) {
        self.flush();
    }
}
