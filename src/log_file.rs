/// Size-rotated event log file.
///
/// `usb_monitor.log` rolls to `usb_monitor.log.1`, `.1` to `.2`, and so on;
/// the oldest backup beyond the configured count is deleted.
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use usbsentry_core::monitor::LogSink;

pub struct FileLogSink {
    inner: Mutex<Inner>,
}

struct Inner {
    path: PathBuf,
    max_bytes: u64,
    backups: usize,
    file: Option<File>,
    written: u64,
}

impl FileLogSink {
    /// Open (or create) `path` for appending.
    pub fn open(path: impl Into<PathBuf>, max_bytes: u64, backups: usize) -> io::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = open_append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(Inner {
                path,
                max_bytes: max_bytes.max(1),
                backups,
                file: Some(file),
                written,
            }),
        })
    }

    pub fn path(&self) -> PathBuf {
        self.inner.lock().path.clone()
    }
}

impl LogSink for FileLogSink {
    fn write_line(&self, line: &str) {
        let mut inner = self.inner.lock();
        if let Err(e) = inner.write_line(line) {
            // The file is reopened on the next line.
            tracing::warn!("Failed to write log file {}: {e}", inner.path.display());
        }
    }
}

impl Inner {
    fn write_line(&mut self, line: &str) -> io::Result<()> {
        let len = line.len() as u64 + 1;
        if self.written > 0 && self.written + len > self.max_bytes {
            self.rotate()?;
        }

        let mut file = match self.file.take() {
            Some(f) => f,
            None => {
                let f = open_append(&self.path)?;
                self.written = f.metadata()?.len();
                f
            }
        };
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        self.written += len;
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file = None;

        if self.backups == 0 {
            remove_if_exists(&self.path)?;
        } else {
            remove_if_exists(&backup_path(&self.path, self.backups))?;
            for n in (1..self.backups).rev() {
                rename_if_exists(&backup_path(&self.path, n), &backup_path(&self.path, n + 1))?;
            }
            rename_if_exists(&self.path, &backup_path(&self.path, 1))?;
        }

        self.file = Some(open_append(&self.path)?);
        self.written = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// `usb_monitor.log` + 2 → `usb_monitor.log.2`
fn backup_path(path: &Path, n: usize) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn rename_if_exists(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
