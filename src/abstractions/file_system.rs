use std::{cell::RefCell, env, fs::{self, File}, io, path::{Path, PathBuf}, rc::Rc};

use anyhow::{Context, Result, anyhow};
use hashbrown::HashMap;

pub trait FileSystem {
    type Reader: io::Read;
    type Writer: io::Write;

    fn exists(&self, path: &Path) -> bool;
    fn get_writer(&mut self, path: &Path) -> Result<Self::Writer>;
    fn get_reader(&mut self, path: &Path) -> Result<Self::Reader>;
    fn get_executable_directory(&self) -> Result<PathBuf>;
    fn create_dir_all(&mut self, path: &Path) -> Result<()>;
}

pub struct DefaultFileSystem;

impl FileSystem for DefaultFileSystem {
    type Reader = File;
    type Writer = File;

    fn get_writer(&mut self, path: &Path) -> Result<Self::Writer> {
        File::create(path).with_context(|| format!("could not create {}", path.display()))
    }

    fn get_reader(&mut self, path: &Path) -> Result<Self::Reader> {
        File::open(path).with_context(|| format!("could not open {}", path.display()))
    }

    fn get_executable_directory(&self) -> Result<PathBuf> {
        let executable_path = env::current_exe()?;
        let directory = executable_path
            .parent()
            .ok_or_else(|| anyhow!("executable has no parent directory"))?;

        Ok(directory.to_path_buf())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&mut self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("could not create {}", path.display()))
    }
}

impl DefaultFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// In-memory file system for tests. Writers truncate, like `File::create`.
pub struct MemoryFileSystem {
    map: HashMap<PathBuf, MemoryFileSystemEntry>
}

impl FileSystem for MemoryFileSystem {
    type Reader = MemoryFileSystemEntry;
    type Writer = MemoryFileSystemEntry;

    fn get_writer(&mut self, path: &Path) -> Result<Self::Writer> {
        let entry = MemoryFileSystemEntry::new();
        self.map.insert(path.to_path_buf(), entry.clone());

        Ok(entry)
    }

    fn get_reader(&mut self, path: &Path) -> Result<Self::Reader> {
        self.map.get(path)
            .map(MemoryFileSystemEntry::reopen)
            .ok_or_else(|| anyhow!("file not found: {}", path.display()))
    }

    fn get_executable_directory(&self) -> Result<PathBuf> {
        Ok(env::temp_dir())
    }

    fn exists(&self, path: &Path) -> bool {
        self.map.contains_key(path)
    }

    fn create_dir_all(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self {
            map: HashMap::new()
        }
    }
}

#[derive(Clone)]
pub struct MemoryFileSystemEntry {
    data: Rc<RefCell<Vec<u8>>>,
    position: usize,
}

impl io::Read for MemoryFileSystemEntry {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let data = self.data.borrow();
        let available = data.len().saturating_sub(self.position);
        let bytes_to_read = available.min(buf.len());

        buf[..bytes_to_read].copy_from_slice(&data[self.position..self.position + bytes_to_read]);
        self.position += bytes_to_read;

        Ok(bytes_to_read)
    }
}

impl io::Write for MemoryFileSystemEntry {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl MemoryFileSystemEntry {
    pub fn new() -> Self {
        Self {
            data: Rc::new(RefCell::new(Vec::new())),
            position: 0
        }
    }

    fn reopen(&self) -> Self {
        Self {
            data: self.data.clone(),
            position: 0,
        }
    }
}
