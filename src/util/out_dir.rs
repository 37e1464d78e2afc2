use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use errors::Result;

/// Directory for putting output files in. Will be created lazily when the
/// first file is written, so a run with nothing to put in it leaves no empty
/// directory behind.
pub struct OutDir {
    path: PathBuf,
    created: bool,
}

impl OutDir {
    pub fn new(path: PathBuf) -> OutDir {
        OutDir { path, created: false }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `data` to `filename` in the directory, replacing any existing
    /// file.
    pub fn write_file(&mut self, filename: &str, data: &[u8]) -> Result<()> {
        if !self.created {
            match fs::create_dir(&self.path) {
                Ok(()) => (),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => (),
                Err(e) => Err(e)?,
            }
            self.created = true;
        }
        let mut f = fs::File::create(self.path.join(filename))?;
        f.write_all(data)?;
        Ok(())
    }
}
