use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::store::BookId;

/// Receives the complete text of a book once its connection has closed.
pub trait BookDrain: Clone + Send + 'static {
    /// persists the `lines` of `book`, in the order they were received
    fn drain(&self, book: BookId, lines: &[String]) -> Result<()>;
}

/// Writes every finished book to `<dir>/book_NN.txt`, one line per record.
#[derive(Debug, Clone)]
pub struct FileDrain {
    dir: PathBuf,
}

impl FileDrain {
    /// creates a drain writing into `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileDrain { dir: dir.into() }
    }

    /// the path `book` is written to
    pub fn path_for(&self, book: BookId) -> PathBuf {
        build_book_path(&self.dir, book)
    }
}

impl BookDrain for FileDrain {
    fn drain(&self, book: BookId, lines: &[String]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(book);
        let mut writer = BufWriter::new(File::create(&path)?);
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        info!("wrote {} lines of {} to {:?}", lines.len(), book, path);
        Ok(())
    }
}

/// builds the output path of a book, e.g. `dir/book_01.txt`
fn build_book_path(dir: &Path, book: BookId) -> PathBuf {
    dir.join(format!("{}.txt", book))
}
