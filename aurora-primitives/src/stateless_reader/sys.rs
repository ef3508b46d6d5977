//! Positional reads on a shared [`File`] handle.
//!
//! Unix and Windows can read at an offset without touching the file cursor, so a single handle can
//! be shared between any number of streams. Elsewhere the cursor is guarded by a mutex.

use std::fs::File;

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use std::os::unix::fs::FileExt as _;

        #[derive(Debug)]
        pub struct PositionalFile {
            file: File,
        }

        impl PositionalFile {
            pub fn new(file: File) -> Self {
                Self { file }
            }

            pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
                self.file.read_at(buf, offset)
            }
        }
    } else if #[cfg(windows)] {
        use std::os::windows::fs::FileExt as _;

        #[derive(Debug)]
        pub struct PositionalFile {
            file: File,
        }

        impl PositionalFile {
            pub fn new(file: File) -> Self {
                Self { file }
            }

            // NB: seek_read moves the file cursor, but nothing else relies on it
            pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
                self.file.seek_read(buf, offset)
            }
        }
    } else {
        use std::io::{Read as _, Seek as _, SeekFrom};

        use parking_lot::Mutex;

        #[derive(Debug)]
        pub struct PositionalFile {
            file: Mutex<File>,
        }

        impl PositionalFile {
            pub fn new(file: File) -> Self {
                Self {
                    file: Mutex::new(file),
                }
            }

            pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
                let mut file = self.file.lock();
                file.seek(SeekFrom::Start(offset))?;
                file.read(buf)
            }
        }
    }
}
