//! Input and output helpers shared by the command-line passes.
//!
//! A path of `-` means stdin or stdout. Paths ending in `.gz` are read through
//! a gzip decoder and written through a gzip encoder.

use std::fs::File;
use std::io::{self, stdin, stdout, BufRead, BufReader, BufWriter, Stdout, Write};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

const STDIO_PATH: &str = "-";

fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some("gz")
}

/// Open a text input for line-oriented reading.
pub fn open_input(path: &Path) -> io::Result<Box<dyn BufRead>> {
    if path.to_str() == Some(STDIO_PATH) {
        return Ok(Box::new(BufReader::new(stdin())));
    }

    let file = File::open(path)?;
    if is_gzip(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// A buffered text output created by [`create_output`].
///
/// Call [`Output::finish`] once writing is done. Dropping a gzip output
/// without finishing it leaves the trailer write unchecked.
#[derive(Debug)]
pub enum Output {
    /// Standard output
    Stdout(BufWriter<Stdout>),
    /// Plain file
    File(BufWriter<File>),
    /// Gzip-compressed file
    Gzip(BufWriter<GzEncoder<File>>),
}

impl Output {
    /// Flush buffered data and, for gzip, write the trailer.
    pub fn finish(self) -> io::Result<()> {
        match self {
            Output::Stdout(mut writer) => writer.flush(),
            Output::File(writer) => writer.into_inner().map_err(|e| e.into_error())?.sync_all(),
            Output::Gzip(writer) => writer
                .into_inner()
                .map_err(|e| e.into_error())?
                .finish()?
                .sync_all(),
        }
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File(writer) => writer.write(buf),
            Output::Gzip(writer) => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File(writer) => writer.flush(),
            Output::Gzip(writer) => writer.flush(),
        }
    }
}

/// Create a buffered text output.
pub fn create_output(path: &Path) -> io::Result<Output> {
    if path.to_str() == Some(STDIO_PATH) {
        return Ok(Output::Stdout(BufWriter::new(stdout())));
    }

    let file = File::create(path)?;
    if is_gzip(path) {
        Ok(Output::Gzip(BufWriter::new(GzEncoder::new(
            file,
            Compression::default(),
        ))))
    } else {
        Ok(Output::File(BufWriter::new(file)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn plain_files_are_read_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.pileup");
        std::fs::write(&path, "chr1\t1\tA\t0\t*\t*\n").unwrap();

        let mut text = String::new();
        open_input(&path).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "chr1\t1\tA\t0\t*\t*\n");
    }

    #[test]
    fn gzip_output_reads_back_through_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.pileup.gz");
        let mut out = create_output(&path).unwrap();
        out.write_all(b"chr2\t7\tC\t1\t.\tI\n").unwrap();
        out.finish().unwrap();

        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);

        let lines: Vec<String> = open_input(&path)
            .unwrap()
            .lines()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(lines, vec!["chr2\t7\tC\t1\t.\tI"]);
    }

    #[test]
    fn finished_gzip_output_has_a_complete_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.tsv.gz");
        let mut out = create_output(&path).unwrap();
        assert!(matches!(out, Output::Gzip(_)));
        for position in 1..=500 {
            writeln!(out, "chr1\t{position}\tA\t1\t.\tI").unwrap();
        }
        out.finish().unwrap();

        // Trailer: CRC32 then the uncompressed length mod 2^32.
        let raw = std::fs::read(&path).unwrap();
        let expected: usize = (1..=500)
            .map(|position: u32| format!("chr1\t{position}\tA\t1\t.\tI\n").len())
            .sum();
        let size = u32::from_le_bytes(raw[raw.len() - 4..].try_into().unwrap());
        assert_eq!(size as usize, expected);

        let mut decoder = flate2::read::GzDecoder::new(raw.as_slice());
        let mut text = String::new();
        decoder.read_to_string(&mut text).unwrap();
        assert_eq!(text.lines().count(), 500);
    }

    #[test]
    fn plain_output_is_complete_after_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.tsv");
        let mut out = create_output(&path).unwrap();
        assert!(matches!(out, Output::File(_)));
        out.write_all(b"#header\n").unwrap();
        out.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "#header\n");
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(open_input(&dir.path().join("absent.pileup")).is_err());
    }
}
