//! Text writers for reduced profiles.

use crate::format::format_g;
use crate::Result;
use sasred_core::{BoxResult, Reduced1D};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writer for reduced 1D profiles.
///
/// Only populated bins are written; each line holds `%g`-formatted columns
/// separated by two spaces.
pub struct ProfileWriter<W: Write> {
    writer: W,
}

impl ProfileWriter<BufWriter<File>> {
    /// Creates a new file writer.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> ProfileWriter<W> {
    /// Wraps an existing writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes an I(Q) profile as `<X>   <Y>   <dY>` columns.
    pub fn write_profile(&mut self, profile: &Reduced1D) -> Result<()> {
        writeln!(self.writer, "<X>   <Y>   <dY>")?;
        for point in profile.points() {
            writeln!(
                self.writer,
                "{}  {}  {}",
                format_g(point.x),
                format_g(point.y),
                format_g(point.dy)
            )?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes an I(phi) profile as `<phi>  <average>` columns.
    pub fn write_angular(&mut self, profile: &Reduced1D) -> Result<()> {
        writeln!(self.writer, "<phi>  <average>")?;
        for point in profile.points() {
            writeln!(self.writer, "{}  {}", format_g(point.x), format_g(point.y))?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Writes a box result as one `<value>  <error>  <weight>` line.
    pub fn write_box(&mut self, result: &BoxResult) -> Result<()> {
        writeln!(self.writer, "<value>  <error>  <weight>")?;
        writeln!(
            self.writer,
            "{}  {}  {}",
            format_g(result.value),
            format_g(result.error),
            format_g(result.weight)
        )?;
        self.writer.flush()?;
        Ok(())
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn profile() -> Reduced1D {
        Reduced1D {
            x: vec![0.001, 0.002, 0.003],
            y: vec![100.0, 0.0, 12.5],
            dy: vec![0.5, 0.0, 0.000_012_5],
            weight: vec![4.0, 0.0, 2.5],
        }
    }

    #[test]
    fn test_write_profile() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = ProfileWriter::create(file.path()).unwrap();
        writer.write_profile(&profile()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            content,
            "<X>   <Y>   <dY>\n0.001  100  0.5\n0.003  12.5  1.25e-05\n"
        );
    }

    #[test]
    fn test_write_angular() {
        let mut writer = ProfileWriter::new(Vec::new());
        writer.write_angular(&profile()).unwrap();
        let content = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, ["<phi>  <average>", "0.001  100", "0.003  12.5"]);
    }

    #[test]
    fn test_write_box() {
        let mut writer = ProfileWriter::new(Vec::new());
        let result = BoxResult {
            value: 268.0,
            error: 16.5,
            weight: 64.0,
        };
        writer.write_box(&result).unwrap();
        let content = String::from_utf8(writer.into_inner()).unwrap();
        assert!(content.ends_with("268  16.5  64\n"));
    }
}
