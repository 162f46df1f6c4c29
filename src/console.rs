// Copyright 2025
// SPDX-License-Identifier: Apache-2.0
//
// Console output with sensitive data masked line by line

use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

use crate::masking::MaskingProcessor;

/// `MakeWriter` wrapper that masks every formatted line before it is written
#[derive(Debug, Clone)]
pub struct MaskingMakeWriter<M = fn() -> io::Stdout> {
    inner: M,
    processor: Arc<MaskingProcessor>,
}

impl MaskingMakeWriter {
    pub fn stdout(processor: Arc<MaskingProcessor>) -> Self {
        Self::new(io::stdout as fn() -> io::Stdout, processor)
    }
}

impl<M> MaskingMakeWriter<M> {
    pub fn new(inner: M, processor: Arc<MaskingProcessor>) -> Self {
        Self { inner, processor }
    }
}

impl<'a, M> MakeWriter<'a> for MaskingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = MaskingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        MaskingWriter::new(self.inner.make_writer(), Arc::clone(&self.processor))
    }
}

/// Buffers output and masks it one complete line at a time
///
/// A trailing partial line is masked and written on `flush` or drop.
pub struct MaskingWriter<W: Write> {
    inner: W,
    processor: Arc<MaskingProcessor>,
    buffer: Vec<u8>,
}

impl<W: Write> MaskingWriter<W> {
    pub fn new(inner: W, processor: Arc<MaskingProcessor>) -> Self {
        Self {
            inner,
            processor,
            buffer: Vec::new(),
        }
    }

    fn write_masked(&mut self, bytes: &[u8]) -> io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        let masked = self.processor.process(&text);
        self.inner.write_all(masked.as_bytes())
    }

    fn flush_lines(&mut self) -> io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_masked(&line)?;
        }
        Ok(())
    }

    fn flush_remainder(&mut self) -> io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let rest = std::mem::take(&mut self.buffer);
        self.write_masked(&rest)
    }
}

impl<W: Write> Write for MaskingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_lines()?;
        self.flush_remainder()?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for MaskingWriter<W> {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn processor() -> Arc<MaskingProcessor> {
        Arc::new(MaskingProcessor::with_default_rules().unwrap())
    }

    #[test]
    fn test_masks_complete_lines() {
        let mut out = Vec::new();
        {
            let mut writer = MaskingWriter::new(&mut out, processor());
            writer.write_all(b"card 1234567812345678\nDNI 12345678\n").unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "card ***5678\nDNI 12***78\n");
    }

    #[test]
    fn test_line_split_across_writes() {
        let mut out = Vec::new();
        {
            let mut writer = MaskingWriter::new(&mut out, processor());
            writer.write_all(b"DNI 1234").unwrap();
            writer.write_all(b"5678 done\n").unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "DNI 12***78 done\n");
    }

    #[test]
    fn test_partial_line_written_on_drop() {
        let mut out = Vec::new();
        {
            let mut writer = MaskingWriter::new(&mut out, processor());
            writer.write_all(b"email jane@mail.com").unwrap();
        }
        assert_eq!(String::from_utf8(out).unwrap(), "email j***@mail.com");
    }

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_fmt_layer_output_masked() {
        let buffer = SharedBuffer::default();
        let sink = buffer.clone();
        let make_writer = MaskingMakeWriter::new(move || sink.clone(), processor());
        let subscriber = tracing_subscriber::fmt()
            .with_writer(make_writer)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(phone = "987654321", "created order for 12345678");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("created order for 12***78"));
        assert!(output.contains("***321"));
        assert!(!output.contains("12345678"));
    }
}
