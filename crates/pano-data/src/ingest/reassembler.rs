//! Row-aligned batching of arbitrarily split text

const BOM: char = '\u{feff}';

/// Where the scan is within the current CSV field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FieldState {
    /// Right after a delimiter, a newline or the start of input
    #[default]
    Start,
    /// Inside a field that did not open with a quote; quotes are literal
    Unquoted,
    /// Inside a quoted field; newlines and delimiters are data
    Quoted,
    /// Saw a quote inside a quoted field: either `""` or the closing quote
    QuoteInQuoted,
}

/// Turns text fragments into self-contained CSV batches
///
/// Text is buffered until a newline outside a quoted field is seen;
/// everything up to the last such newline is flushed, so a row or a quoted
/// field split across fragments is never cut. A quote opens a quoted field
/// only at the start of a field, as the CSV reader treats it; a stray quote
/// inside an unquoted field is plain data. The first line ever flushed is the
/// header, which is kept and prepended to every batch.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: String,
    header: Option<String>,
    scanned: usize,
    field: FieldState,
    boundary: usize,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored header line (with its trailing newline), once seen
    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Bytes buffered but not yet flushed
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Append a fragment and return a batch if a row boundary was reached
    pub fn push(&mut self, fragment: &str) -> Option<String> {
        self.buffer.push_str(fragment);
        self.scan();

        if self.boundary == 0 {
            return None;
        }
        let rest = self.buffer.split_off(self.boundary);
        let flushed = std::mem::replace(&mut self.buffer, rest);
        self.scanned -= self.boundary;
        self.boundary = 0;

        self.batch(flushed)
    }

    /// Flush whatever is left once the input is exhausted
    pub fn finish(&mut self) -> Option<String> {
        let mut rest = std::mem::take(&mut self.buffer);
        self.scanned = 0;
        self.boundary = 0;
        self.field = FieldState::Start;

        if rest.trim().is_empty() {
            return None;
        }
        if !rest.ends_with('\n') {
            rest.push('\n');
        }
        self.batch(rest)
    }

    /// Feed every fragment of `fragments` and yield batches, ending with the
    /// final flush
    pub fn batches<I>(fragments: I) -> Batches<I::IntoIter>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Batches {
            fragments: fragments.into_iter(),
            reassembler: LineReassembler::new(),
            done: false,
        }
    }

    fn scan(&mut self) {
        let bytes = self.buffer.as_bytes();
        for (offset, &byte) in bytes[self.scanned..].iter().enumerate() {
            self.field = match (self.field, byte) {
                (FieldState::Start, b'"') => FieldState::Quoted,
                (FieldState::Quoted, b'"') => FieldState::QuoteInQuoted,
                (FieldState::Quoted, _) => FieldState::Quoted,
                (FieldState::QuoteInQuoted, b'"') => FieldState::Quoted,
                (_, b',') => FieldState::Start,
                (_, b'\n') => {
                    self.boundary = self.scanned + offset + 1;
                    FieldState::Start
                }
                _ => FieldState::Unquoted,
            };
        }
        self.scanned = bytes.len();
    }

    fn batch(&mut self, mut text: String) -> Option<String> {
        let header = match &self.header {
            Some(header) => header.clone(),
            None => {
                let end = text.find('\n').map_or(text.len(), |i| i + 1);
                let rows = text.split_off(end);
                let mut header = text;
                if header.starts_with(BOM) {
                    header.drain(..BOM.len_utf8());
                }
                if !header.ends_with('\n') {
                    header.push('\n');
                }
                self.header = Some(header.clone());
                text = rows;
                header
            }
        };

        if text.trim().is_empty() {
            return None;
        }
        let mut batch = String::with_capacity(header.len() + text.len());
        batch.push_str(&header);
        batch.push_str(&text);
        Some(batch)
    }
}

/// Iterator adapter returned by [`LineReassembler::batches`]
pub struct Batches<I> {
    fragments: I,
    reassembler: LineReassembler,
    done: bool,
}

impl<I> Iterator for Batches<I>
where
    I: Iterator,
    I::Item: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while !self.done {
            match self.fragments.next() {
                Some(fragment) => {
                    if let Some(batch) = self.reassembler.push(fragment.as_ref()) {
                        return Some(batch);
                    }
                }
                None => {
                    self.done = true;
                    return self.reassembler.finish();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "id,note,year\n\
                         1,plain,2019\n\
                         2,\"quoted, with comma\",2020\n\
                         3,\"spans\ntwo lines\",2021\n\
                         4,\"é and \"\"quotes\"\"\",2022\n\
                         5,5\" pole,2023\n\
                         6,\"after\nstray\",2024\n";

    fn rows(batches: impl IntoIterator<Item = String>) -> Vec<Vec<String>> {
        batches
            .into_iter()
            .flat_map(|batch| {
                let mut reader = csv::Reader::from_reader(std::io::Cursor::new(batch));
                reader
                    .records()
                    .map(|r| r.unwrap().iter().map(str::to_string).collect::<Vec<_>>())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn split_every(text: &str, width: usize) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        chars.chunks(width).map(|c| c.iter().collect()).collect()
    }

    #[test]
    fn test_every_batch_starts_with_header() {
        let batches: Vec<String> = LineReassembler::batches(split_every(TABLE, 5)).collect();
        assert!(batches.len() > 1);
        for batch in &batches {
            assert!(batch.starts_with("id,note,year\n"));
        }
    }

    #[test]
    fn test_boundaries_do_not_change_rows() {
        let whole = rows(LineReassembler::batches([TABLE]));
        assert_eq!(whole.len(), 6);
        assert_eq!(whole[2][1], "spans\ntwo lines");
        assert_eq!(whole[3][1], "é and \"quotes\"");
        assert_eq!(whole[4][1], "5\" pole");
        assert_eq!(whole[5][1], "after\nstray");

        for width in 1..=TABLE.chars().count() {
            assert_eq!(rows(LineReassembler::batches(split_every(TABLE, width))), whole, "width {}", width);
        }
    }

    #[test]
    fn test_quoted_newline_is_not_a_boundary() {
        let mut reassembler = LineReassembler::new();
        assert_eq!(reassembler.push("id,note\n"), None);
        assert_eq!(reassembler.header(), Some("id,note\n"));
        assert_eq!(reassembler.push("1,\"half\n"), None);
        assert_eq!(reassembler.pending(), "1,\"half\n");
        assert_eq!(
            reassembler.push("done\"\n2,x"),
            Some("id,note\n1,\"half\ndone\"\n".to_string())
        );
        assert_eq!(reassembler.finish(), Some("id,note\n2,x\n".to_string()));
        assert_eq!(reassembler.finish(), None);
    }

    #[test]
    fn test_stray_quote_in_unquoted_field_keeps_flushing() {
        let mut reassembler = LineReassembler::new();
        assert_eq!(reassembler.push("id,note\n"), None);
        assert_eq!(
            reassembler.push("1,5\" pole\n"),
            Some("id,note\n1,5\" pole\n".to_string())
        );
        assert_eq!(
            reassembler.push("2,x\n3,y\n"),
            Some("id,note\n2,x\n3,y\n".to_string())
        );
        assert_eq!(reassembler.push("4,z\n"), Some("id,note\n4,z\n".to_string()));
        assert_eq!(reassembler.pending(), "");
    }

    #[test]
    fn test_escaped_quote_split_across_fragments() {
        let mut reassembler = LineReassembler::new();
        reassembler.push("id,note\n");
        assert_eq!(reassembler.push("1,\"say \""), None);
        assert_eq!(reassembler.push("\"hi\"\"\nstill quoted"), None);
        assert_eq!(
            reassembler.push("\"\n"),
            Some("id,note\n1,\"say \"\"hi\"\"\nstill quoted\"\n".to_string())
        );
    }

    #[test]
    fn test_header_only_and_bom() {
        let batches: Vec<String> = LineReassembler::batches(["\u{feff}a,b\n"]).collect();
        assert!(batches.is_empty());

        let mut reassembler = LineReassembler::new();
        reassembler.push("\u{feff}a,b\n1,2\n");
        assert_eq!(reassembler.header(), Some("a,b\n"));
    }

    #[test]
    fn test_unterminated_last_row() {
        let batches: Vec<String> = LineReassembler::batches(["a,b\n1,2\n3,", "4"]).collect();
        assert_eq!(batches, vec!["a,b\n1,2\n".to_string(), "a,b\n3,4\n".to_string()]);
    }
}
