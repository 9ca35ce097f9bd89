use std::io::BufRead;
use std::path::Path;

use super::error::{ParseError, TableParseError};
use super::model::Spectrum;
use super::source::{NamedSource, SpectrumSource};

/// Number of lines before the count table starts.
pub const HEADER_LENGTH: usize = 52;

/// Header line declaring the detector live time in seconds.
pub const LIVE_TIME_PREFIX: &str = "Live Time:";

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Layout of the text dump read by [`parse_with`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    /// The table always begins on line `header_length + 1`.
    pub header_length: usize,
    pub live_time_prefix: String,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            header_length: HEADER_LENGTH,
            live_time_prefix: LIVE_TIME_PREFIX.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a spectrum file from a local path.
pub fn load_path(path: &Path) -> Result<Spectrum, ParseError> {
    let source = NamedSource::open(path).map_err(|source| ParseError::Io {
        name: path.display().to_string(),
        source,
    })?;
    parse(source)
}

/// Parse a spectrum with the default file layout.
pub fn parse<S: SpectrumSource>(source: S) -> Result<Spectrum, ParseError> {
    parse_with(source, &LoaderOptions::default())
}

/// Parse a spectrum, normalizing every count by the header's live time.
///
/// The source is consumed and closed exactly once, whether parsing
/// succeeds or fails.
pub fn parse_with<S: SpectrumSource>(
    source: S,
    options: &LoaderOptions,
) -> Result<Spectrum, ParseError> {
    let name = source.name().to_string();
    log::info!("Creating a Spectrum from: {name}");

    if source.is_closed() {
        return Err(ParseError::StreamClosedEarly { name });
    }

    let mut guard = CloseGuard::new(source);
    let spectrum = read_spectrum(&mut guard.source, &name, options)?;
    guard
        .finish()
        .map_err(|source| ParseError::Io { name, source })?;
    Ok(spectrum)
}

// ---------------------------------------------------------------------------
// Scoped release of the source
// ---------------------------------------------------------------------------

struct CloseGuard<S: SpectrumSource> {
    source: S,
    closed: bool,
}

impl<S: SpectrumSource> CloseGuard<S> {
    fn new(source: S) -> Self {
        CloseGuard {
            source,
            closed: false,
        }
    }

    fn finish(mut self) -> std::io::Result<()> {
        self.closed = true;
        self.source.close()
    }
}

impl<S: SpectrumSource> Drop for CloseGuard<S> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.source.close() {
            log::warn!("{}: failed to close source: {e}", self.source.name());
        }
    }
}

// ---------------------------------------------------------------------------
// Header + table
// ---------------------------------------------------------------------------

fn read_spectrum<S: SpectrumSource>(
    source: &mut S,
    name: &str,
    options: &LoaderOptions,
) -> Result<Spectrum, ParseError> {
    let header = scan_header(source, name, options)?;
    let skip = options.header_length - header.consumed;
    log::debug!(
        "{name}: header scan stopped after {} lines, skipping {skip} more",
        header.consumed
    );

    let counts = read_table(source, name, header.consumed + 1, skip)?;
    if counts.is_empty() {
        return Err(ParseError::Empty {
            name: name.to_string(),
        });
    }

    let live_time = header.live_time;
    Ok(Spectrum::new(
        counts.into_iter().map(|c| c / live_time).collect(),
    ))
}

struct Header {
    live_time: f64,
    /// Lines read, including the live-time line itself.
    consumed: usize,
}

/// Read at most `header_length` lines, stopping right after the first
/// live-time declaration.
fn scan_header<R: BufRead>(
    reader: &mut R,
    name: &str,
    options: &LoaderOptions,
) -> Result<Header, ParseError> {
    let mut buf = Vec::new();
    let mut consumed = 0;

    while consumed < options.header_length {
        let Some(line) = next_line(reader, &mut buf, name, consumed + 1)? else {
            break;
        };
        consumed += 1;

        let Some(rest) = line.strip_prefix(options.live_time_prefix.as_str()) else {
            continue;
        };
        // Only the field between the first and second colon holds the value.
        let value = match line.split_once(':') {
            Some((_, after)) => after.split(':').next().unwrap_or(after),
            None => rest,
        }
        .trim();
        let live_time = value
            .parse::<f64>()
            .map_err(|source| ParseError::LiveTime {
                name: name.to_string(),
                line: consumed,
                value: value.to_string(),
                source,
            })?;
        if !live_time.is_finite() || live_time <= 0.0 {
            return Err(ParseError::InvalidLiveTime {
                name: name.to_string(),
                line: consumed,
                value: live_time,
            });
        }

        log::info!("Live time: {live_time}");
        return Ok(Header {
            live_time,
            consumed,
        });
    }

    Ok(Header {
        live_time: 1.0,
        consumed,
    })
}

/// Parse whitespace-delimited rows, drop the index column and flatten the
/// remaining columns row-major.
fn read_table<R: BufRead>(
    reader: &mut R,
    name: &str,
    first_line: usize,
    skip: usize,
) -> Result<Vec<f64>, ParseError> {
    let table_err = |source: TableParseError| ParseError::Table {
        name: name.to_string(),
        source,
    };

    let mut buf = Vec::new();
    let mut line_no = first_line;
    let mut width: Option<usize> = None;
    let mut rows = 0usize;
    let mut counts = Vec::new();

    while let Some(line) = next_line(reader, &mut buf, name, line_no)? {
        let current = line_no;
        line_no += 1;
        if current < first_line + skip {
            continue;
        }

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }

        // The first row fixes the width. Shorter rows (a partial last row)
        // contribute only the counts they hold.
        let expected = *width.get_or_insert(fields.len());
        if fields.len() > expected {
            return Err(table_err(TableParseError::RaggedRow {
                line: current,
                expected,
                found: fields.len(),
            }));
        }
        if expected < 2 {
            return Err(table_err(TableParseError::NoDataColumns { line: current }));
        }

        // Column 0 is the row index and is never interpreted.
        for (column, token) in fields.iter().enumerate().skip(1) {
            let value = token.parse::<f64>().map_err(|_| {
                table_err(TableParseError::InvalidNumber {
                    line: current,
                    column,
                    token: token.to_string(),
                })
            })?;
            counts.push(value);
        }
        rows += 1;
    }

    log::debug!(
        "{name}: parsed {rows} rows x {} count columns",
        width.map_or(0, |w| w.saturating_sub(1))
    );
    Ok(counts)
}

/// Read one line as UTF-8 text, or `None` at end of stream.
fn next_line<'b, R: BufRead>(
    reader: &mut R,
    buf: &'b mut Vec<u8>,
    name: &str,
    line: usize,
) -> Result<Option<&'b str>, ParseError> {
    buf.clear();
    let n = reader
        .read_until(b'\n', buf)
        .map_err(|source| ParseError::Io {
            name: name.to_string(),
            source,
        })?;
    if n == 0 {
        return Ok(None);
    }
    std::str::from_utf8(buf)
        .map(Some)
        .map_err(|_| ParseError::Decode {
            name: name.to_string(),
            line,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::io::{self, Cursor, Read};
    use std::rc::Rc;

    /// Build a dump with a full-length header. `live_time` is placed on the
    /// given 1-based header line.
    fn dump(live_time: Option<(usize, &str)>, table: &[&str]) -> String {
        let mut text = String::new();
        for line in 1..=HEADER_LENGTH {
            match live_time {
                Some((at, value)) if at == line => {
                    text.push_str(&format!("{LIVE_TIME_PREFIX}{value}\n"))
                }
                _ => text.push_str(&format!("# header line {line}\n")),
            }
        }
        for row in table {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    fn parse_str(text: &str) -> Result<Spectrum, ParseError> {
        parse(NamedSource::new("test.txt", Cursor::new(text.to_string())))
    }

    /// Counts how often the loader closes it.
    struct CountingSource {
        inner: Cursor<Vec<u8>>,
        closes: Rc<Cell<usize>>,
    }

    impl CountingSource {
        fn new(text: &str) -> (Self, Rc<Cell<usize>>) {
            let closes = Rc::new(Cell::new(0));
            let source = CountingSource {
                inner: Cursor::new(text.as_bytes().to_vec()),
                closes: Rc::clone(&closes),
            };
            (source, closes)
        }
    }

    impl Read for CountingSource {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl BufRead for CountingSource {
        fn fill_buf(&mut self) -> io::Result<&[u8]> {
            self.inner.fill_buf()
        }

        fn consume(&mut self, amt: usize) {
            self.inner.consume(amt)
        }
    }

    impl SpectrumSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn close(&mut self) -> io::Result<()> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn counts_are_divided_by_live_time() {
        let text = dump(Some((10, " 2.0")), &["0 2 4", "1 6 8"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(spectrum.name(), "spectrum");
        assert_eq!(spectrum.slope(), None);
        assert_eq!(spectrum.origin(), 0.0);
    }

    #[test]
    fn missing_live_time_leaves_counts_raw() {
        let text = dump(None, &["0 5 7", "1 9 11"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[5.0, 7.0, 9.0, 11.0]);
    }

    #[test]
    fn flattening_is_row_major() {
        let text = dump(Some((1, "1")), &["0 1 2", "1 3 4"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn table_starts_after_header_regardless_of_marker_position() {
        for at in [1, 26, HEADER_LENGTH] {
            let text = dump(Some((at, " 4")), &["0 8 12 16"]);
            let spectrum = parse_str(&text).unwrap();
            assert_eq!(spectrum.data(), &[2.0, 3.0, 4.0], "live time on line {at}");
        }
    }

    #[test]
    fn first_live_time_wins() {
        let mut text = dump(Some((3, " 2")), &["0 10"]);
        text = text.replacen("# header line 7\n", "Live Time: 5\n", 1);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[5.0]);
    }

    #[test]
    fn live_time_after_header_is_table_content() {
        let text = dump(None, &["Live Time: 2.0", "0 1 2"]);
        let err = parse_str(&text).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Table {
                source: TableParseError::InvalidNumber { line: 53, .. },
                ..
            }
        ));
    }

    #[test]
    fn table_shape_gives_rows_times_columns() {
        let rows: Vec<String> = (0..16)
            .map(|r| format!("{r} {} {} {} {} {}", r, r + 1, r + 2, r + 3, r + 4))
            .collect();
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let spectrum = parse_str(&dump(Some((20, " 10")), &rows)).unwrap();
        assert_eq!(spectrum.len(), 16 * 5);
        assert_eq!(spectrum.data()[5], 0.1);
    }

    #[test]
    fn malformed_live_time_fails() {
        let err = parse_str(&dump(Some((4, " soon")), &["0 1"])).unwrap_err();
        match err {
            ParseError::LiveTime { line, value, .. } => {
                assert_eq!(line, 4);
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_live_time_fails() {
        let err = parse_str(&dump(Some((4, " 0")), &["0 1"])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidLiveTime { line: 4, .. }));
    }

    #[test]
    fn empty_stream_fails() {
        assert!(matches!(parse_str("").unwrap_err(), ParseError::Empty { .. }));
    }

    #[test]
    fn header_without_table_fails() {
        let err = parse_str(&dump(Some((2, " 1.5")), &[])).unwrap_err();
        assert!(matches!(err, ParseError::Empty { .. }));
    }

    #[test]
    fn short_file_is_consumed_as_header() {
        let spectrum = parse_str("0 1 2\n1 3 4\n");
        assert!(matches!(spectrum.unwrap_err(), ParseError::Empty { .. }));
    }

    #[test]
    fn partial_last_row_is_accepted() {
        let text = dump(Some((3, " 2")), &["0 2 4 6", "3 8 10"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn index_only_last_row_adds_nothing() {
        let spectrum = parse_str(&dump(None, &["0 1 2", "2"])).unwrap();
        assert_eq!(spectrum.data(), &[1.0, 2.0]);
    }

    #[test]
    fn row_wider_than_first_fails() {
        let err = parse_str(&dump(None, &["0 1 2", "1 3 4 5"])).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Table {
                source: TableParseError::RaggedRow {
                    line: 54,
                    expected: 3,
                    found: 4
                },
                ..
            }
        ));
    }

    #[test]
    fn index_only_rows_fail() {
        let err = parse_str(&dump(None, &["0", "1"])).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Table {
                source: TableParseError::NoDataColumns { line: 53 },
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_count_fails() {
        let err = parse_str(&dump(None, &["ch0 1 x"])).unwrap_err();
        match err {
            ParseError::Table {
                source: TableParseError::InvalidNumber { line, column, token },
                ..
            } => {
                assert_eq!((line, column, token.as_str()), (53, 2, "x"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn text_index_column_is_ignored() {
        let spectrum = parse_str(&dump(None, &["ch0 2 4", "ch1 6 8", "0x1F 1 3"])).unwrap();
        assert_eq!(spectrum.data(), &[2.0, 4.0, 6.0, 8.0, 1.0, 3.0]);
    }

    #[test]
    fn live_time_stops_at_second_colon() {
        let text = dump(Some((8, " 4.0:s")), &["0 8 12"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[2.0, 3.0]);
    }

    #[test]
    fn blank_lines_and_crlf_are_tolerated() {
        let text = dump(Some((5, " 2\r")), &["  0   2\t4\r", "", "1 6 8\r"]);
        let spectrum = parse_str(&text).unwrap();
        assert_eq!(spectrum.data(), &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn invalid_utf8_header_fails() {
        let mut bytes = b"# ok\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        let err = parse(NamedSource::new("bin", Cursor::new(bytes))).unwrap_err();
        assert!(matches!(err, ParseError::Decode { line: 2, .. }));
    }

    #[test]
    fn custom_header_length() {
        let options = LoaderOptions {
            header_length: 2,
            ..LoaderOptions::default()
        };
        let source = NamedSource::new("short", Cursor::new("Live Time: 2\nfoo\n0 4 6\n"));
        let spectrum = parse_with(source, &options).unwrap();
        assert_eq!(spectrum.data(), &[2.0, 3.0]);
    }

    #[test]
    fn source_is_closed_once_on_success() {
        let (source, closes) = CountingSource::new(&dump(None, &["0 1"]));
        parse(source).unwrap();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn source_is_closed_once_on_failure() {
        let (source, closes) = CountingSource::new(&dump(Some((1, "abc")), &["0 1"]));
        parse(source).unwrap_err();
        assert_eq!(closes.get(), 1);

        let (source, closes) = CountingSource::new(&dump(None, &["0 x"]));
        parse(source).unwrap_err();
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn closed_source_is_rejected() {
        let mut source = NamedSource::new("closed", Cursor::new(dump(None, &["0 1"])));
        source.close().unwrap();
        let err = parse(source).unwrap_err();
        assert!(matches!(err, ParseError::StreamClosedEarly { .. }));
    }
}
