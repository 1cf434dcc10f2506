use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::model::StoreEvent;

/// Length prefixes above this are treated as corruption rather than allocated.
const MAX_RECORD_LEN: usize = 16 * 1024 * 1024;

/// Frame one record as `[u32 len][bincode payload][u32 crc32]`, little endian.
fn write_record(writer: &mut impl Write, event: &StoreEvent) -> io::Result<()> {
    let payload =
        bincode::serialize(event).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "journal record too large"))?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&payload)?;
    writer.write_all(&crc32fast::hash(&payload).to_le_bytes())?;
    Ok(())
}

/// Read one framed record and its size on disk. `Ok(None)` on a clean end, a torn tail,
/// or a bad checksum.
fn read_record(reader: &mut impl Read) -> io::Result<Option<(StoreEvent, u64)>> {
    let mut len_buf = [0u8; 4];
    if !read_or_eof(reader, &mut len_buf)? {
        return Ok(None);
    }
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_RECORD_LEN {
        return Ok(None);
    }
    let mut payload = vec![0u8; len];
    if !read_or_eof(reader, &mut payload)? {
        return Ok(None);
    }
    let mut crc_buf = [0u8; 4];
    if !read_or_eof(reader, &mut crc_buf)? {
        return Ok(None);
    }
    if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
        return Ok(None);
    }
    Ok(bincode::deserialize(&payload)
        .ok()
        .map(|event| (event, 8 + len as u64)))
}

/// Intact records plus the byte length of the prefix they occupy.
fn scan(path: &Path) -> io::Result<(Vec<StoreEvent>, u64)> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok((Vec::new(), 0)),
        Err(e) => return Err(e),
    };
    let mut reader = BufReader::new(file);
    let mut events = Vec::new();
    let mut intact_len = 0;
    while let Some((event, size)) = read_record(&mut reader)? {
        events.push(event);
        intact_len += size;
    }
    Ok((events, intact_len))
}

fn read_or_eof(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// Append-only journal of committed store changes.
///
/// Every append is flushed and fsynced before it returns. A crash mid-append leaves a
/// torn last record, which replay drops along with anything after it. Opening cuts the
/// file back to its intact prefix, so later appends are never hidden behind a torn tail.
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    appends_since_compact: u64,
}

impl Journal {
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::recover(path)?.0)
    }

    /// Replay `path`, drop whatever follows the last intact record, and open for appending.
    pub fn recover(path: &Path) -> io::Result<(Self, Vec<StoreEvent>)> {
        let (events, intact_len) = scan(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let on_disk = file.metadata()?.len();
        if on_disk > intact_len {
            warn!(
                "discarding {} trailing bytes of {}",
                on_disk - intact_len,
                path.display()
            );
            file.set_len(intact_len)?;
            file.sync_all()?;
        }
        let journal = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            appends_since_compact: 0,
        };
        Ok((journal, events))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, event: &StoreEvent) -> io::Result<()> {
        write_record(&mut self.writer, event)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.appends_since_compact += 1;
        Ok(())
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }

    /// Replace the journal with `snapshot`: write a temp file, fsync, rename over, reopen.
    ///
    /// The append counter restarts either way, so a failed attempt is retried only after
    /// another full threshold of appends. On failure the existing journal is untouched.
    pub fn compact(&mut self, snapshot: &[StoreEvent]) -> io::Result<()> {
        self.appends_since_compact = 0;
        let tmp_path = self.path.with_extension("journal.tmp");
        if let Err(e) = write_snapshot(&tmp_path, snapshot) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        let file = OpenOptions::new().create(true).append(true).open(&tmp_path)?;
        fs::rename(&tmp_path, &self.path)?;
        self.writer = BufWriter::new(file);
        Ok(())
    }

    /// Every intact record, in append order. A missing file replays as empty.
    pub fn replay(path: &Path) -> io::Result<Vec<StoreEvent>> {
        Ok(scan(path)?.0)
    }
}

fn write_snapshot(path: &Path, snapshot: &[StoreEvent]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for event in snapshot {
        write_record(&mut writer, event)?;
    }
    writer.flush()?;
    writer.get_ref().sync_all()
}
