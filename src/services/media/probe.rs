//! Reads the playback duration out of ISO base media files (MP4, MOV, M4V).
//!
//! Only the `moov/mvhd` header is inspected; sample tables are never parsed.
//! Boxes are skipped by seeking, so large `mdat` payloads are not read.

use std::io::{self, SeekFrom};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};

const MOOV: [u8; 4] = *b"moov";
const MVHD: [u8; 4] = *b"mvhd";

/// File extensions whose container carries an `mvhd` box.
pub fn is_probeable(extension: &str) -> bool {
    matches!(
        extension.to_ascii_lowercase().as_str(),
        "mp4" | "m4v" | "mov" | "3gp"
    )
}

/// Duration in seconds, or `None` when the container has no usable movie header.
pub async fn mp4_duration<R>(reader: &mut R) -> io::Result<Option<f64>>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let end = reader.seek(SeekFrom::End(0)).await?;

    let Some((moov_start, moov_end)) = find_box(reader, 0, end, MOOV).await? else {
        return Ok(None);
    };
    let Some((mvhd_start, _)) = find_box(reader, moov_start, moov_end, MVHD).await? else {
        return Ok(None);
    };

    reader.seek(SeekFrom::Start(mvhd_start)).await?;
    // version (1 byte) + flags (3 bytes)
    let version = reader.read_u8().await?;
    reader.seek(SeekFrom::Current(3)).await?;

    let (timescale, duration) = if version == 1 {
        // 64-bit creation + modification times
        reader.seek(SeekFrom::Current(16)).await?;
        let timescale = reader.read_u32().await?;
        let duration = reader.read_u64().await?;
        (timescale, duration)
    } else {
        reader.seek(SeekFrom::Current(8)).await?;
        let timescale = reader.read_u32().await?;
        let duration = reader.read_u32().await?;
        // all-ones means "unknown" in 32-bit headers
        if duration == u32::MAX {
            return Ok(None);
        }
        (timescale, u64::from(duration))
    };

    if timescale == 0 || duration == u64::MAX {
        return Ok(None);
    }

    Ok(Some(duration as f64 / f64::from(timescale)))
}

/// Payload range `[start, end)` of the first box named `kind` among the
/// direct children of `[from, to)`.
async fn find_box<R>(
    reader: &mut R,
    from: u64,
    to: u64,
    kind: [u8; 4],
) -> io::Result<Option<(u64, u64)>>
where
    R: AsyncRead + AsyncSeek + Unpin,
{
    let mut pos = from;
    while pos.checked_add(8).is_some_and(|header_end| header_end <= to) {
        reader.seek(SeekFrom::Start(pos)).await?;
        let size32 = reader.read_u32().await?;
        let mut name = [0u8; 4];
        reader.read_exact(&mut name).await?;

        let (header_len, size) = match size32 {
            0 => (8, to - pos),
            1 => (16, reader.read_u64().await?),
            n => (8, u64::from(n)),
        };

        // sizes come from the file: reject anything that overflows or
        // reaches past the parent
        let Some(box_end) = pos.checked_add(size) else {
            return Ok(None);
        };
        if size < header_len || box_end > to {
            return Ok(None);
        }
        if name == kind {
            return Ok(Some((pos + header_len, box_end)));
        }
        pos = box_end;
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn boxed(kind: &[u8; 4], payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 8);
        out.extend_from_slice(&((payload.len() + 8) as u32).to_be_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out
    }

    fn mvhd_v0(timescale: u32, duration: u32) -> Vec<u8> {
        let mut payload = vec![0u8; 4]; // version 0 + flags
        payload.extend_from_slice(&[0u8; 8]); // creation + modification
        payload.extend_from_slice(&timescale.to_be_bytes());
        payload.extend_from_slice(&duration.to_be_bytes());
        payload.extend_from_slice(&[0u8; 80]);
        boxed(b"mvhd", &payload)
    }

    fn mvhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
        let mut payload = vec![1u8, 0, 0, 0];
        payload.extend_from_slice(&[0u8; 16]);
        payload.extend_from_slice(&timescale.to_be_bytes());
        payload.extend_from_slice(&duration.to_be_bytes());
        payload.extend_from_slice(&[0u8; 80]);
        boxed(b"mvhd", &payload)
    }

    #[tokio::test]
    async fn reads_duration_after_media_data() {
        let mut file = boxed(b"ftyp", b"isom\0\0\x02\0isomiso2");
        file.extend(boxed(b"mdat", &[7u8; 4096]));
        let mut moov = boxed(b"udta", b"meta");
        moov.extend(mvhd_v0(1000, 12_500));
        file.extend(boxed(b"moov", &moov));

        let duration = mp4_duration(&mut Cursor::new(file)).await.unwrap();
        assert_eq!(duration, Some(12.5));
    }

    #[tokio::test]
    async fn reads_version_one_header() {
        let file = boxed(b"moov", &mvhd_v1(90_000, 90_000 * 3));
        let duration = mp4_duration(&mut Cursor::new(file)).await.unwrap();
        assert_eq!(duration, Some(3.0));
    }

    #[tokio::test]
    async fn missing_movie_header_yields_none() {
        let file = boxed(b"ftyp", b"isom");
        assert_eq!(mp4_duration(&mut Cursor::new(file)).await.unwrap(), None);

        let not_mp4 = b"\x89PNG\r\n\x1a\nrest-of-an-image".to_vec();
        assert_eq!(mp4_duration(&mut Cursor::new(not_mp4)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_timescale_yields_none() {
        let file = boxed(b"moov", &mvhd_v0(0, 100));
        assert_eq!(mp4_duration(&mut Cursor::new(file)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn oversized_large_box_yields_none() {
        let mut file = boxed(b"free", b"");
        file.extend_from_slice(&1u32.to_be_bytes());
        file.extend_from_slice(b"mdat");
        file.extend_from_slice(&(u64::MAX - 7).to_be_bytes());
        file.extend_from_slice(&[0u8; 32]);

        assert_eq!(mp4_duration(&mut Cursor::new(file)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn large_box_shorter_than_its_header_yields_none() {
        let mut file = Vec::new();
        file.extend_from_slice(&1u32.to_be_bytes());
        file.extend_from_slice(b"moov");
        file.extend_from_slice(&8u64.to_be_bytes());
        file.extend(mvhd_v0(1000, 1000));

        assert_eq!(mp4_duration(&mut Cursor::new(file)).await.unwrap(), None);
    }

    #[test]
    fn probeable_extensions() {
        assert!(is_probeable("MP4"));
        assert!(is_probeable("mov"));
        assert!(!is_probeable("webm"));
    }
}
