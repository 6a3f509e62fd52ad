use bytes::Bytes;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Cuts a raw `image2pipe` byte stream into complete JPEG images.
pub struct JpegSplitter {
    buffer: Vec<u8>,
}

impl JpegSplitter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFER_BYTES {
            let overflow = self.buffer.len() - MAX_BUFFER_BYTES;
            self.buffer.drain(0..overflow);
        }

        let mut frames = Vec::new();
        while let Some(start) = find_marker(&self.buffer, &JPEG_SOI) {
            let Some(end_rel) = find_marker(&self.buffer[start + 2..], &JPEG_EOI) else {
                self.buffer.drain(0..start);
                return frames;
            };

            let end = start + 2 + end_rel + 2;
            frames.push(Bytes::copy_from_slice(&self.buffer[start..end]));
            self.buffer.drain(0..end);
        }

        // no start marker left, keep a trailing 0xFF in case the marker was split
        let keep_tail = self.buffer.last() == Some(&JPEG_SOI[0]);
        self.buffer.clear();
        if keep_tail {
            self.buffer.push(JPEG_SOI[0]);
        }
        frames
    }
}

impl Default for JpegSplitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a 0.0..=1.0 JPEG quality onto ffmpeg's mjpeg `-q:v` scale (2 best, 31 worst).
pub fn mjpeg_qscale(quality: f32) -> u8 {
    let quality = quality.clamp(0.0, 1.0);
    (2.0 + (1.0 - quality) * 29.0).round() as u8
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}

#[cfg(test)]
mod tests {
    use super::{JpegSplitter, mjpeg_qscale};

    fn fake_jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    #[test]
    fn returns_every_frame_in_order() {
        let mut splitter = JpegSplitter::new();
        let first = fake_jpeg(b"111");
        let second = fake_jpeg(b"222");
        let mut chunk = b"noise".to_vec();
        chunk.extend_from_slice(&first);
        chunk.extend_from_slice(&second);

        let frames = splitter.push_chunk(&chunk);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), first.as_slice());
        assert_eq!(frames[1].as_ref(), second.as_slice());
    }

    #[test]
    fn reassembles_frame_split_across_chunks() {
        let mut splitter = JpegSplitter::new();
        let frame = fake_jpeg(b"hello-world");

        assert!(splitter.push_chunk(&frame[..5]).is_empty());
        let frames = splitter.push_chunk(&frame[5..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), frame.as_slice());
    }

    #[test]
    fn start_marker_split_between_chunks_is_kept() {
        let mut splitter = JpegSplitter::new();
        let frame = fake_jpeg(b"abc");

        assert!(splitter.push_chunk(&frame[..1]).is_empty());
        let frames = splitter.push_chunk(&frame[1..]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_ref(), frame.as_slice());
    }

    #[test]
    fn quality_maps_onto_qscale() {
        assert_eq!(mjpeg_qscale(1.0), 2);
        assert_eq!(mjpeg_qscale(0.8), 8);
        assert_eq!(mjpeg_qscale(0.0), 31);
        assert_eq!(mjpeg_qscale(7.0), 2);
    }
}
