//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream of a local file, converts every frame to RGB24, and hands
//! frames out in decode order. Reaching the end of the file flushes the decoder and then
//! reports end of stream.

use anyhow::{Context, Result};
use ffmpeg_next as ffmpeg;

use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    path: String,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    fps: Option<f64>,
    total_frames: Option<u64>,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(path: &str) -> Result<Self> {
        ffmpeg::init().context("initialize ffmpeg")?;
        let input = ffmpeg::format::input(path)
            .with_context(|| format!("failed to open video file '{}' with ffmpeg", path))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| anyhow::anyhow!("file has no video track"))?;
        let stream_index = input_stream.index();
        let rate = input_stream.avg_frame_rate();
        let fps = (rate.denominator() != 0 && rate.numerator() > 0)
            .then(|| rate.numerator() as f64 / rate.denominator() as f64);
        let total_frames = u64::try_from(input_stream.frames()).ok().filter(|n| *n > 0);
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .context("load video decoder parameters")?;
        let decoder = context
            .decoder()
            .video()
            .context("open ffmpeg video decoder")?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .context("create ffmpeg scaler")?;

        Ok(Self {
            path: path.to_string(),
            input,
            stream_index,
            decoder,
            scaler,
            fps,
            total_frames,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn connect(&mut self) -> Result<()> {
        log::info!(
            "FileSource: opened {} (ffmpeg, {}x{}, fps={:?})",
            self.path,
            self.decoder.width(),
            self.decoder.height(),
            self.fps
        );
        Ok(())
    }

    pub(crate) fn fps(&self) -> Option<f64> {
        self.fps
    }

    /// Frame count from the container header; absent or zero means unknown.
    pub(crate) fn frame_count(&self) -> Option<u64> {
        self.total_frames
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.receive_decoded()? {
                return Ok(Some(frame));
            }
            if self.eof_sent {
                return Ok(None);
            }

            let mut sent = false;
            for (stream, packet) in self.input.packets() {
                if stream.index() != self.stream_index {
                    continue;
                }
                self.decoder
                    .send_packet(&packet)
                    .context("send packet to ffmpeg decoder")?;
                sent = true;
                break;
            }
            if !sent {
                self.decoder.send_eof().context("flush ffmpeg decoder")?;
                self.eof_sent = true;
            }
        }
    }

    fn receive_decoded(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(&decoded, &mut rgb_frame)
            .context("scale frame to RGB")?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;

        let index = self.frame_count;
        self.frame_count += 1;
        Frame::new(index, width, height, pixels).map(Some)
    }
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let len = row_bytes * height as usize;
        let pixels = data
            .get(..len)
            .context("ffmpeg frame is shorter than its dimensions")?;
        return Ok((pixels.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .context("ffmpeg frame row is out of bounds")?,
        );
    }

    Ok((pixels, width, height))
}
