use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use ffmpeg::util::frame::audio::Audio;
use ffmpeg_next::{
    self as ffmpeg, channel_layout, codec, decoder, encoder, filter, format, media, Error, Packet,
    Rational,
};
use tracing::{debug, info};

use crate::assemble::escape_filter_value;
use crate::probe;

#[derive(Debug, Clone)]
pub(crate) struct MixSettings {
    /// Output length in seconds; the narration length when unset.
    pub length: Option<f64>,
    pub narration_gain_db: f64,
    pub music_gain_db: f64,
    pub fade: Option<f64>,
}

impl Default for MixSettings {
    fn default() -> Self {
        Self {
            length: None,
            narration_gain_db: 5.0,
            music_gain_db: -7.0,
            fade: None,
        }
    }
}

/// Filter graph that fits the narration (`in`) and the music tracks to
/// `length` seconds and mixes them into `out`.
pub(crate) fn mix_filter(music: &[PathBuf], length: f64, settings: &MixSettings) -> String {
    let mut spec = format!(
        "[in]volume={:+}dB,apad=whole_dur={length},atrim=end={length}[nar]",
        settings.narration_gain_db
    );

    if music.is_empty() {
        spec.push_str("; [nar]anull");
    } else {
        for (i, track) in music.iter().enumerate() {
            let _ = write!(
                spec,
                "; amovie={},aresample=async=1[m{i}]",
                escape_filter_value(&track.to_string_lossy())
            );
        }
        spec.push_str("; ");
        for i in 0..music.len() {
            let _ = write!(spec, "[m{i}]");
        }
        let _ = write!(
            spec,
            "concat=n={}:v=0:a=1,volume={:+}dB,apad=whole_dur={length},atrim=end={length}[bg]; \
             [bg][nar]amix=inputs=2:duration=longest:normalize=0",
            music.len(),
            settings.music_gain_db
        );
    }

    if let Some(fade) = settings.fade.filter(|fade| *fade > 0.0 && 2.0 * fade < length) {
        let _ = write!(
            spec,
            ",afade=t=in:st=0:d={fade},afade=t=out:st={}:d={fade}",
            length - fade
        );
    }
    spec.push_str("[out]");
    spec
}

/// Some decoders (raw PCM, older mp3 streams) leave the layout unset.
fn input_layout(decoder: &decoder::Audio) -> channel_layout::ChannelLayout {
    let layout = decoder.channel_layout();
    if layout.is_empty() {
        channel_layout::ChannelLayout::default(decoder.channels() as i32)
    } else {
        layout
    }
}

struct AudioMixer {
    decoder: decoder::Audio,
    encoder: encoder::Audio,
    filter_graph: filter::Graph,
    encoder_time_base: Rational,
}

impl AudioMixer {
    fn new(
        input_stream: &format::stream::Stream,
        output: &mut format::context::Output,
        filter_spec: &str,
    ) -> anyhow::Result<Self> {
        let global_header = output
            .format()
            .flags()
            .contains(format::Flags::GLOBAL_HEADER);
        let decoder = codec::context::Context::from_parameters(input_stream.parameters())?
            .decoder()
            .audio()?;

        let codec = encoder::find(codec::Id::AAC)
            .ok_or(anyhow::anyhow!(Error::EncoderNotFound))?
            .audio()?;
        let mut output_stream = output.add_stream(codec)?;
        let mut encoder = codec::context::Context::from_parameters(output_stream.parameters())?
            .encoder()
            .audio()?;
        if global_header {
            encoder.set_flags(codec::Flags::GLOBAL_HEADER);
        }

        let channel_layout = codec
            .channel_layouts()
            .map(|layouts| layouts.best(input_layout(&decoder).channels()))
            .unwrap_or(channel_layout::ChannelLayout::STEREO);
        let encoder_time_base = Rational(1, decoder.rate() as i32);

        encoder.set_channel_layout(channel_layout);
        encoder.set_rate(decoder.rate() as _);
        encoder.set_format(
            codec
                .formats()
                .ok_or(anyhow::anyhow!("Unknown supported formats"))?
                .next()
                .ok_or(anyhow::anyhow!("Failed to get sample format"))?,
        );
        encoder.set_bit_rate(192_000);
        encoder.set_time_base(encoder_time_base);
        output_stream.set_time_base(encoder_time_base);

        let opened_encoder = encoder.open_as(codec)?;
        output_stream.set_parameters(&opened_encoder);

        let filter_graph = Self::filter_graph(
            filter_spec,
            &decoder,
            &opened_encoder,
            input_stream.time_base(),
        )?;

        Ok(Self {
            decoder,
            encoder: opened_encoder,
            filter_graph,
            encoder_time_base,
        })
    }

    fn filter_graph(
        spec: &str,
        decoder: &decoder::Audio,
        encoder: &encoder::Audio,
        input_time_base: Rational,
    ) -> anyhow::Result<filter::Graph> {
        let mut filter_graph = filter::Graph::new();

        let args = format!(
            "time_base={}:sample_rate={}:sample_fmt={}:channel_layout=0x{:x}",
            input_time_base,
            decoder.rate(),
            decoder.format().name(),
            input_layout(decoder).bits()
        );

        filter_graph.add(
            &filter::find("abuffer").ok_or(anyhow::anyhow!("Failed to find filter"))?,
            "in",
            &args,
        )?;
        filter_graph.add(
            &filter::find("abuffersink").ok_or(anyhow::anyhow!("Failed to find filter"))?,
            "out",
            "",
        )?;

        {
            let mut out = filter_graph
                .get("out")
                .ok_or(anyhow::anyhow!("Failed to get filter"))?;
            out.set_sample_format(encoder.format());
            out.set_channel_layout(encoder.channel_layout());
            out.set_sample_rate(encoder.rate());
        }

        filter_graph.output("in", 0)?.input("out", 0)?.parse(spec)?;
        filter_graph.validate()?;

        debug!("Filter graph: {}", filter_graph.dump());

        if let Some(codec) = encoder.codec() {
            if !codec
                .capabilities()
                .contains(codec::capabilities::Capabilities::VARIABLE_FRAME_SIZE)
            {
                filter_graph
                    .get("out")
                    .ok_or(anyhow::anyhow!("Failed to get filter"))?
                    .sink()
                    .set_frame_size(encoder.frame_size());
            }
        }

        Ok(filter_graph)
    }

    fn receive_and_process_decoded_frames(
        &mut self,
        output: &mut format::context::Output,
        output_time_base: Rational,
    ) -> anyhow::Result<()> {
        let mut frame = Audio::empty();
        while self.decoder.receive_frame(&mut frame).is_ok() {
            let timestamp = frame.timestamp();
            frame.set_pts(timestamp);
            self.filter_graph
                .get("in")
                .ok_or(anyhow::anyhow!("Failed to get filter"))?
                .source()
                .add(&frame)
                .map_err(|e| anyhow::anyhow!(e))?;
            self.receive_and_process_filtered_frames(output, output_time_base)?;
        }
        Ok(())
    }

    fn flush_filter_graph(&mut self) -> anyhow::Result<()> {
        self.filter_graph
            .get("in")
            .ok_or(anyhow::anyhow!("Failed to get filter"))?
            .source()
            .flush()
            .map_err(|e| anyhow::anyhow!(e))
    }

    fn receive_and_process_filtered_frames(
        &mut self,
        output: &mut format::context::Output,
        output_time_base: Rational,
    ) -> anyhow::Result<()> {
        let mut frame = Audio::empty();
        while self
            .filter_graph
            .get("out")
            .ok_or(anyhow::anyhow!("Failed to get filter"))?
            .sink()
            .frame(&mut frame)
            .is_ok()
        {
            self.encoder.send_frame(&frame)?;
            self.receive_and_process_encoded_packets(output, output_time_base)?;
        }
        Ok(())
    }

    fn receive_and_process_encoded_packets(
        &mut self,
        output: &mut format::context::Output,
        output_time_base: Rational,
    ) -> anyhow::Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(0);
            packet.rescale_ts(self.encoder_time_base, output_time_base);
            packet.write_interleaved(output)?;
        }
        Ok(())
    }
}

/// Lays narration over background music and encodes the result as AAC.
pub(crate) fn mix(
    narration: &Path,
    music: &[PathBuf],
    output_path: &Path,
    settings: &MixSettings,
) -> anyhow::Result<()> {
    let length = match settings.length {
        Some(length) => length,
        None => probe::duration_secs(narration)?,
    };
    probe::init()?;

    let filter_spec = mix_filter(music, length, settings);
    debug!("Mix filter spec: {}", filter_spec);

    let mut input = format::input(&narration)
        .with_context(|| format!("Failed to open {}", narration.display()))?;
    let mut output = format::output(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;

    let audio_stream_index = input
        .streams()
        .best(media::Type::Audio)
        .ok_or(anyhow::anyhow!(Error::StreamNotFound))?
        .index();
    let mut mixer = {
        let stream = input
            .stream(audio_stream_index)
            .ok_or(anyhow::anyhow!(Error::StreamNotFound))?;
        AudioMixer::new(&stream, &mut output, &filter_spec)?
    };

    output.write_header()?;
    let output_time_base = output
        .stream(0)
        .ok_or(anyhow::anyhow!(Error::StreamNotFound))?
        .time_base();

    for (stream, packet) in input.packets() {
        if stream.index() != audio_stream_index {
            continue;
        }
        mixer.decoder.send_packet(&packet)?;
        mixer.receive_and_process_decoded_frames(&mut output, output_time_base)?;
    }

    mixer.decoder.send_eof()?;
    mixer.receive_and_process_decoded_frames(&mut output, output_time_base)?;
    mixer.flush_filter_graph()?;
    mixer.receive_and_process_filtered_frames(&mut output, output_time_base)?;
    mixer.encoder.send_eof()?;
    mixer.receive_and_process_encoded_packets(&mut output, output_time_base)?;

    output.write_trailer()?;
    info!("Mixed audio ({length:.1}s) saved to {}", output_path.display());
    Ok(())
}
