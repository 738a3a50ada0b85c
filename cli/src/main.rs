use anyhow::{anyhow, Error};
use mpeg_audio_decoder::{Channels, Decoder, DecoderConfig, DownSample, PcmBuffer, Resolution};
use structopt::StructOpt;

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;

fn main() -> Result<(), Error> {
    env_logger::init();

    let opts = Opts::from_args();

    match opts.command {
        Command::Play { input, output } => {
            let file = File::open(input)?;
            let reader = BufReader::new(file);

            let decoder = Decoder::with_config(reader, output.config()?)?;

            let device =
                rodio::default_output_device().ok_or_else(|| anyhow!("no output device"))?;
            let sink = rodio::Sink::new(&device);

            sink.append(decoder);
            sink.play();
            sink.sleep_until_end();
        }
        Command::Decode {
            input,
            output,
            pcm,
        } => {
            let file = File::open(input)?;
            let reader = BufReader::new(file);

            let mut decoder = Decoder::with_config(reader, output.config()?)?;
            let mut writer = BufWriter::new(File::create(pcm)?);

            let mut frames = 0u64;
            let mut dropped = 0u64;
            loop {
                match decoder.next_frame() {
                    Ok(PcmBuffer::S16(samples)) => {
                        for sample in samples {
                            writer.write_all(&sample.to_le_bytes())?;
                        }
                    }
                    Ok(PcmBuffer::U8(samples)) => writer.write_all(samples)?,
                    Err(mpeg_audio_decoder::Error::IOError(ref e))
                        if e.kind() == ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    Err(e @ mpeg_audio_decoder::Error::SyncLost(_)) => return Err(e.into()),
                    Err(e) => {
                        log::error!("ERROR frame {}: {}", frames + 1, e);
                        dropped += 1;
                    }
                }
                frames += 1;
            }
            writer.flush()?;

            let info = decoder.stream_info();
            println!(
                "{} frames ({} dropped), {} ch at {} Hz, {} samples clipped",
                frames,
                dropped,
                info.output_channels,
                info.output_rate,
                decoder.clip_count()
            );
        }
        Command::Info { input } => {
            let file = File::open(input)?;
            let reader = BufReader::new(file);

            let decoder = Decoder::new(reader)?;
            let info = decoder.stream_info();

            println!("{:?} {:?}, {:?}", info.version, info.layer, info.mode);
            println!("{} Hz, {} kbit/s, {} ch", info.sample_rate, info.bitrate, info.channels);
            println!("{} frames, {:.2} s", info.frames, info.duration.as_secs_f64());
            if let Some(xing) = info.xing {
                println!(
                    "Xing: {} frames, {:?} bytes, toc {}, vbr scale {:?}",
                    xing.frames, xing.bytes, xing.has_toc, xing.vbr_scale
                );
            }
        }
    }

    Ok(())
}

#[derive(StructOpt)]
#[structopt(name = "mpeg-audio-decoder-cli")]
struct Opts {
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Plays a stream on the default output device
    Play {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(flatten)]
        output: OutputOpts,
    },
    /// Writes raw interleaved little endian PCM
    Decode {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
        #[structopt(parse(from_os_str))]
        pcm: PathBuf,
        #[structopt(flatten)]
        output: OutputOpts,
    },
    /// Prints stream parameters
    Info {
        #[structopt(parse(from_os_str))]
        input: PathBuf,
    },
}

#[derive(StructOpt)]
struct OutputOpts {
    /// Mix stereo streams down to mono
    #[structopt(long, conflicts_with_all = &["left", "right"])]
    mono: bool,
    /// Only the left channel
    #[structopt(long, conflicts_with = "right")]
    left: bool,
    /// Only the right channel
    #[structopt(long)]
    right: bool,
    /// Unsigned 8 bit output
    #[structopt(long)]
    eight_bit: bool,
    /// Output rate divider: 1, 2 or 4
    #[structopt(long, default_value = "1")]
    down_sample: u32,
    /// Duplicate mono streams to both channels
    #[structopt(long)]
    force_stereo: bool,
}

impl OutputOpts {
    fn config(&self) -> Result<DecoderConfig, Error> {
        let channels = if self.mono {
            Channels::Mix
        } else if self.left {
            Channels::Left
        } else if self.right {
            Channels::Right
        } else {
            Channels::Stereo
        };

        let resolution = if self.eight_bit {
            Resolution::Bits8
        } else {
            Resolution::Bits16
        };

        let down_sample = DownSample::from_factor(self.down_sample)
            .ok_or_else(|| anyhow!("down sample factor must be 1, 2 or 4"))?;

        Ok(DecoderConfig::default()
            .with_channels(channels)
            .with_resolution(resolution)
            .with_down_sample(down_sample)
            .with_force_stereo(self.force_stereo))
    }
}
