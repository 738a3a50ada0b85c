/// Sample width of the produced PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Signed 16 bit samples.
    Bits16,
    /// Unsigned 8 bit samples biased by 128.
    Bits8,
}

/// Which channels of the stream end up in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channels {
    /// Keep the stream's channel layout.
    Stereo,
    /// Downmix a stereo stream to mono.
    Mix,
    /// Only the left channel of a stereo stream.
    Left,
    /// Only the right channel of a stereo stream.
    Right,
}

/// Output rate divider. Down sampling also drops the subbands above the
/// new Nyquist frequency before synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownSample {
    None,
    Half,
    Quarter,
}

impl DownSample {
    pub fn shift(self) -> u32 {
        match self {
            DownSample::None => 0,
            DownSample::Half => 1,
            DownSample::Quarter => 2,
        }
    }

    pub fn from_factor(factor: u32) -> Option<DownSample> {
        match factor {
            1 => Some(DownSample::None),
            2 => Some(DownSample::Half),
            4 => Some(DownSample::Quarter),
            _ => None,
        }
    }

    /// Number of subbands that survive down sampling.
    pub fn sblimit(self) -> usize {
        32 >> self.shift()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    pub resolution: Resolution,
    pub channels: Channels,
    pub down_sample: DownSample,
    /// Duplicate mono streams into both channels of a stereo output.
    pub force_stereo: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            resolution: Resolution::Bits16,
            channels: Channels::Stereo,
            down_sample: DownSample::None,
            force_stereo: false,
        }
    }
}

impl DecoderConfig {
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_channels(mut self, channels: Channels) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_down_sample(mut self, down_sample: DownSample) -> Self {
        self.down_sample = down_sample;
        self
    }

    pub fn with_force_stereo(mut self, force_stereo: bool) -> Self {
        self.force_stereo = force_stereo;
        self
    }

    /// Channel selection applied to a stream with `stream_channels`
    /// channels. `None` keeps both channels.
    pub(crate) fn single(&self, stream_channels: usize) -> Option<Single> {
        if stream_channels == 1 {
            return Some(Single::Left);
        }

        match self.channels {
            Channels::Stereo => None,
            Channels::Mix => Some(Single::Mix),
            Channels::Left => Some(Single::Left),
            Channels::Right => Some(Single::Right),
        }
    }

    /// Channel count of the produced PCM for a stream with
    /// `stream_channels` channels.
    pub fn output_channels(&self, stream_channels: usize) -> usize {
        match self.single(stream_channels) {
            None => 2,
            Some(_) if stream_channels == 1 && self.force_stereo => 2,
            Some(_) => 1,
        }
    }
}

/// The single channel fed to the synthesis filter when the output is mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Single {
    Left,
    Right,
    Mix,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_channels_follow_stream_and_config() {
        let config = DecoderConfig::default();
        assert_eq!(config.output_channels(2), 2);
        assert_eq!(config.output_channels(1), 1);

        let config = config.with_force_stereo(true);
        assert_eq!(config.output_channels(1), 2);

        let config = DecoderConfig::default().with_channels(Channels::Mix);
        assert_eq!(config.output_channels(2), 1);
        assert_eq!(config.single(2), Some(Single::Mix));
        assert_eq!(config.single(1), Some(Single::Left));
    }

    #[test]
    fn down_sample_limits() {
        assert_eq!(DownSample::None.sblimit(), 32);
        assert_eq!(DownSample::Half.sblimit(), 16);
        assert_eq!(DownSample::Quarter.sblimit(), 8);
        assert_eq!(DownSample::from_factor(4), Some(DownSample::Quarter));
        assert_eq!(DownSample::from_factor(3), None);
    }
}
