pub mod channelizer;
pub mod correlator;
pub mod filter_bank;
pub mod stream;

pub use channelizer::{channelize_one, ChannelizedStream, ChannelizerStage, PolyphaseChannelizer};
pub use correlator::{
    cross_correlate, cross_power, digitize, lag_window, peak_lag, quantize,
    simple_real_cross_power, CrossPower, LagSample, Quantized,
};
pub use filter_bank::FilterBank;
pub use stream::{
    align_pair, channel_frequencies, reshape_blocks, AlignedPair, SampleStream, Spectrogram,
    StreamingChannelizer,
};
