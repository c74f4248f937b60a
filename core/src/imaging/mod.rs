pub mod baseline;
pub mod imager;

pub use baseline::{AntennaPosition, Baseline, BaselineSet};
pub use imager::{
    pixel_count_for_oversampling, subband_frequency, DirectImager, ImageExtent, ImageGrid,
    SkyImage, Visibilities, DEFAULT_CLOCK_HZ, DEFAULT_OVERSAMPLING,
};
