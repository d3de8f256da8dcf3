//! Sample-level access to MP4 (ISO-BMFF) files.
//!
//! [`Mp4Reader`] reads a bounded prefix of a [`ByteSource`], walks the box
//! tree down to each track's sample tables and expands them into a
//! [`SampleIndex`]. Samples are then fetched by number, by time, or by
//! keyframe group with one range read each.
//!
//! ```no_run
//! use mp4index::Mp4Reader;
//!
//! let reader = Mp4Reader::open_path("movie.mp4")?;
//! for track in reader.tracks() {
//!     let keyframes = reader.get_keyframes(track.id())?;
//!     println!("track {}: {} keyframes", track.id(), keyframes.len());
//! }
//! let sample = reader.get_sample_at_time(1, 2.5)?;
//! println!("{} bytes at {}", sample.data.len(), sample.entry.byte_offset);
//! # Ok::<(), mp4index::Error>(())
//! ```

pub mod boxes;
pub mod error;
pub mod index;
pub mod known_boxes;
pub mod movie;
pub mod parser;
pub mod query;
pub mod reader;
pub mod sample_table;
pub mod source;
pub mod track;
pub mod util;
pub mod walker;

pub use boxes::{BoxHeader, FourCC};
pub use error::{Error, Result};
pub use index::{IndexError, SampleIndex, SampleIndexEntry, ticks_to_micros};
pub use known_boxes::KnownBox;
pub use movie::{MdatInfo, Movie, parse_movie};
pub use parser::{ParseError, read_box_header};
pub use query::seconds_to_ticks;
pub use reader::{
    DecoderConfig, EncodedSample, Mp4Reader, ReaderOptions, Sample, SampleBlock, Track,
};
pub use sample_table::{SampleDescription, SampleTableRaw};
pub use source::{ByteSource, SeekSource};
pub use track::{MediaType, TrackRecord};
pub use walker::{WalkControl, WalkEnd, walk};
