pub mod fetcher;

use crate::error::{PlayerError, PlayerResult};
use crate::mpd::{Representation, SegmentEntry};
use regex::Regex;

/// A fetchable media segment resolved from the active representation.
#[derive(Clone, Debug)]
pub struct SegmentDescriptor {
    pub index: u64,
    /// Start of the segment on the presentation timeline in seconds.
    pub presentation_time: f64,
    pub duration: f64,
    /// URL relative to the manifest.
    pub url: String,
}

/// Segment addressing for one representation. Maps between presentation
/// time and segment indices in both manifest styles.
pub enum SegmentIndex {
    /// $Number$-templated addressing; the index is the segment number.
    Templated {
        media: String,
        start_number: u64,
        segment_duration: f64,
        count: u64,
    },
    /// Explicitly listed segments; the index is the list position.
    List { entries: Vec<SegmentEntry> },
}

impl SegmentIndex {
    pub fn for_representation(
        rep: &Representation,
        presentation_duration: f64,
    ) -> PlayerResult<Self> {
        if !rep.segments.is_empty() {
            return Ok(SegmentIndex::List {
                entries: rep.segments.clone(),
            });
        }

        if rep.has_template && !rep.media.is_empty() && rep.segment_duration > 0.0 {
            if presentation_duration <= 0.0 {
                return Err(PlayerError::InvalidManifest(format!(
                    "representation {} is templated but the manifest declares no mediaPresentationDuration",
                    rep.id
                )));
            }
            let count = (presentation_duration / rep.segment_duration).ceil() as u64;
            return Ok(SegmentIndex::Templated {
                media: rep.media.clone(),
                start_number: rep.start_number,
                segment_duration: rep.segment_duration,
                count,
            });
        }

        Err(PlayerError::InvalidManifest(format!(
            "representation {} has no segment addressing",
            rep.id
        )))
    }

    /// Index of the first segment.
    pub fn first_index(&self) -> u64 {
        match self {
            SegmentIndex::Templated { start_number, .. } => *start_number,
            SegmentIndex::List { .. } => 0,
        }
    }

    /// One past the index of the last segment.
    pub fn end_index(&self) -> u64 {
        match self {
            SegmentIndex::Templated {
                start_number,
                count,
                ..
            } => start_number + count,
            SegmentIndex::List { entries } => entries.len() as u64,
        }
    }

    /// Index of the segment covering `time`. Times before the first segment
    /// map to the first index; in list mode times past the end map to the
    /// last entry.
    pub fn segment_index_at(&self, time: f64) -> u64 {
        match self {
            SegmentIndex::Templated {
                start_number,
                segment_duration,
                ..
            } => {
                if time <= 0.0 {
                    *start_number
                } else {
                    start_number + (time / segment_duration).floor() as u64
                }
            }
            SegmentIndex::List { entries } => {
                let mut index = 0;
                for (i, entry) in entries.iter().enumerate() {
                    if entry.presentation_time <= time {
                        index = i as u64;
                    } else {
                        break;
                    }
                }
                index
            }
        }
    }

    /// Start of the indexed segment on the presentation timeline.
    pub fn presentation_time_of(&self, index: u64) -> f64 {
        match self {
            SegmentIndex::Templated {
                start_number,
                segment_duration,
                ..
            } => index.saturating_sub(*start_number) as f64 * segment_duration,
            SegmentIndex::List { entries } => match entries.get(index as usize) {
                Some(entry) => entry.presentation_time,
                None => entries
                    .last()
                    .map(|e| e.presentation_time + e.duration)
                    .unwrap_or(0.0),
            },
        }
    }

    /// Resolves the indexed segment, or None past the end of the stream.
    pub fn descriptor(&self, index: u64) -> Option<SegmentDescriptor> {
        match self {
            SegmentIndex::Templated {
                media,
                start_number,
                segment_duration,
                count,
            } => {
                if index < *start_number || index >= start_number + count {
                    return None;
                }
                Some(SegmentDescriptor {
                    index,
                    presentation_time: (index - start_number) as f64 * segment_duration,
                    duration: *segment_duration,
                    url: replace_number_format(media, index),
                })
            }
            SegmentIndex::List { entries } => {
                entries.get(index as usize).map(|entry| SegmentDescriptor {
                    index,
                    presentation_time: entry.presentation_time,
                    duration: entry.duration,
                    url: entry.media.clone(),
                })
            }
        }
    }

    /// Extent of the stream covered by this index, in seconds.
    pub fn total_duration(&self) -> f64 {
        match self {
            SegmentIndex::Templated {
                segment_duration,
                count,
                ..
            } => segment_duration * *count as f64,
            SegmentIndex::List { entries } => entries
                .last()
                .map(|e| e.presentation_time + e.duration)
                .unwrap_or(0.0),
        }
    }
}

pub(crate) fn replace_number_format(template: &str, segment_number: u64) -> String {
    let re = Regex::new(r"\$Number(?::%0(\d+)d|%0(\d+)d)?\$").unwrap();
    re.replace_all(template, |caps: &regex::Captures| {
        if let Some(width) = caps.get(1).or_else(|| caps.get(2)) {
            format!("{:0width$}", segment_number, width = width.as_str().parse::<usize>().unwrap_or(1))
        } else {
            segment_number.to_string()
        }
    }).to_string()
}
