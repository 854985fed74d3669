//! High-level media source API.

use crate::options::SourceOptions;
use frameserve_codec::traits::DecoderFactory;
use frameserve_core::error::{Error, Result};
use frameserve_demux::traits::{ContainerOpener, ContainerReader};
use frameserve_engine::{SharedTrack, TrackSelector, TrackSession};
use std::path::Path;
use std::sync::Arc;

/// Entry point binding a container opener and a decoder factory to one set
/// of options. Each opened track is an independent session.
pub struct MediaSource {
    opener: Option<Box<dyn ContainerOpener>>,
    factory: Arc<dyn DecoderFactory>,
    options: SourceOptions,
}

impl MediaSource {
    /// A source decoding through `factory`. Without an opener only
    /// [`open_reader`](Self::open_reader) is available.
    pub fn new(factory: Arc<dyn DecoderFactory>) -> Self {
        Self {
            opener: None,
            factory,
            options: SourceOptions::new(),
        }
    }

    /// Attach a container opener for path-based opens.
    #[must_use]
    pub fn with_opener(mut self, opener: Box<dyn ContainerOpener>) -> Self {
        self.opener = Some(opener);
        self
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: SourceOptions) -> Self {
        self.options = options;
        self
    }

    /// The current options.
    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    /// Open a track of a media file.
    pub fn open_track(
        &self,
        path: impl AsRef<Path>,
        selector: TrackSelector,
    ) -> Result<TrackSession> {
        let opener = self
            .opener
            .as_ref()
            .ok_or_else(|| Error::invalid_param("no container opener attached"))?;
        let reader = opener.open(path.as_ref())?;
        self.open_reader(reader, selector)
    }

    /// Open a track from an already-open container reader.
    pub fn open_reader(
        &self,
        reader: Box<dyn ContainerReader>,
        selector: TrackSelector,
    ) -> Result<TrackSession> {
        TrackSession::open(
            reader,
            Arc::clone(&self.factory),
            selector,
            self.options.track_options(),
        )
    }

    /// Open a track wrapped for multi-threaded hosts.
    pub fn open_shared(
        &self,
        reader: Box<dyn ContainerReader>,
        selector: TrackSelector,
    ) -> Result<SharedTrack> {
        Ok(SharedTrack::new(self.open_reader(reader, selector)?))
    }
}
