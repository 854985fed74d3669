//! Container seek with basis fallback.

use frameserve_core::error::{Error, IndexError, Result};
use frameserve_demux::index::SampleDescriptor;
use frameserve_demux::traits::{ContainerReader, SeekBasis, SeekRequest};

/// Seek the container to a sample, picking whichever basis the library
/// supports: decode timestamp first, byte offset second, each retried with
/// the any-sample flag when exact-match seeking fails. Imprecise landings
/// are the caller's problem; they verify against the index.
pub(crate) fn seek_to_descriptor(
    reader: &mut dyn ContainerReader,
    track_id: u32,
    desc: &SampleDescriptor,
) -> Result<()> {
    let bases = [
        SeekBasis::DecodeTime(desc.dts),
        SeekBasis::ByteOffset(desc.byte_offset),
    ];
    let mut last_err = None;
    for any_sample in [false, true] {
        for basis in bases {
            match reader.seek(SeekRequest {
                track_id,
                basis,
                any_sample,
            }) {
                Ok(_) => return Ok(()),
                Err(Error::Index(IndexError::SeekBasisUnsupported)) => continue,
                Err(e) => last_err = Some(e),
            }
        }
    }
    Err(last_err
        .unwrap_or_else(|| Error::Index(IndexError::SeekFailed("no usable seek basis".into()))))
}
