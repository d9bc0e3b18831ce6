use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use quartz_nbt::io::Flavor;
use quartz_nbt::NbtCompound;

use crate::error::{ProtocolError, Result};
use crate::protocol::packet::PacketBuffer;

/// Reads an optional NBT document from its network envelope: a signed
/// 16-bit byte length followed by that many gzip-compressed bytes. A
/// negative length marks an absent document.
pub fn read_nbt(buffer: &mut PacketBuffer) -> Result<Option<NbtCompound>> {
    let length = buffer.read_i16()?;
    if length < 0 {
        return Ok(None);
    }
    let compressed = buffer.read_bytes(length as usize)?;
    let mut decoder = GzDecoder::new(&compressed[..]);
    let (root, _name) = quartz_nbt::io::read_nbt(&mut decoder, Flavor::Uncompressed)?;
    Ok(Some(root))
}

/// Writes an optional NBT document under the length-prefixed gzip
/// envelope. The compressed payload must fit the signed 16-bit length
/// field; on failure nothing is committed to the buffer.
pub fn write_nbt(buffer: &mut PacketBuffer, tag: Option<&NbtCompound>) -> Result<()> {
    match tag {
        None => buffer.write_i16(-1),
        Some(tag) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            quartz_nbt::io::write_nbt(&mut encoder, None, tag, Flavor::Uncompressed)?;
            let compressed = encoder.finish()?;
            if compressed.len() > i16::MAX as usize {
                return Err(ProtocolError::NbtTooLarge(compressed.len()));
            }
            buffer.write_i16(compressed.len() as i16);
            buffer.write_bytes(&compressed);
        }
    }
    Ok(())
}
